//! File and search tools

use super::result::{parse_args, success, Failure, OrFailure, ToolResult};
use super::schema::{ParamSpec, ParamType};
use super::traits::{AgentTool, ToolCategory};
use crate::config::SearchConfig;
use crate::files::{self, BinaryReader, FileError, GlobFilter};
use crate::security::{FileOperation, PermissionStore};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

impl From<FileError> for Failure {
    fn from(err: FileError) -> Self {
        let suggestion = match &err {
            FileError::NotFound(_) => {
                "Check that the path exists; use list_directory or glob to locate it"
            }
            FileError::PermissionDenied(_) => {
                "Check the file permissions or pick a location the user can access"
            }
            FileError::NotADirectory(_) => "Pass a directory path, or use read_file for files",
            FileError::NotAbsolute(_) => "Pass an absolute path such as /home/user/project",
            FileError::InvalidPattern { .. } => "Fix the pattern syntax, e.g. **/*.rs or src/*.toml",
            FileError::Unavailable { .. } => {
                return Failure::new(format!(
                    "{}. Do not retry: the application must be fully restarted before this works.",
                    err
                ))
                .with_suggestion("Tell the user to quit and reopen the app, then try again")
                .requires_restart();
            }
            FileError::Io { .. } => "Retry, or check that the disk and path are accessible",
        };
        Failure::new(err.to_string())
            .with_suggestion(suggestion)
            .retryable(err.is_retryable())
    }
}

async fn blocking<T, F>(f: F) -> Result<T, Failure>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, FileError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .or_failure_ctx("Search task failed", "Retry the search")?
        .map_err(Failure::from)
}

#[derive(Deserialize)]
struct PathArgs {
    path: PathBuf,
}

pub struct ListDirectoryTool;

#[async_trait]
impl AgentTool for ListDirectoryTool {
    fn name(&self) -> &'static str {
        "list_directory"
    }

    fn description(&self) -> &'static str {
        "List the entries of a directory (absolute path). Folders come first."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Files
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required(
            "path",
            "Absolute directory path",
            ParamType::String,
        )]
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let PathArgs { path } = parse_args(args)?;
        let entries = files::list_directory(&path).await?;
        success(
            format!("Found {} entries in {}", entries.len(), path.display()),
            json!({
                "path": path,
                "count": entries.len(),
                "entries": entries,
            }),
        )
    }
}

#[derive(Deserialize)]
struct GlobArgs {
    pattern: String,
    path: Option<PathBuf>,
    #[serde(rename = "type")]
    kind: String,
}

pub struct GlobTool {
    limit: usize,
}

impl GlobTool {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            limit: config.glob_max_results,
        }
    }
}

#[async_trait]
impl AgentTool for GlobTool {
    fn name(&self) -> &'static str {
        "glob"
    }

    fn description(&self) -> &'static str {
        "Find files and folders matching a glob pattern such as **/*.md, relative to an optional base path."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Files
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("pattern", "Glob pattern", ParamType::String),
            ParamSpec::optional("path", "Base directory for relative patterns", ParamType::String),
            ParamSpec::optional(
                "type",
                "Restrict results to files or folders",
                ParamType::Enum(&["all", "file", "folder"]),
            )
            .with_default("all"),
        ]
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let args: GlobArgs = parse_args(args)?;
        let filter = match args.kind.as_str() {
            "file" => GlobFilter::Files,
            "folder" => GlobFilter::Folders,
            _ => GlobFilter::All,
        };
        let limit = self.limit;
        let pattern = args.pattern.clone();
        let outcome =
            blocking(move || files::glob_entries(&pattern, args.path.as_deref(), filter, limit))
                .await?;

        let message = if outcome.entries.is_empty() {
            format!("No files matched pattern '{}'", args.pattern)
        } else if outcome.truncated {
            format!(
                "Found more than {} matches; showing the first {}",
                limit,
                outcome.entries.len()
            )
        } else {
            format!("Found {} matches", outcome.entries.len())
        };
        success(
            message,
            json!({
                "files": outcome.entries,
                "count": outcome.entries.len(),
                "truncated": outcome.truncated,
            }),
        )
    }
}

#[derive(Deserialize)]
struct GrepArgs {
    pattern: String,
    path: PathBuf,
    max_results: usize,
}

pub struct GrepTool {
    default_max: usize,
}

impl GrepTool {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            default_max: config.grep_max_results.clamp(1, 500),
        }
    }
}

#[async_trait]
impl AgentTool for GrepTool {
    fn name(&self) -> &'static str {
        "grep"
    }

    fn description(&self) -> &'static str {
        "Search file contents for a case-insensitive regex (invalid regex falls back to a literal match). \
         Skips VCS, dependency and build directories."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Files
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("pattern", "Regex or literal text", ParamType::String),
            ParamSpec::required("path", "File or directory to search", ParamType::String),
            ParamSpec::optional(
                "max_results",
                "Stop after this many matches",
                ParamType::integer_between(1, 500),
            )
            .with_default(self.default_max),
        ]
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let GrepArgs {
            pattern,
            path,
            max_results,
        } = parse_args(args)?;
        let needle = pattern.clone();
        let matches = blocking(move || files::grep(&needle, &path, max_results)).await?;

        let message = if matches.is_empty() {
            format!("No matches for '{}'", pattern)
        } else {
            format!("Found {} matches for '{}'", matches.len(), pattern)
        };
        success(
            message,
            json!({
                "count": matches.len(),
                "truncated": matches.len() >= max_results,
                "matches": matches,
            }),
        )
    }
}

pub struct ReadFileTool;

#[async_trait]
impl AgentTool for ReadFileTool {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn description(&self) -> &'static str {
        "Read a text file and return its full content."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Files
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required("path", "File path", ParamType::String)]
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let PathArgs { path } = parse_args(args)?;
        let content = files::read_text(&path).await?;
        success(
            format!("Read {} bytes from {}", content.len(), path.display()),
            json!({
                "path": path,
                "length": content.len(),
                "content": content,
            }),
        )
    }
}

pub struct ReadFileBase64Tool {
    reader: Option<Arc<dyn BinaryReader>>,
}

impl ReadFileBase64Tool {
    /// `None` when the host never wired a binary reader into this process
    pub fn new(reader: Option<Arc<dyn BinaryReader>>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl AgentTool for ReadFileBase64Tool {
    fn name(&self) -> &'static str {
        "read_file_base64"
    }

    fn description(&self) -> &'static str {
        "Read a binary file (image, PDF, ...) as base64 with its MIME type and a data URL."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Files
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required("path", "File path", ParamType::String)]
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let PathArgs { path } = parse_args(args)?;
        let file = files::read_base64(self.reader.as_deref(), &path).await?;
        let mut payload = serde_json::to_value(&file).or_failure("Retry the read")?;
        payload["path"] = json!(path);
        success(
            format!("Read {} ({}, {} bytes)", path.display(), file.mime_type, file.size),
            payload,
        )
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriteArgs {
    path: PathBuf,
    content: String,
    create_dirs: bool,
}

pub struct WriteFileTool {
    permissions: Arc<PermissionStore>,
}

impl WriteFileTool {
    pub fn new(permissions: Arc<PermissionStore>) -> Self {
        Self { permissions }
    }

    fn require_grant(&self, path: &Path) -> Result<(), Failure> {
        if self.permissions.is_granted(path, FileOperation::Write) {
            return Ok(());
        }
        let dir = path.parent().unwrap_or(path);
        Err(Failure::new(format!("No write permission for {}", path.display()))
            .with_suggestion(format!(
                "Ask the user to grant write access to {}",
                dir.display()
            ))
            .needs_permission()
            .with_details(json!({ "path": path, "operation": "write" })))
    }
}

#[async_trait]
impl AgentTool for WriteFileTool {
    fn name(&self) -> &'static str {
        "write_file"
    }

    fn description(&self) -> &'static str {
        "Write text content to a file (absolute path). Requires the user to have granted write access."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Files
    }

    fn is_side_effect(&self) -> bool {
        true
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("path", "Absolute file path", ParamType::String),
            ParamSpec::required("content", "Text to write", ParamType::String),
            ParamSpec::optional(
                "createDirs",
                "Create missing parent directories",
                ParamType::Boolean,
            )
            .with_default(false),
        ]
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let args: WriteArgs = parse_args(args)?;
        if !args.path.is_absolute() {
            return Err(FileError::NotAbsolute(args.path).into());
        }
        if args.path.components().any(|c| c == Component::ParentDir) {
            return Err(Failure::new(format!(
                "Refusing to write through '..' in {}",
                args.path.display()
            ))
            .with_suggestion("Pass the resolved absolute path without '..' components")
            .retryable(false));
        }
        self.require_grant(&args.path)?;

        let written = files::write_text(&args.path, &args.content, args.create_dirs).await?;
        tracing::info!("Wrote {} bytes to {:?}", written, args.path);
        success(
            format!("Wrote {} bytes to {}", written, args.path.display()),
            json!({ "path": args.path, "bytesWritten": written }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::GrantScope;
    use std::fs;

    #[tokio::test]
    async fn test_glob_empty_is_success() {
        let dir = tempfile::tempdir().unwrap();
        let tool = GlobTool::new(&SearchConfig::default());
        let value = tool
            .execute(json!({ "pattern": "*.nothing", "path": dir.path(), "type": "all" }))
            .await
            .unwrap();
        assert_eq!(value["files"], json!([]));
        assert!(value["message"].as_str().unwrap().contains("No files matched"));
    }

    #[tokio::test]
    async fn test_grep_invalid_regex_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "call foo(bar\nother\n").unwrap();
        let tool = GrepTool::new(&SearchConfig::default());
        let value = tool
            .execute(json!({ "pattern": "foo(", "path": dir.path(), "max_results": 50 }))
            .await
            .unwrap();
        assert_eq!(value["count"], 1);
        assert_eq!(value["matches"][0]["line"], 1);
    }

    #[tokio::test]
    async fn test_list_missing_directory() {
        let failure = ListDirectoryTool
            .execute(json!({ "path": "/definitely/not/here" }))
            .await
            .unwrap_err();
        assert!(failure.suggestion.unwrap().contains("list_directory"));
        assert_eq!(failure.retryable, Some(true));
    }

    #[tokio::test]
    async fn test_base64_unavailable_requires_restart() {
        let failure = ReadFileBase64Tool::new(None)
            .execute(json!({ "path": "/tmp/pixel.png" }))
            .await
            .unwrap_err();
        assert_eq!(failure.retryable, Some(false));
        assert_eq!(failure.requires_restart, Some(true));
        assert!(failure.message.contains("restarted"));
    }

    #[tokio::test]
    async fn test_base64_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();
        let tool = ReadFileBase64Tool::new(Some(Arc::new(files::LocalBinaryReader)));
        let value = tool.execute(json!({ "path": path })).await.unwrap();
        assert_eq!(value["mimeType"], "image/png");
        assert!(value["dataUrl"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_write_requires_permission() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes/out.txt");
        let permissions = Arc::new(PermissionStore::in_memory());
        let tool = WriteFileTool::new(permissions.clone());
        let args = json!({ "path": path, "content": "hello", "createDirs": true });

        let failure = tool.execute(args.clone()).await.unwrap_err();
        assert_eq!(failure.needs_permission, Some(true));
        assert!(!path.exists());

        permissions
            .grant(dir.path(), FileOperation::Write, GrantScope::Session)
            .unwrap();
        let value = tool.execute(args).await.unwrap();
        assert_eq!(value["bytesWritten"], 5);
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_write_rejects_parent_components() {
        let dir = tempfile::tempdir().unwrap();
        let granted = dir.path().join("project");
        fs::create_dir(&granted).unwrap();
        let permissions = Arc::new(PermissionStore::in_memory());
        permissions
            .grant(&granted, FileOperation::Write, GrantScope::Session)
            .unwrap();
        let tool = WriteFileTool::new(permissions);

        let escaped = granted.join("../outside.txt");
        let failure = tool
            .execute(json!({ "path": escaped, "content": "x", "createDirs": false }))
            .await
            .unwrap_err();
        assert!(failure.message.contains(".."));
        assert!(!dir.path().join("outside.txt").exists());
    }
}
