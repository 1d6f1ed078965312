//! Tool Catalog
//!
//! Registry mapping tool names to tools. `invoke` validates arguments against
//! the tool's schema before the executor runs, times the call, and turns
//! both `Failure`s and executor panics into a `ToolResponse`.

use super::browser::BrowserTool;
use super::files::{GlobTool, GrepTool, ListDirectoryTool, ReadFileBase64Tool, ReadFileTool, WriteFileTool};
use super::result::Failure;
use super::schema::{self, SchemaViolation};
use super::shell::{BashTool, CommandRunner};
use super::skills::{GetSkillTool, SearchSkillsTool};
use super::tasks::{AskQuestionTool, TodoWriteTool};
use super::traits::{AgentTool, ToolCategory, ToolDescriptor};
use crate::browser::BrowserController;
use crate::config::DeskpilotConfig;
use crate::files::BinaryReader;
use crate::security::PermissionStore;
use crate::skills::SkillRegistryClient;
use crate::state::{QuestionStore, TodoStore};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

/// Request to invoke a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    /// Name of the tool to invoke
    pub tool_name: String,
    /// Arguments as JSON object
    pub arguments: Value,
    /// Request correlation ID
    pub request_id: String,
}

impl ToolRequest {
    pub fn new(tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Response from tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Request correlation ID
    pub request_id: String,
    pub success: bool,
    /// Success payload, or the serialized `Failure`
    pub data: Value,
    /// Failure message, when not successful
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub execution_time_ms: u64,
}

/// Calls rejected before any executor ran
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("tool `{tool}` rejected its arguments: {violation}")]
    InvalidArguments {
        tool: String,
        #[source]
        violation: SchemaViolation,
    },
}

/// Shared collaborators the built-in tools are wired to
#[derive(Clone)]
pub struct ToolServices {
    pub config: DeskpilotConfig,
    pub runner: Arc<dyn CommandRunner>,
    /// `None` leaves `read_file_base64` in its capability-unavailable mode
    pub binary_reader: Option<Arc<dyn BinaryReader>>,
    pub permissions: Arc<PermissionStore>,
    pub todos: Arc<TodoStore>,
    pub questions: Arc<QuestionStore>,
    pub browser: Arc<BrowserController>,
    pub skills: Arc<dyn SkillRegistryClient>,
}

#[derive(Default)]
pub struct ToolCatalog {
    tools: Vec<Arc<dyn AgentTool>>,
    index: HashMap<&'static str, usize>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in tool wired to `services`
    pub fn builtin(services: &ToolServices) -> Self {
        let mut catalog = Self::new();
        catalog.register(BashTool::new(
            services.runner.clone(),
            services.config.shell.clone(),
        ));

        catalog.register(ListDirectoryTool);
        catalog.register(GlobTool::new(&services.config.search));
        catalog.register(GrepTool::new(&services.config.search));
        catalog.register(ReadFileTool);
        catalog.register(ReadFileBase64Tool::new(services.binary_reader.clone()));
        catalog.register(WriteFileTool::new(services.permissions.clone()));

        catalog.register(TodoWriteTool::new(services.todos.clone()));
        catalog.register(AskQuestionTool::new(services.questions.clone()));

        for tool in BrowserTool::all(&services.browser) {
            catalog.register(tool);
        }

        catalog.register(SearchSkillsTool::new(services.skills.clone()));
        catalog.register(GetSkillTool::new(services.skills.clone()));

        tracing::debug!("Tool catalog ready with {} tools", catalog.len());
        catalog
    }

    /// Add a tool, replacing any tool with the same name
    pub fn register<T: AgentTool + 'static>(&mut self, tool: T) {
        let name = tool.name();
        let tool: Arc<dyn AgentTool> = Arc::new(tool);
        match self.index.get(name).copied() {
            Some(i) => self.tools[i] = tool,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AgentTool>> {
        self.index.get(name).map(|&i| self.tools[i].clone())
    }

    /// Descriptors in registration order
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    pub fn descriptors_by_category(&self, category: ToolCategory) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .filter(|t| t.category() == category)
            .map(|t| t.descriptor())
            .collect()
    }

    pub async fn invoke(&self, request: ToolRequest) -> Result<ToolResponse, InvocationError> {
        let start = Instant::now();
        let tool = self
            .get(&request.tool_name)
            .ok_or_else(|| InvocationError::UnknownTool(request.tool_name.clone()))?;

        let args = schema::validate(&tool.params(), &request.arguments).map_err(|violation| {
            tracing::warn!("Rejected {} call: {}", request.tool_name, violation);
            InvocationError::InvalidArguments {
                tool: request.tool_name.clone(),
                violation,
            }
        })?;

        tracing::info!(
            tool = %request.tool_name,
            request_id = %request.request_id,
            "Invoking tool"
        );

        let result = match AssertUnwindSafe(tool.execute(args)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!("Tool {} panicked: {}", request.tool_name, detail);
                Err(Failure::new(format!(
                    "Tool {} failed unexpectedly: {}",
                    request.tool_name, detail
                ))
                .with_suggestion("Try a different approach; retrying the same call will likely fail again")
                .retryable(false))
            }
        };

        let execution_time_ms = start.elapsed().as_millis() as u64;
        let response = match result {
            Ok(data) => ToolResponse {
                request_id: request.request_id,
                success: true,
                data,
                error: None,
                execution_time_ms,
            },
            Err(failure) => {
                tracing::info!("Tool {} returned failure: {}", request.tool_name, failure);
                ToolResponse {
                    request_id: request.request_id,
                    success: false,
                    error: Some(failure.message.clone()),
                    data: failure.to_value(),
                    execution_time_ms,
                }
            }
        };
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::controller::tests::controller;
    use crate::skills::tests::FakeRegistry;
    use crate::state::UiEvents;
    use crate::tools::result::ToolResult;
    use crate::tools::schema::{ParamSpec, ParamType};
    use crate::tools::shell::LocalCommandRunner;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn services() -> ToolServices {
        let events = UiEvents::default();
        let (browser, _, _) = controller(None);
        ToolServices {
            config: DeskpilotConfig::default(),
            runner: Arc::new(LocalCommandRunner),
            binary_reader: None,
            permissions: Arc::new(PermissionStore::in_memory()),
            todos: Arc::new(TodoStore::new(events.clone())),
            questions: Arc::new(QuestionStore::new(events)),
            browser: Arc::new(browser),
            skills: Arc::new(FakeRegistry::default()),
        }
    }

    /// Counts executions; panics when asked to
    #[derive(Default)]
    struct ProbeTool {
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AgentTool for ProbeTool {
        fn name(&self) -> &'static str {
            "probe"
        }
        fn description(&self) -> &'static str {
            "test probe"
        }
        fn category(&self) -> ToolCategory {
            ToolCategory::Tasks
        }
        fn params(&self) -> Vec<ParamSpec> {
            vec![ParamSpec::required("mode", "ok or panic", ParamType::Enum(&["ok", "panic"]))]
        }
        async fn execute(&self, args: Value) -> ToolResult {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if args["mode"] == "panic" {
                panic!("probe exploded");
            }
            Ok(json!({ "message": "ok" }))
        }
    }

    #[test]
    fn test_builtin_catalog() {
        let catalog = ToolCatalog::builtin(&services());
        assert_eq!(catalog.len(), 20);

        let names: Vec<String> = catalog.descriptors().into_iter().map(|d| d.name).collect();
        for expected in ["bash", "grep", "todo_write", "ask_question", "browser_navigate", "get_skill"] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
        assert_eq!(catalog.descriptors_by_category(ToolCategory::Browser).len(), 9);
        assert_eq!(catalog.descriptors_by_category(ToolCategory::Files).len(), 6);

        let bash = catalog.get("bash").unwrap().descriptor();
        assert!(bash.is_side_effect);
        assert_eq!(bash.input_schema.required, vec!["command".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let catalog = ToolCatalog::builtin(&services());
        let err = catalog
            .invoke(ToolRequest::new("rm_everything", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, InvocationError::UnknownTool(name) if name == "rm_everything"));
    }

    #[tokio::test]
    async fn test_invalid_arguments_never_reach_executor() {
        let mut catalog = ToolCatalog::new();
        let probe = ProbeTool::default();
        let runs = probe.runs.clone();
        catalog.register(probe);

        let err = catalog
            .invoke(ToolRequest::new("probe", json!({ "mode": "sideways" })))
            .await
            .unwrap_err();
        assert!(matches!(err, InvocationError::InvalidArguments { .. }));
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        let response = catalog
            .invoke(ToolRequest::new("probe", json!({ "mode": "ok" })))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panic_becomes_failure() {
        let mut catalog = ToolCatalog::new();
        catalog.register(ProbeTool::default());
        let response = catalog
            .invoke(ToolRequest::new("probe", json!({ "mode": "panic" })))
            .await
            .unwrap();
        assert!(!response.success);
        assert_eq!(response.data["error"], true);
        assert!(response.error.unwrap().contains("probe exploded"));
    }

    #[tokio::test]
    async fn test_failure_response_shape() {
        let catalog = ToolCatalog::builtin(&services());
        let request = ToolRequest::new("browser_navigate", json!({ "url": "example.com" }));
        let request_id = request.request_id.clone();
        let response = catalog.invoke(request).await.unwrap();

        assert_eq!(response.request_id, request_id);
        assert!(!response.success);
        assert_eq!(response.data["needsBrowserSetup"], true);
        assert!(response.error.is_some());
    }

    #[tokio::test]
    async fn test_register_replaces_by_name() {
        let mut catalog = ToolCatalog::new();
        catalog.register(ProbeTool::default());
        catalog.register(ProbeTool::default());
        assert_eq!(catalog.len(), 1);
    }
}
