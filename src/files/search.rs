//! Glob matching and content search
//!
//! Grep compiles the pattern as a case-insensitive regex and falls back to a
//! literal match when the pattern is not valid regex syntax, so a search
//! never fails because of the pattern alone. Unreadable files are skipped.

use super::{FileEntry, FileError};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Primitive-level cap; the grep tool passes its own default
pub const GREP_DEFAULT_MAX_RESULTS: usize = 100;
/// Matched line content is trimmed and cut to this many characters
pub const GREP_LINE_MAX_CHARS: usize = 200;

const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    "bower_components",
    "vendor",
    "target",
    "dist",
    "build",
    "out",
    ".next",
    ".turbo",
    "__pycache__",
    ".venv",
    "coverage",
];

const EXCLUDED_SUFFIXES: &[&str] = &[".min.js", ".min.css", ".map"];

#[derive(Debug, Clone, Serialize)]
pub struct GrepMatch {
    pub file: String,
    /// 1-based
    pub line: usize,
    pub content: String,
    #[serde(rename = "match")]
    pub matched: String,
}

/// Compile a case-insensitive pattern, escaping it when it is not valid regex.
/// The flag reports whether the literal fallback was used.
pub fn compile_pattern(pattern: &str) -> Result<(Regex, bool), FileError> {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(regex) => Ok((regex, false)),
        Err(e) => {
            tracing::debug!("Pattern '{}' is not valid regex ({}); using literal", pattern, e);
            RegexBuilder::new(&regex::escape(pattern))
                .case_insensitive(true)
                .build()
                .map(|regex| (regex, true))
                .map_err(|e| FileError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                })
        }
    }
}

fn is_excluded_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| EXCLUDED_DIRS.contains(&name))
            .unwrap_or(false)
}

fn is_excluded_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    EXCLUDED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Search `path` (file or directory, recursive) for lines matching `pattern`.
/// Stops as soon as `max_results` matches are collected.
pub fn grep(pattern: &str, path: &Path, max_results: usize) -> Result<Vec<GrepMatch>, FileError> {
    if !path.exists() {
        return Err(FileError::NotFound(path.to_path_buf()));
    }
    let (regex, _) = compile_pattern(pattern)?;
    let mut matches = Vec::new();
    if max_results == 0 {
        return Ok(matches);
    }

    let walker = WalkDir::new(path)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_excluded_dir(e));

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() || is_excluded_file(entry.path()) {
            continue;
        }
        // Binary or unreadable files are skipped silently
        let Ok(contents) = std::fs::read_to_string(entry.path()) else {
            continue;
        };

        for (idx, line) in contents.lines().enumerate() {
            if let Some(found) = regex.find(line) {
                matches.push(GrepMatch {
                    file: entry.path().to_string_lossy().to_string(),
                    line: idx + 1,
                    content: crate::utils::truncate_chars(line.trim(), GREP_LINE_MAX_CHARS)
                        .to_string(),
                    matched: found.as_str().to_string(),
                });
                if matches.len() >= max_results {
                    return Ok(matches);
                }
            }
        }
    }

    Ok(matches)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GlobFilter {
    #[default]
    All,
    Files,
    Folders,
}

impl GlobFilter {
    fn accepts(&self, entry: &FileEntry) -> bool {
        match self {
            GlobFilter::All => true,
            GlobFilter::Files => !entry.is_folder(),
            GlobFilter::Folders => entry.is_folder(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GlobOutcome {
    pub entries: Vec<FileEntry>,
    pub truncated: bool,
}

/// Resolve a glob pattern, relative patterns against `base` (or the cwd)
pub fn glob_entries(
    pattern: &str,
    base: Option<&Path>,
    filter: GlobFilter,
    limit: usize,
) -> Result<GlobOutcome, FileError> {
    let full_pattern = if Path::new(pattern).is_absolute() {
        PathBuf::from(pattern)
    } else {
        let base = match base {
            Some(base) => base.to_path_buf(),
            None => std::env::current_dir().map_err(|e| FileError::from_io(Path::new("."), e))?,
        };
        base.join(pattern)
    };

    let paths = glob::glob(&full_pattern.to_string_lossy()).map_err(|e| {
        FileError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.msg.to_string(),
        }
    })?;

    let mut entries = Vec::new();
    let mut truncated = false;
    for path in paths.filter_map(|p| p.ok()) {
        let Ok(metadata) = std::fs::metadata(&path) else {
            continue;
        };
        let entry = FileEntry::from_metadata(&path, &metadata);
        if !filter.accepts(&entry) {
            continue;
        }
        if entries.len() >= limit {
            truncated = true;
            break;
        }
        entries.push(entry);
    }

    Ok(GlobOutcome { entries, truncated })
}
