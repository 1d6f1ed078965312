//! Uniform tool results
//!
//! Every executor returns [`ToolResult`]. Failures are values the agent can
//! read, never faults crossing the tool boundary.

use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;

pub type ToolResult = Result<Value, Failure>;

/// Structured failure returned to the agent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    error: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_restart: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs_browser_setup: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs_permission: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
            suggestion: None,
            retryable: None,
            requires_restart: None,
            needs_browser_setup: None,
            needs_permission: None,
            details: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    /// Capability missing from this process; only a restart helps
    pub fn requires_restart(mut self) -> Self {
        self.retryable = Some(false);
        self.requires_restart = Some(true);
        self
    }

    pub fn needs_browser_setup(mut self) -> Self {
        self.needs_browser_setup = Some(true);
        self
    }

    pub fn needs_permission(mut self) -> Self {
        self.needs_permission = Some(true);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({ "error": true, "message": self.message }))
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

/// Success payload with a `message` summary merged in
pub fn success(message: impl Into<String>, payload: Value) -> ToolResult {
    let message = Value::String(message.into());
    Ok(match payload {
        Value::Object(mut map) => {
            map.insert("message".to_string(), message);
            Value::Object(map)
        }
        Value::Null => json!({ "message": message }),
        other => json!({ "message": message, "result": other }),
    })
}

/// Collapse any displayable error into a [`Failure`] in one call
pub trait OrFailure<T> {
    fn or_failure(self, suggestion: &str) -> Result<T, Failure>;

    /// Prefix the error text with what was being attempted
    fn or_failure_ctx(self, context: &str, suggestion: &str) -> Result<T, Failure>;
}

impl<T, E: fmt::Display> OrFailure<T> for Result<T, E> {
    fn or_failure(self, suggestion: &str) -> Result<T, Failure> {
        self.map_err(|e| Failure::new(e.to_string()).with_suggestion(suggestion))
    }

    fn or_failure_ctx(self, context: &str, suggestion: &str) -> Result<T, Failure> {
        self.map_err(|e| Failure::new(format!("{}: {}", context, e)).with_suggestion(suggestion))
    }
}

/// Deserialize validated arguments into a typed struct
pub fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, Failure> {
    serde_json::from_value(args).or_failure_ctx(
        "Arguments did not match the tool parameters",
        "Check the parameter names and types against the tool schema",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_shape() {
        let failure = Failure::new("File not found")
            .with_suggestion("Check the path")
            .retryable(true);
        assert_eq!(
            failure.to_value(),
            json!({
                "error": true,
                "message": "File not found",
                "suggestion": "Check the path",
                "retryable": true
            })
        );
    }

    #[test]
    fn test_requires_restart_is_not_retryable() {
        let value = Failure::new("unavailable").requires_restart().to_value();
        assert_eq!(value["retryable"], false);
        assert_eq!(value["requiresRestart"], true);
        assert!(value.get("needsBrowserSetup").is_none());
    }

    #[test]
    fn test_success_adds_message() {
        let value = success("Listed 2 entries", json!({ "entries": [1, 2] })).unwrap();
        assert_eq!(value["message"], "Listed 2 entries");
        assert_eq!(value["entries"], json!([1, 2]));

        let value = success("done", json!(42)).unwrap();
        assert_eq!(value, json!({ "message": "done", "result": 42 }));
    }

    #[test]
    fn test_or_failure() {
        let err: Result<(), std::io::Error> = Err(std::io::Error::other("disk on fire"));
        let failure = err.or_failure_ctx("Write failed", "Try again").unwrap_err();
        assert_eq!(failure.message, "Write failed: disk on fire");
        assert_eq!(failure.suggestion.as_deref(), Some("Try again"));
        assert_eq!(failure.to_string(), "Write failed: disk on fire (Try again)");
    }
}
