//! Agent tool trait and discovery descriptor

use super::result::ToolResult;
use super::schema::{JsonSchema, ParamSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    Shell,
    Files,
    Tasks,
    Browser,
    Skills,
}

impl ToolCategory {
    pub const ALL: [ToolCategory; 5] = [
        ToolCategory::Shell,
        ToolCategory::Files,
        ToolCategory::Tasks,
        ToolCategory::Browser,
        ToolCategory::Skills,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCategory::Shell => "shell",
            ToolCategory::Files => "files",
            ToolCategory::Tasks => "tasks",
            ToolCategory::Browser => "browser",
            ToolCategory::Skills => "skills",
        }
    }
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ToolCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown tool category: {}", s))
    }
}

/// Tool descriptor for capability discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool name (e.g., "bash", "browser_navigate")
    pub name: String,
    /// Human-readable description for LLM context
    pub description: String,
    /// JSON Schema for input parameters
    pub input_schema: JsonSchema,
    /// Whether tool execution has side effects
    pub is_side_effect: bool,
    pub category: ToolCategory,
}

/// A named, schema-validated operation exposed to the agent runtime
#[async_trait]
pub trait AgentTool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn category(&self) -> ToolCategory;

    /// Parameter declaration; validated by the catalog before `execute`
    fn params(&self) -> Vec<ParamSpec>;

    fn is_side_effect(&self) -> bool {
        false
    }

    /// Run with arguments that already passed validation, defaults applied
    async fn execute(&self, args: serde_json::Value) -> ToolResult;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: JsonSchema::from_params(&self.params()),
            is_side_effect: self.is_side_effect(),
            category: self.category(),
        }
    }
}
