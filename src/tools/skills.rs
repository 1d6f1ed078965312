//! Skill marketplace tools (agent-facing; failures are reported, not hidden)

use super::result::{parse_args, success, Failure, ToolResult};
use super::schema::{ParamSpec, ParamType};
use super::traits::{AgentTool, ToolCategory};
use crate::skills::{SkillError, SkillRegistryClient};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

fn registry_failure(action: &str, err: SkillError) -> Failure {
    let retryable = err.is_retryable();
    Failure::new(format!("Skill {} failed: {}", action, err))
        .with_suggestion("The skill registry may be unreachable; wait a moment and retry")
        .retryable(retryable)
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    limit: usize,
}

pub struct SearchSkillsTool {
    client: Arc<dyn SkillRegistryClient>,
}

impl SearchSkillsTool {
    pub fn new(client: Arc<dyn SkillRegistryClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AgentTool for SearchSkillsTool {
    fn name(&self) -> &'static str {
        "search_skills"
    }

    fn description(&self) -> &'static str {
        "Search the skill marketplace for reusable instructions matching a query."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Skills
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("query", "What the skill should help with", ParamType::String),
            ParamSpec::optional("limit", "Maximum results", ParamType::integer_between(1, 20))
                .with_default(5),
        ]
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let SearchArgs { query, limit } = parse_args(args)?;
        let skills = self
            .client
            .search(&query, limit)
            .await
            .map_err(|e| registry_failure("search", e))?;

        let message = if skills.is_empty() {
            format!("No skills found for '{}'", query)
        } else {
            format!("Found {} skills for '{}'", skills.len(), query)
        };
        success(message, json!({ "count": skills.len(), "skills": skills }))
    }
}

#[derive(Deserialize)]
struct GetArgs {
    id: String,
}

pub struct GetSkillTool {
    client: Arc<dyn SkillRegistryClient>,
}

impl GetSkillTool {
    pub fn new(client: Arc<dyn SkillRegistryClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AgentTool for GetSkillTool {
    fn name(&self) -> &'static str {
        "get_skill"
    }

    fn description(&self) -> &'static str {
        "Fetch the full content of a skill by id (ids come from search_skills)."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Skills
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required("id", "Skill id", ParamType::String)]
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let GetArgs { id } = parse_args(args)?;
        match self.client.fetch(&id).await {
            Ok(Some(content)) => success(
                format!("Loaded skill '{}'", id),
                json!({ "id": id, "content": content }),
            ),
            Ok(None) => Err(Failure::new(format!("Skill '{}' was not found", id))
                .with_suggestion("Use search_skills to find a valid skill id")
                .retryable(false)),
            Err(e) => Err(registry_failure("fetch", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::tests::FakeRegistry;

    #[tokio::test]
    async fn test_search_failure_suggests_retry() {
        let tool = SearchSkillsTool::new(Arc::new(FakeRegistry {
            offline: true,
            ..Default::default()
        }));
        let failure = tool
            .execute(json!({ "query": "pdf", "limit": 5 }))
            .await
            .unwrap_err();
        assert!(failure.suggestion.unwrap().contains("retry"));
        assert_eq!(failure.retryable, Some(true));
    }

    #[tokio::test]
    async fn test_search_and_get() {
        let client: Arc<dyn SkillRegistryClient> = Arc::new(FakeRegistry::default());
        let value = SearchSkillsTool::new(client.clone())
            .execute(json!({ "query": "pdf", "limit": 5 }))
            .await
            .unwrap();
        assert_eq!(value["skills"][0]["id"], "pdf-tools");

        let value = GetSkillTool::new(client.clone())
            .execute(json!({ "id": "pdf-tools" }))
            .await
            .unwrap();
        assert!(value["content"].as_str().unwrap().starts_with("# PDF Tools"));

        let failure = GetSkillTool::new(client)
            .execute(json!({ "id": "missing" }))
            .await
            .unwrap_err();
        assert!(failure.message.contains("not found"));
    }
}
