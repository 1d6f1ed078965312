//! Deskpilot - tool execution core for a local desktop agent
//!
//! Exposes file, shell, browser, task and skill tools to an agent runtime,
//! and the todo/question/browser state the UI observes.

pub mod browser;
pub mod config;
pub mod files;
pub mod security;
pub mod skills;
pub mod state;
pub mod tools;
pub mod utils;

use browser::{BrowserController, BrowserDriver};
use config::{DeskpilotConfig, JsonSettingsStore, SettingsStore};
use files::{BinaryReader, LocalBinaryReader};
use security::{PermissionStorage, PermissionStore, SledPermissionStorage};
use skills::{HttpSkillRegistry, SkillError, SkillRegistryClient, SkillSearch};
use state::{format_answers, QuestionStore, TodoStore, UiEvents};
use std::sync::Arc;
use std::time::Duration;
use tools::{CommandRunner, LocalCommandRunner, ToolCatalog, ToolServices};

/// External collaborators the core is wired to
pub struct Collaborators {
    pub settings: Arc<dyn SettingsStore>,
    pub driver: Arc<dyn BrowserDriver>,
    pub permission_storage: Option<Arc<dyn PermissionStorage>>,
    pub skills: Arc<dyn SkillRegistryClient>,
    pub runner: Arc<dyn CommandRunner>,
    pub binary_reader: Option<Arc<dyn BinaryReader>>,
}

impl Collaborators {
    /// Local-machine defaults: JSON settings, sled grants, HTTP skill registry
    pub fn local(
        config: &DeskpilotConfig,
        driver: Arc<dyn BrowserDriver>,
    ) -> Result<Self, SkillError> {
        let settings_path = config
            .storage
            .settings_file
            .clone()
            .unwrap_or_else(JsonSettingsStore::default_path);

        let permission_storage: Option<Arc<dyn PermissionStorage>> =
            if config.storage.persist_permissions {
                match SledPermissionStorage::new() {
                    Ok(storage) => Some(Arc::new(storage)),
                    Err(e) => {
                        tracing::warn!("Persistent permissions unavailable, session only: {}", e);
                        None
                    }
                }
            } else {
                None
            };

        Ok(Self {
            settings: Arc::new(JsonSettingsStore::open(settings_path)),
            driver,
            permission_storage,
            skills: Arc::new(HttpSkillRegistry::from_config(&config.skills)?),
            runner: Arc::new(LocalCommandRunner),
            binary_reader: Some(Arc::new(LocalBinaryReader)),
        })
    }
}

/// Shared state objects plus the tool catalog wired to them.
///
/// The same stores are handed to the UI layer and to tool dispatch.
pub struct AgentCore {
    pub config: DeskpilotConfig,
    pub events: UiEvents,
    pub todos: Arc<TodoStore>,
    pub questions: Arc<QuestionStore>,
    pub browser: Arc<BrowserController>,
    pub permissions: Arc<PermissionStore>,
    pub skill_search: Arc<SkillSearch>,
    pub catalog: ToolCatalog,
}

impl AgentCore {
    pub fn new(config: DeskpilotConfig, collaborators: Collaborators) -> Self {
        let events = UiEvents::default();
        let todos = Arc::new(TodoStore::new(events.clone()));
        let questions = Arc::new(QuestionStore::new(events.clone()));
        let browser = Arc::new(BrowserController::new(
            collaborators.settings,
            collaborators.driver,
            events.clone(),
        ));
        let permissions = Arc::new(match collaborators.permission_storage {
            Some(storage) => PermissionStore::with_storage(storage),
            None => PermissionStore::in_memory(),
        });
        let skill_search = Arc::new(SkillSearch::new(
            collaborators.skills.clone(),
            Duration::from_millis(config.skills.search_debounce_ms),
        ));

        let catalog = ToolCatalog::builtin(&ToolServices {
            config: config.clone(),
            runner: collaborators.runner,
            binary_reader: collaborators.binary_reader,
            permissions: permissions.clone(),
            todos: todos.clone(),
            questions: questions.clone(),
            browser: browser.clone(),
            skills: collaborators.skills,
        });

        Self {
            config,
            events,
            todos,
            questions,
            browser,
            permissions,
            skill_search,
            catalog,
        }
    }

    /// Consume a submitted question set as text for the next agent turn
    pub fn take_answers_message(&self) -> Option<String> {
        self.questions
            .take_submitted_answers()
            .map(|(set, answers)| format_answers(&set, &answers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::controller::tests::FakeDriver;
    use crate::config::MemorySettingsStore;
    use crate::skills::tests::FakeRegistry;
    use crate::state::{NewOption, NewQuestion};
    use crate::tools::ToolRequest;
    use serde_json::json;

    fn core() -> AgentCore {
        AgentCore::new(
            DeskpilotConfig::default(),
            Collaborators {
                settings: Arc::new(MemorySettingsStore::default()),
                driver: Arc::new(FakeDriver::default()),
                permission_storage: None,
                skills: Arc::new(FakeRegistry::default()),
                runner: Arc::new(LocalCommandRunner),
                binary_reader: None,
            },
        )
    }

    #[tokio::test]
    async fn test_tool_writes_are_visible_to_ui() {
        let core = core();
        let mut rx = core.events.subscribe();

        let response = core
            .catalog
            .invoke(ToolRequest::new(
                "todo_write",
                json!({ "todos": [{ "content": "Scan repo" }] }),
            ))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(core.todos.todos().len(), 1);
        assert!(matches!(
            rx.try_recv(),
            Ok(state::UiEvent::TodosChanged { .. })
        ));
    }

    #[test]
    fn test_take_answers_message() {
        let core = core();
        assert!(core.take_answers_message().is_none());

        core.questions.set_questions(vec![NewQuestion {
            id: Some("fmt".to_string()),
            question: "Which format?".to_string(),
            options: vec![
                NewOption {
                    id: Some("csv".to_string()),
                    label: "CSV".to_string(),
                },
                NewOption {
                    id: Some("json".to_string()),
                    label: "JSON".to_string(),
                },
            ],
            allow_custom: true,
        }]);
        core.questions.select_option("fmt", "json").unwrap();
        core.questions.submit_answers();

        let message = core.take_answers_message().unwrap();
        assert!(message.contains("Which format?: JSON"));
        assert!(core.questions.active_question_set().is_none());
    }
}
