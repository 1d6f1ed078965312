//! UI event hub
//!
//! Stores and the browser controller publish here; the UI layer subscribes.

use super::questions::QuestionSet;
use super::todos::TodoItem;
use serde::Serialize;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    TodosChanged {
        todos: Vec<TodoItem>,
    },
    QuestionsChanged {
        question_set: Option<QuestionSet>,
    },
    QuestionsSubmitted {
        set_id: String,
    },
    /// A browser tool ran before any browser was chosen; show the selection dialog
    BrowserSetupRequested {
        tool: String,
    },
    BrowserConfigured {
        browser: String,
    },
}

#[derive(Debug, Clone)]
pub struct UiEvents {
    tx: broadcast::Sender<UiEvent>,
}

impl Default for UiEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl UiEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.tx.subscribe()
    }

    /// Publish to current subscribers; dropped when nobody is listening
    pub fn emit(&self, event: UiEvent) {
        let _ = self.tx.send(event);
    }
}
