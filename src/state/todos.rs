//! Todo store
//!
//! Ordered task list shared by the agent (whole-list replacement through the
//! `todo_write` tool) and the UI (incremental edits).

use super::events::{UiEvent, UiEvents};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TodoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TodoStatus::Pending => "pending",
            TodoStatus::InProgress => "in_progress",
            TodoStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub content: String,
    pub status: TodoStatus,
}

/// Input item; the id is generated when absent
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTodo {
    #[serde(default)]
    pub id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub status: TodoStatus,
}

#[derive(Debug, Clone, Default)]
pub struct TodoPatch {
    pub content: Option<String>,
    pub status: Option<TodoStatus>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

pub struct TodoStore {
    items: RwLock<Vec<TodoItem>>,
    events: UiEvents,
}

impl TodoStore {
    pub fn new(events: UiEvents) -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            events,
        }
    }

    pub fn todos(&self) -> Vec<TodoItem> {
        self.items.read().map(|items| items.clone()).unwrap_or_default()
    }

    pub fn counts(&self) -> TodoCounts {
        let mut counts = TodoCounts::default();
        for item in self.todos() {
            match item.status {
                TodoStatus::Pending => counts.pending += 1,
                TodoStatus::InProgress => counts.in_progress += 1,
                TodoStatus::Completed => counts.completed += 1,
            }
        }
        counts
    }

    /// Replace the whole list. Duplicate ids keep the last occurrence.
    pub fn set_todos(&self, todos: Vec<NewTodo>) -> Vec<TodoItem> {
        let mut next: Vec<TodoItem> = Vec::with_capacity(todos.len());
        for todo in todos {
            let id = todo
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            next.retain(|existing| existing.id != id);
            next.push(TodoItem {
                id,
                content: todo.content,
                status: todo.status,
            });
        }

        self.replace(next.clone());
        tracing::debug!("Todo list replaced ({} items)", next.len());
        next
    }

    pub fn add_todo(&self, content: impl Into<String>, status: TodoStatus) -> TodoItem {
        let item = TodoItem {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            status,
        };
        self.mutate(|items| items.push(item.clone()));
        item
    }

    pub fn update_todo(&self, id: &str, patch: TodoPatch) -> Option<TodoItem> {
        let mut updated = None;
        self.mutate(|items| {
            if let Some(item) = items.iter_mut().find(|item| item.id == id) {
                if let Some(content) = patch.content {
                    item.content = content;
                }
                if let Some(status) = patch.status {
                    item.status = status;
                }
                updated = Some(item.clone());
            }
        });
        updated
    }

    pub fn remove_todo(&self, id: &str) -> bool {
        let mut removed = false;
        self.mutate(|items| {
            let before = items.len();
            items.retain(|item| item.id != id);
            removed = items.len() != before;
        });
        removed
    }

    pub fn clear_todos(&self) {
        self.replace(Vec::new());
    }

    fn replace(&self, next: Vec<TodoItem>) {
        self.mutate(|items| *items = next);
    }

    fn mutate<F>(&self, f: F)
    where
        F: FnOnce(&mut Vec<TodoItem>),
    {
        let snapshot = match self.items.write() {
            Ok(mut items) => {
                f(&mut items);
                items.clone()
            }
            Err(_) => {
                tracing::warn!("Todo store lock poisoned; mutation skipped");
                return;
            }
        };
        self.events.emit(UiEvent::TodosChanged { todos: snapshot });
    }
}
