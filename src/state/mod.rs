//! Agent-side stores observed by the UI
//!
//! The todo list and the active question set are mutated by tool executors
//! and by the UI. Both are explicit shared objects handed to each side
//! (usually behind an `Arc`), publishing every change on [`UiEvents`].

pub mod events;
pub mod questions;
pub mod todos;

pub use events::{UiEvent, UiEvents};
pub use questions::{
    format_answers, Answer, AnswerMap, NewOption, NewQuestion, Question, QuestionError,
    QuestionOption, QuestionSet, QuestionStore,
};
pub use todos::{NewTodo, TodoCounts, TodoItem, TodoPatch, TodoStatus, TodoStore};
