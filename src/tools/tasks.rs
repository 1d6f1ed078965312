//! Task tracking and clarifying-question tools

use super::result::{parse_args, success, ToolResult};
use super::schema::{ParamSpec, ParamType};
use super::traits::{AgentTool, ToolCategory};
use crate::state::{NewQuestion, NewTodo, QuestionStore, TodoStore};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const TODO_STATUSES: &[&str] = &["pending", "in_progress", "completed"];

#[derive(Deserialize)]
struct TodoWriteArgs {
    todos: Vec<NewTodo>,
}

pub struct TodoWriteTool {
    store: Arc<TodoStore>,
}

impl TodoWriteTool {
    pub fn new(store: Arc<TodoStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AgentTool for TodoWriteTool {
    fn name(&self) -> &'static str {
        "todo_write"
    }

    fn description(&self) -> &'static str {
        "Replace the task list shown to the user. Always send the complete list; \
         items left out are removed. Reuse returned ids to update existing items."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Tasks
    }

    fn params(&self) -> Vec<ParamSpec> {
        let item = ParamType::Object(vec![
            ParamSpec::optional("id", "Existing item id", ParamType::String),
            ParamSpec::required("content", "Task description", ParamType::String),
            ParamSpec::optional("status", "Task status", ParamType::Enum(TODO_STATUSES))
                .with_default("pending"),
        ]);
        vec![ParamSpec::required(
            "todos",
            "The complete task list",
            ParamType::array_of(item, 1, 50),
        )]
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let TodoWriteArgs { todos } = parse_args(args)?;
        let items = self.store.set_todos(todos);
        let counts = self.store.counts();
        success(
            format!(
                "Task list updated: {} pending, {} in progress, {} completed",
                counts.pending, counts.in_progress, counts.completed
            ),
            json!({ "todos": items, "counts": counts }),
        )
    }
}

#[derive(Deserialize)]
struct AskQuestionArgs {
    questions: Vec<NewQuestion>,
}

pub struct AskQuestionTool {
    store: Arc<QuestionStore>,
}

impl AskQuestionTool {
    pub fn new(store: Arc<QuestionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AgentTool for AskQuestionTool {
    fn name(&self) -> &'static str {
        "ask_question"
    }

    fn description(&self) -> &'static str {
        "Ask the user 1-5 multiple-choice questions when requirements are unclear. \
         Returns immediately; the answers arrive in the user's next message."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Tasks
    }

    fn params(&self) -> Vec<ParamSpec> {
        let option = ParamType::Object(vec![
            ParamSpec::optional("id", "Option id", ParamType::String),
            ParamSpec::required("label", "Option text shown to the user", ParamType::String),
        ]);
        let question = ParamType::Object(vec![
            ParamSpec::optional("id", "Question id", ParamType::String),
            ParamSpec::required("question", "Question text", ParamType::String),
            ParamSpec::required("options", "2-5 choices", ParamType::array_of(option, 2, 5)),
            ParamSpec::optional(
                "allowCustom",
                "Let the user type their own answer",
                ParamType::Boolean,
            )
            .with_default(true),
        ]);
        vec![ParamSpec::required(
            "questions",
            "Questions to ask",
            ParamType::array_of(question, 1, 5),
        )]
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let AskQuestionArgs { questions } = parse_args(args)?;
        let count = questions.len();
        let set_id = self.store.set_questions(questions);
        success(
            format!(
                "Asked the user {} question(s). Stop here and wait; their answers will arrive in a later message.",
                count
            ),
            json!({
                "waitingForResponse": true,
                "questionSetId": set_id,
                "questionCount": count,
            }),
        )
    }
}
