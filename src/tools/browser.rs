//! Browser tools
//!
//! One tool per controller operation. Mutating actions return a fresh
//! screenshot so the agent can see what happened.

use super::result::{parse_args, success, Failure, ToolResult};
use super::schema::{ParamSpec, ParamType};
use super::traits::{AgentTool, ToolCategory};
use crate::browser::{ActionOutcome, BrowserController, BrowserError, BrowserOp, DriverError, ScrollDirection};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub const BROWSER_OPS: [BrowserOp; 9] = [
    BrowserOp::Navigate,
    BrowserOp::Click,
    BrowserOp::Type,
    BrowserOp::Press,
    BrowserOp::Scroll,
    BrowserOp::GetContent,
    BrowserOp::GetLinks,
    BrowserOp::Screenshot,
    BrowserOp::Close,
];

impl From<BrowserError> for Failure {
    fn from(err: BrowserError) -> Self {
        let message = err.to_string();
        match err {
            BrowserError::NeedsSetup { .. } => Failure::new(
                "No browser is configured yet. The user has been asked to choose one.",
            )
            .with_suggestion("Wait for the user to pick a browser, then retry")
            .needs_browser_setup()
            .retryable(true),
            BrowserError::UnknownBrowser(_) => Failure::new(message)
                .with_suggestion("Choose one of chrome, chromium, firefox, edge, brave or safari"),
            BrowserError::InvalidUrl { .. } => {
                Failure::new(message).with_suggestion("Pass a full URL such as https://example.com")
            }
            BrowserError::NoPage { operation } => Failure::new("No page is open in the browser")
                .with_suggestion(operation.no_page_suggestion())
                .retryable(true),
            BrowserError::ElementNotFound { operation, .. } => Failure::new(message)
                .with_suggestion(operation.not_found_suggestion())
                .retryable(true),
            BrowserError::Driver { operation, source } => {
                let suggestion = match source {
                    DriverError::LaunchFailed { .. } => {
                        "Make sure the selected browser is installed, or ask the user to choose another".to_string()
                    }
                    DriverError::Disconnected => {
                        "The browser automation engine is not running; ask the user to restart the app"
                            .to_string()
                    }
                    _ => format!("Retry {} or take a browser_screenshot to check the page", operation.tool_name()),
                };
                Failure::new(message).with_suggestion(suggestion)
            }
            BrowserError::Settings(_) => Failure::new(message)
                .with_suggestion("Check that the settings file is writable"),
        }
    }
}

fn outcome_payload(outcome: ActionOutcome) -> Value {
    serde_json::to_value(outcome).unwrap_or_else(|_| json!({}))
}

#[derive(Deserialize)]
struct NavigateArgs {
    url: String,
}

#[derive(Deserialize)]
struct SelectorArgs {
    selector: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct PressArgs {
    key: String,
}

#[derive(Deserialize)]
struct ScrollArgs {
    direction: ScrollDirection,
    amount: u32,
}

/// A browser tool bound to one controller operation
pub struct BrowserTool {
    op: BrowserOp,
    controller: Arc<BrowserController>,
}

impl BrowserTool {
    pub fn new(op: BrowserOp, controller: Arc<BrowserController>) -> Self {
        Self { op, controller }
    }

    /// All nine browser tools sharing one controller
    pub fn all(controller: &Arc<BrowserController>) -> Vec<BrowserTool> {
        BROWSER_OPS
            .iter()
            .map(|op| BrowserTool::new(*op, controller.clone()))
            .collect()
    }
}

#[async_trait]
impl AgentTool for BrowserTool {
    fn name(&self) -> &'static str {
        self.op.tool_name()
    }

    fn description(&self) -> &'static str {
        match self.op {
            BrowserOp::Navigate => {
                "Open a URL in the user's browser (https:// is added when missing). Returns the title and a screenshot."
            }
            BrowserOp::Click => {
                "Click an element by CSS selector or visible text. Returns a screenshot afterwards."
            }
            BrowserOp::Type => "Type text into an input found by CSS selector or placeholder/label text.",
            BrowserOp::Press => "Press a keyboard key such as Enter, Tab or Escape.",
            BrowserOp::Scroll => "Scroll the page up or down by a number of pixels.",
            BrowserOp::GetContent => "Read the visible text content of the current page.",
            BrowserOp::GetLinks => "List the links on the current page.",
            BrowserOp::Screenshot => "Capture a screenshot of the current page.",
            BrowserOp::Close => "Close the browser session.",
        }
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Browser
    }

    fn is_side_effect(&self) -> bool {
        matches!(
            self.op,
            BrowserOp::Navigate
                | BrowserOp::Click
                | BrowserOp::Type
                | BrowserOp::Press
                | BrowserOp::Scroll
                | BrowserOp::Close
        )
    }

    fn params(&self) -> Vec<ParamSpec> {
        match self.op {
            BrowserOp::Navigate => vec![ParamSpec::required("url", "URL to open", ParamType::String)],
            BrowserOp::Click => vec![ParamSpec::required(
                "selector",
                "CSS selector or visible text",
                ParamType::String,
            )],
            BrowserOp::Type => vec![
                ParamSpec::required("selector", "CSS selector or field text", ParamType::String),
                ParamSpec::required("text", "Text to type", ParamType::String),
            ],
            BrowserOp::Press => vec![ParamSpec::required("key", "Key name, e.g. Enter", ParamType::String)],
            BrowserOp::Scroll => vec![
                ParamSpec::optional("direction", "Scroll direction", ParamType::Enum(&["up", "down"]))
                    .with_default("down"),
                ParamSpec::optional(
                    "amount",
                    "Distance in pixels",
                    ParamType::integer_between(1, 100_000),
                )
                .with_default(500),
            ],
            BrowserOp::GetContent | BrowserOp::GetLinks | BrowserOp::Screenshot | BrowserOp::Close => {
                Vec::new()
            }
        }
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let controller = &self.controller;
        match self.op {
            BrowserOp::Navigate => {
                let NavigateArgs { url } = parse_args(args)?;
                let outcome = controller.navigate(&url).await?;
                let target = outcome.url.clone().unwrap_or(url);
                success(format!("Navigated to {}", target), outcome_payload(outcome))
            }
            BrowserOp::Click => {
                let SelectorArgs { selector, .. } = parse_args(args)?;
                let outcome = controller.click(&selector).await?;
                success(format!("Clicked '{}'", selector), outcome_payload(outcome))
            }
            BrowserOp::Type => {
                let SelectorArgs { selector, text } = parse_args(args)?;
                let outcome = controller.type_text(&selector, &text).await?;
                success(
                    format!("Typed {} characters into '{}'", text.chars().count(), selector),
                    outcome_payload(outcome),
                )
            }
            BrowserOp::Press => {
                let PressArgs { key } = parse_args(args)?;
                let outcome = controller.press_key(&key).await?;
                success(format!("Pressed {}", key), outcome_payload(outcome))
            }
            BrowserOp::Scroll => {
                let ScrollArgs { direction, amount } = parse_args(args)?;
                let outcome = controller.scroll(direction, amount).await?;
                let dir = match direction {
                    ScrollDirection::Up => "up",
                    ScrollDirection::Down => "down",
                };
                success(format!("Scrolled {} by {}px", dir, amount), outcome_payload(outcome))
            }
            BrowserOp::GetContent => {
                let page = controller.content().await?;
                success(
                    format!("Read {} characters from '{}'", page.text.chars().count(), page.title),
                    json!({ "url": page.url, "title": page.title, "content": page.text }),
                )
            }
            BrowserOp::GetLinks => {
                let links = controller.links().await?;
                success(
                    format!("Found {} links", links.len()),
                    json!({ "count": links.len(), "links": links }),
                )
            }
            BrowserOp::Screenshot => {
                let screenshot = controller.screenshot().await?;
                success("Captured screenshot", json!({ "screenshot": screenshot }))
            }
            BrowserOp::Close => {
                let closed = controller.close().await?;
                let message = if closed {
                    "Browser session closed"
                } else {
                    "No browser session was open"
                };
                success(message, json!({ "closed": closed }))
            }
        }
    }
}
