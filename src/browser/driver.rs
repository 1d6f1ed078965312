//! Browser automation collaborator
//!
//! The automation engine itself lives outside this crate. [`BrowserDriver`]
//! is the seam; [`ChannelBrowserDriver`] forwards each call as a
//! [`BrowserCommand`] over a channel and waits for the engine's reply.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub url: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    pub text: String,
    pub href: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    #[default]
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    #[error("no page is open")]
    NoPage,
    #[error("element not found: {0}")]
    ElementNotFound(String),
    #[error("could not launch browser '{browser}': {message}")]
    LaunchFailed { browser: String, message: String },
    /// The engine's `{error, message}` failure shape
    #[error("{error}: {message}")]
    Engine { error: String, message: String },
    #[error("browser automation engine is not connected")]
    Disconnected,
    #[error("unexpected reply from browser engine: {0}")]
    BadReply(String),
}

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn open(&self, browser: &str) -> Result<(), DriverError>;
    async fn navigate(&self, url: &str) -> Result<PageInfo, DriverError>;
    /// `selector` is a CSS selector or visible text; resolution is the engine's job
    async fn click(&self, selector: &str) -> Result<(), DriverError>;
    async fn type_text(&self, selector: &str, text: &str) -> Result<(), DriverError>;
    async fn press_key(&self, key: &str) -> Result<(), DriverError>;
    async fn scroll(&self, direction: ScrollDirection, amount: u32) -> Result<(), DriverError>;
    async fn content(&self) -> Result<PageContent, DriverError>;
    async fn links(&self) -> Result<Vec<PageLink>, DriverError>;
    /// PNG bytes of the visible page
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError>;
    async fn close(&self) -> Result<(), DriverError>;
}

/// Command sent to the external engine
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BrowserAction {
    Open { browser: String },
    Navigate { url: String },
    Click { selector: String },
    Type { selector: String, text: String },
    Press { key: String },
    Scroll { direction: ScrollDirection, amount: u32 },
    GetContent,
    GetLinks,
    Screenshot,
    Close,
}

/// Reply payload on success, or the engine's error shape
pub type EngineReply = Result<serde_json::Value, DriverError>;

#[derive(Debug)]
pub struct BrowserCommand {
    pub action: BrowserAction,
    pub reply: oneshot::Sender<EngineReply>,
}

/// Convert an engine JSON reply (`{error, message}` on failure) into an [`EngineReply`]
pub fn parse_engine_reply(value: serde_json::Value) -> EngineReply {
    let Some(error) = value.get("error").filter(|e| !e.is_null() && *e != &json!(false)) else {
        return Ok(value);
    };
    let message = value
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or_default()
        .to_string();
    let code = error.as_str().unwrap_or("error").to_string();
    Err(match code.as_str() {
        "no_page" => DriverError::NoPage,
        "element_not_found" => DriverError::ElementNotFound(message),
        _ => DriverError::Engine {
            error: code,
            message,
        },
    })
}

/// Forwards driver calls to an engine task over an mpsc channel
#[derive(Clone)]
pub struct ChannelBrowserDriver {
    tx: mpsc::Sender<BrowserCommand>,
}

impl ChannelBrowserDriver {
    /// Driver plus the receiving end the engine drains
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BrowserCommand>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    async fn request(&self, action: BrowserAction) -> EngineReply {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(BrowserCommand { action, reply })
            .await
            .map_err(|_| DriverError::Disconnected)?;
        rx.await.map_err(|_| DriverError::Disconnected)?
    }

    async fn request_as<T: serde::de::DeserializeOwned>(
        &self,
        action: BrowserAction,
    ) -> Result<T, DriverError> {
        let value = self.request(action).await?;
        serde_json::from_value(value).map_err(|e| DriverError::BadReply(e.to_string()))
    }
}

#[async_trait]
impl BrowserDriver for ChannelBrowserDriver {
    async fn open(&self, browser: &str) -> Result<(), DriverError> {
        self.request(BrowserAction::Open {
            browser: browser.to_string(),
        })
        .await
        .map_err(|e| match e {
            DriverError::Engine { message, .. } => DriverError::LaunchFailed {
                browser: browser.to_string(),
                message,
            },
            other => other,
        })?;
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<PageInfo, DriverError> {
        self.request_as(BrowserAction::Navigate {
            url: url.to_string(),
        })
        .await
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        self.request(BrowserAction::Click {
            selector: selector.to_string(),
        })
        .await?;
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), DriverError> {
        self.request(BrowserAction::Type {
            selector: selector.to_string(),
            text: text.to_string(),
        })
        .await?;
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), DriverError> {
        self.request(BrowserAction::Press {
            key: key.to_string(),
        })
        .await?;
        Ok(())
    }

    async fn scroll(&self, direction: ScrollDirection, amount: u32) -> Result<(), DriverError> {
        self.request(BrowserAction::Scroll { direction, amount })
            .await?;
        Ok(())
    }

    async fn content(&self) -> Result<PageContent, DriverError> {
        self.request_as(BrowserAction::GetContent).await
    }

    async fn links(&self) -> Result<Vec<PageLink>, DriverError> {
        #[derive(Deserialize)]
        struct Links {
            links: Vec<PageLink>,
        }
        let reply: Links = self.request_as(BrowserAction::GetLinks).await?;
        Ok(reply.links)
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        let value = self.request(BrowserAction::Screenshot).await?;
        let data = value
            .get("data")
            .and_then(|d| d.as_str())
            .ok_or_else(|| DriverError::BadReply("screenshot reply has no data".to_string()))?;
        base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| DriverError::BadReply(e.to_string()))
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.request(BrowserAction::Close).await?;
        Ok(())
    }
}
