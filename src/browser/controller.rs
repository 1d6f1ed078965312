//! Browser Session Controller
//!
//! Wraps one external automation session.
//!
//! States:
//! - Unconfigured: no preferred browser; every operation fails fast and
//!   raises the selection dialog signal
//! - NoSession: configured, nothing open; `navigate` opens a session
//! - Open: page operations run against the session; `close` returns to NoSession

use super::detect;
use super::driver::{BrowserDriver, DriverError, PageContent, PageLink, ScrollDirection};
use crate::config::settings::{Settings, SettingsError, SettingsStore};
use crate::state::events::{UiEvent, UiEvents};
use base64::Engine;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserOp {
    Navigate,
    Click,
    Type,
    Press,
    Scroll,
    GetContent,
    GetLinks,
    Screenshot,
    Close,
}

impl BrowserOp {
    pub fn tool_name(&self) -> &'static str {
        match self {
            BrowserOp::Navigate => "browser_navigate",
            BrowserOp::Click => "browser_click",
            BrowserOp::Type => "browser_type",
            BrowserOp::Press => "browser_press",
            BrowserOp::Scroll => "browser_scroll",
            BrowserOp::GetContent => "browser_get_content",
            BrowserOp::GetLinks => "browser_get_links",
            BrowserOp::Screenshot => "browser_screenshot",
            BrowserOp::Close => "browser_close",
        }
    }

    /// Remediation hint when the operation needs a page and none is open
    pub fn no_page_suggestion(&self) -> &'static str {
        match self {
            BrowserOp::Navigate => "Retry browser_navigate with a reachable URL",
            BrowserOp::Click => "Use browser_navigate to open a page before clicking",
            BrowserOp::Type => "Use browser_navigate to open a page with a form before typing",
            BrowserOp::Press => "Use browser_navigate to open a page before pressing keys",
            BrowserOp::Scroll => "Use browser_navigate to open a page before scrolling",
            BrowserOp::GetContent => "Use browser_navigate to load a page, then read its content",
            BrowserOp::GetLinks => "Use browser_navigate to load a page, then list its links",
            BrowserOp::Screenshot => "Use browser_navigate to open a page to capture",
            BrowserOp::Close => "No browser session is open, nothing to close",
        }
    }

    /// Remediation hint when the target selector matched nothing
    pub fn not_found_suggestion(&self) -> &'static str {
        match self {
            BrowserOp::Click => {
                "Check the selector or visible text with browser_get_content or browser_screenshot"
            }
            BrowserOp::Type => {
                "Find the input field first; try a CSS selector like input[name=\"q\"] or its placeholder text"
            }
            _ => "Take a browser_screenshot to see the current page",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("no browser configured")]
    NeedsSetup { operation: BrowserOp },
    #[error("unknown browser '{0}'")]
    UnknownBrowser(String),
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("no page is open")]
    NoPage { operation: BrowserOp },
    #[error("element not found: {selector}")]
    ElementNotFound {
        operation: BrowserOp,
        selector: String,
    },
    #[error("browser {} failed: {source}", .operation.tool_name())]
    Driver {
        operation: BrowserOp,
        #[source]
        source: DriverError,
    },
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    Open { browser: String, url: Option<String> },
}

/// Snapshot of the controller for the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BrowserStatus {
    Unconfigured,
    NoSession { browser: String },
    Open { browser: String, url: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Screenshot {
    pub base64: String,
    pub mime_type: &'static str,
    pub data_url: String,
}

impl Screenshot {
    pub fn from_png(bytes: &[u8]) -> Self {
        let base64 = base64::engine::general_purpose::STANDARD.encode(bytes);
        let data_url = format!("data:image/png;base64,{}", base64);
        Self {
            base64,
            mime_type: "image/png",
            data_url,
        }
    }
}

/// Result of a mutating action
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActionOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Missing only when the capture after a successful action failed
    pub screenshot: Option<Screenshot>,
}

pub struct BrowserController {
    settings: Arc<dyn SettingsStore>,
    driver: Arc<dyn BrowserDriver>,
    session: Mutex<SessionState>,
    events: UiEvents,
    setup_requested: AtomicBool,
}

/// Prefix `https://` when the caller gave a bare host
pub fn normalize_url(raw: &str) -> Result<String, BrowserError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(BrowserError::InvalidUrl {
            url: raw.to_string(),
            reason: "URL is empty".to_string(),
        });
    }
    let candidate = if trimmed.contains("://")
        || trimmed.starts_with("about:")
        || trimmed.starts_with("data:")
    {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    url::Url::parse(&candidate)
        .map(|u| u.to_string())
        .map_err(|e| BrowserError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })
}

impl BrowserController {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        driver: Arc<dyn BrowserDriver>,
        events: UiEvents,
    ) -> Self {
        Self {
            settings,
            driver,
            session: Mutex::new(SessionState::NoSession),
            events,
            setup_requested: AtomicBool::new(false),
        }
    }

    pub fn preferred_browser(&self) -> Option<String> {
        self.settings.get().preferred_browser
    }

    pub async fn status(&self) -> BrowserStatus {
        let Some(browser) = self.preferred_browser() else {
            return BrowserStatus::Unconfigured;
        };
        match &*self.session.lock().await {
            SessionState::NoSession => BrowserStatus::NoSession { browser },
            SessionState::Open { browser, url } => BrowserStatus::Open {
                browser: browser.clone(),
                url: url.clone(),
            },
        }
    }

    /// Record the user's choice from the selection dialog
    pub fn select_browser(&self, id: &str) -> Result<String, BrowserError> {
        let known =
            detect::known_browser(id).ok_or_else(|| BrowserError::UnknownBrowser(id.to_string()))?;
        let browser = known.id.to_string();
        let chosen = browser.clone();
        self.settings
            .update(&mut |s: &mut Settings| s.preferred_browser = Some(chosen.clone()))?;
        self.setup_requested.store(false, Ordering::SeqCst);
        tracing::info!("Preferred browser set to {}", browser);
        self.events.emit(UiEvent::BrowserConfigured {
            browser: browser.clone(),
        });
        Ok(browser)
    }

    /// Consume the pending "show selection dialog" flag
    pub fn take_setup_request(&self) -> bool {
        self.setup_requested.swap(false, Ordering::SeqCst)
    }

    pub fn setup_requested(&self) -> bool {
        self.setup_requested.load(Ordering::SeqCst)
    }

    fn require_browser(&self, operation: BrowserOp) -> Result<String, BrowserError> {
        match self.preferred_browser() {
            Some(browser) => Ok(browser),
            None => {
                tracing::info!("{} called with no browser configured", operation.tool_name());
                self.setup_requested.store(true, Ordering::SeqCst);
                self.events.emit(UiEvent::BrowserSetupRequested {
                    tool: operation.tool_name().to_string(),
                });
                Err(BrowserError::NeedsSetup { operation })
            }
        }
    }

    fn map_driver(
        session: &mut SessionState,
        operation: BrowserOp,
        selector: Option<&str>,
        err: DriverError,
    ) -> BrowserError {
        match err {
            DriverError::NoPage => {
                *session = SessionState::NoSession;
                BrowserError::NoPage { operation }
            }
            DriverError::ElementNotFound(detail) => BrowserError::ElementNotFound {
                operation,
                selector: selector.map(str::to_string).unwrap_or(detail),
            },
            source => BrowserError::Driver { operation, source },
        }
    }

    async fn capture(&self) -> Option<Screenshot> {
        match self.driver.screenshot().await {
            Ok(png) => Some(Screenshot::from_png(&png)),
            Err(e) => {
                tracing::warn!("Screenshot after browser action failed: {}", e);
                None
            }
        }
    }

    /// Gate, then confirm a session is open
    async fn open_session(
        &self,
        operation: BrowserOp,
    ) -> Result<tokio::sync::MutexGuard<'_, SessionState>, BrowserError> {
        self.require_browser(operation)?;
        let session = self.session.lock().await;
        if *session == SessionState::NoSession {
            return Err(BrowserError::NoPage { operation });
        }
        Ok(session)
    }

    /// Open or reuse a session and load `url`
    pub async fn navigate(&self, url: &str) -> Result<ActionOutcome, BrowserError> {
        let op = BrowserOp::Navigate;
        let browser = self.require_browser(op)?;
        let target = normalize_url(url)?;
        let mut session = self.session.lock().await;

        let reuse = matches!(&*session, SessionState::Open { browser: b, .. } if *b == browser);
        if !reuse {
            if let SessionState::Open { browser: old, .. } = &*session {
                tracing::debug!("Preferred browser changed from {}, reopening", old);
                if let Err(e) = self.driver.close().await {
                    tracing::warn!("Failed to close previous browser session: {}", e);
                }
                *session = SessionState::NoSession;
            }
            self.driver
                .open(&browser)
                .await
                .map_err(|source| BrowserError::Driver { operation: op, source })?;
            *session = SessionState::Open {
                browser: browser.clone(),
                url: None,
            };
            tracing::info!("Opened {} session", browser);
        }

        let page = match self.driver.navigate(&target).await {
            Ok(page) => page,
            Err(e) => return Err(Self::map_driver(&mut session, op, None, e)),
        };
        *session = SessionState::Open {
            browser,
            url: Some(page.url.clone()),
        };
        drop(session);

        Ok(ActionOutcome {
            url: Some(page.url),
            title: Some(page.title),
            screenshot: self.capture().await,
        })
    }

    pub async fn click(&self, selector: &str) -> Result<ActionOutcome, BrowserError> {
        let op = BrowserOp::Click;
        let mut session = self.open_session(op).await?;
        if let Err(e) = self.driver.click(selector).await {
            return Err(Self::map_driver(&mut session, op, Some(selector), e));
        }
        drop(session);
        Ok(ActionOutcome {
            screenshot: self.capture().await,
            ..Default::default()
        })
    }

    pub async fn type_text(&self, selector: &str, text: &str) -> Result<ActionOutcome, BrowserError> {
        let op = BrowserOp::Type;
        let mut session = self.open_session(op).await?;
        if let Err(e) = self.driver.type_text(selector, text).await {
            return Err(Self::map_driver(&mut session, op, Some(selector), e));
        }
        drop(session);
        Ok(ActionOutcome {
            screenshot: self.capture().await,
            ..Default::default()
        })
    }

    pub async fn press_key(&self, key: &str) -> Result<ActionOutcome, BrowserError> {
        let op = BrowserOp::Press;
        let mut session = self.open_session(op).await?;
        if let Err(e) = self.driver.press_key(key).await {
            return Err(Self::map_driver(&mut session, op, None, e));
        }
        drop(session);
        Ok(ActionOutcome {
            screenshot: self.capture().await,
            ..Default::default()
        })
    }

    pub async fn scroll(
        &self,
        direction: ScrollDirection,
        amount: u32,
    ) -> Result<ActionOutcome, BrowserError> {
        let op = BrowserOp::Scroll;
        let mut session = self.open_session(op).await?;
        if let Err(e) = self.driver.scroll(direction, amount).await {
            return Err(Self::map_driver(&mut session, op, None, e));
        }
        drop(session);
        Ok(ActionOutcome {
            screenshot: self.capture().await,
            ..Default::default()
        })
    }

    pub async fn content(&self) -> Result<PageContent, BrowserError> {
        let op = BrowserOp::GetContent;
        let mut session = self.open_session(op).await?;
        self.driver
            .content()
            .await
            .map_err(|e| Self::map_driver(&mut session, op, None, e))
    }

    pub async fn links(&self) -> Result<Vec<PageLink>, BrowserError> {
        let op = BrowserOp::GetLinks;
        let mut session = self.open_session(op).await?;
        self.driver
            .links()
            .await
            .map_err(|e| Self::map_driver(&mut session, op, None, e))
    }

    pub async fn screenshot(&self) -> Result<Screenshot, BrowserError> {
        let op = BrowserOp::Screenshot;
        let mut session = self.open_session(op).await?;
        self.driver
            .screenshot()
            .await
            .map(|png| Screenshot::from_png(&png))
            .map_err(|e| Self::map_driver(&mut session, op, None, e))
    }

    /// Tear down the session; `Ok(false)` when none was open
    pub async fn close(&self) -> Result<bool, BrowserError> {
        let op = BrowserOp::Close;
        self.require_browser(op)?;
        let mut session = self.session.lock().await;
        if *session == SessionState::NoSession {
            return Ok(false);
        }
        let result = self.driver.close().await;
        *session = SessionState::NoSession;
        match result {
            Ok(()) | Err(DriverError::NoPage) => {
                tracing::info!("Browser session closed");
                Ok(true)
            }
            Err(source) => Err(BrowserError::Driver { operation: op, source }),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::browser::driver::PageInfo;
    use crate::config::settings::MemorySettingsStore;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    /// Scripted driver recording each call
    #[derive(Default)]
    pub(crate) struct FakeDriver {
        pub calls: StdMutex<Vec<String>>,
        pub page_lost: AtomicBool,
    }

    impl FakeDriver {
        fn record(&self, call: impl Into<String>) -> Result<(), DriverError> {
            self.calls.lock().unwrap().push(call.into());
            if self.page_lost.load(Ordering::SeqCst) {
                return Err(DriverError::NoPage);
            }
            Ok(())
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BrowserDriver for FakeDriver {
        async fn open(&self, browser: &str) -> Result<(), DriverError> {
            self.calls.lock().unwrap().push(format!("open:{}", browser));
            Ok(())
        }
        async fn navigate(&self, url: &str) -> Result<PageInfo, DriverError> {
            self.record(format!("navigate:{}", url))?;
            Ok(PageInfo {
                url: url.to_string(),
                title: "Example Domain".to_string(),
            })
        }
        async fn click(&self, selector: &str) -> Result<(), DriverError> {
            self.record(format!("click:{}", selector))?;
            if selector == "#missing" {
                return Err(DriverError::ElementNotFound(selector.to_string()));
            }
            Ok(())
        }
        async fn type_text(&self, selector: &str, text: &str) -> Result<(), DriverError> {
            self.record(format!("type:{}:{}", selector, text))
        }
        async fn press_key(&self, key: &str) -> Result<(), DriverError> {
            self.record(format!("press:{}", key))
        }
        async fn scroll(&self, direction: ScrollDirection, amount: u32) -> Result<(), DriverError> {
            self.record(format!("scroll:{:?}:{}", direction, amount))
        }
        async fn content(&self) -> Result<PageContent, DriverError> {
            self.record("content")?;
            Ok(PageContent {
                url: "https://example.com/".to_string(),
                title: "Example Domain".to_string(),
                text: "This domain is for use in examples.".to_string(),
            })
        }
        async fn links(&self) -> Result<Vec<PageLink>, DriverError> {
            self.record("links")?;
            Ok(vec![PageLink {
                text: "More information".to_string(),
                href: "https://www.iana.org/domains/example".to_string(),
            }])
        }
        async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
            self.record("screenshot")?;
            Ok(vec![0x89, b'P', b'N', b'G'])
        }
        async fn close(&self) -> Result<(), DriverError> {
            self.record("close")
        }
    }

    pub(crate) fn controller(browser: Option<&str>) -> (BrowserController, Arc<FakeDriver>, UiEvents) {
        let settings = Arc::new(MemorySettingsStore::new(Settings {
            preferred_browser: browser.map(str::to_string),
        }));
        let driver = Arc::new(FakeDriver::default());
        let events = UiEvents::default();
        let controller = BrowserController::new(settings, driver.clone(), events.clone());
        (controller, driver, events)
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("example.com").unwrap(), "https://example.com/");
        assert_eq!(
            normalize_url("http://localhost:3000/a").unwrap(),
            "http://localhost:3000/a"
        );
        assert!(normalize_url("   ").is_err());
    }

    #[tokio::test]
    async fn test_unconfigured_requests_setup_once_per_call() {
        let (controller, driver, events) = controller(None);
        let mut rx = events.subscribe();

        let err = controller.navigate("example.com").await.unwrap_err();
        assert!(matches!(err, BrowserError::NeedsSetup { operation: BrowserOp::Navigate }));
        assert!(matches!(
            rx.try_recv().unwrap(),
            UiEvent::BrowserSetupRequested { tool } if tool == "browser_navigate"
        ));
        assert!(rx.try_recv().is_err());
        assert!(driver.calls().is_empty());

        assert!(controller.take_setup_request());
        assert!(!controller.take_setup_request());
        assert_eq!(controller.status().await, BrowserStatus::Unconfigured);
    }

    #[tokio::test]
    async fn test_select_browser() {
        let (controller, _driver, events) = controller(None);
        let mut rx = events.subscribe();
        let _ = controller.click("a").await;
        assert!(controller.setup_requested());

        assert_eq!(controller.select_browser("Chrome").unwrap(), "chrome");
        assert!(!controller.setup_requested());
        let _ = rx.try_recv();
        assert!(matches!(
            rx.try_recv().unwrap(),
            UiEvent::BrowserConfigured { browser } if browser == "chrome"
        ));
        assert!(matches!(
            controller.select_browser("mosaic"),
            Err(BrowserError::UnknownBrowser(_))
        ));
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let (controller, driver, _) = controller(Some("firefox"));

        let err = controller.click("a").await.unwrap_err();
        assert!(matches!(err, BrowserError::NoPage { operation: BrowserOp::Click }));

        let outcome = controller.navigate("example.com").await.unwrap();
        assert_eq!(outcome.title.as_deref(), Some("Example Domain"));
        assert!(outcome
            .screenshot
            .unwrap()
            .data_url
            .starts_with("data:image/png;base64,"));

        controller.navigate("example.org").await.unwrap();
        let opens = driver.calls().iter().filter(|c| c.starts_with("open:")).count();
        assert_eq!(opens, 1);

        let outcome = controller.scroll(ScrollDirection::Down, 500).await.unwrap();
        assert!(outcome.screenshot.is_some());
        assert_eq!(controller.links().await.unwrap().len(), 1);

        assert!(controller.close().await.unwrap());
        assert_eq!(
            controller.status().await,
            BrowserStatus::NoSession {
                browser: "firefox".to_string()
            }
        );
        assert!(!controller.close().await.unwrap());
    }

    #[tokio::test]
    async fn test_element_not_found() {
        let (controller, _driver, _) = controller(Some("chrome"));
        controller.navigate("https://example.com").await.unwrap();
        match controller.click("#missing").await {
            Err(BrowserError::ElementNotFound { operation, selector }) => {
                assert_eq!(operation, BrowserOp::Click);
                assert_eq!(selector, "#missing");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lost_page_resets_session() {
        let (controller, driver, _) = controller(Some("chrome"));
        controller.navigate("https://example.com").await.unwrap();
        driver.page_lost.store(true, Ordering::SeqCst);

        assert!(matches!(
            controller.content().await,
            Err(BrowserError::NoPage { operation: BrowserOp::GetContent })
        ));
        assert!(matches!(controller.status().await, BrowserStatus::NoSession { .. }));
    }

    #[test]
    fn test_suggestions_are_distinct() {
        let ops = [
            BrowserOp::Click,
            BrowserOp::Type,
            BrowserOp::Press,
            BrowserOp::Scroll,
            BrowserOp::GetContent,
            BrowserOp::GetLinks,
            BrowserOp::Screenshot,
        ];
        let mut hints: Vec<_> = ops.iter().map(|op| op.no_page_suggestion()).collect();
        hints.sort_unstable();
        hints.dedup();
        assert_eq!(hints.len(), ops.len());
    }
}
