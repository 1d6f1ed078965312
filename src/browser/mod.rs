//! Browser session control
//!
//! The controller owns the configured/session state machine; the driver is
//! the seam to the external automation engine.

pub mod controller;
pub mod detect;
pub mod driver;

pub use controller::{
    normalize_url, ActionOutcome, BrowserController, BrowserError, BrowserOp, BrowserStatus,
    Screenshot, SessionState,
};
pub use detect::{available_browsers, known_browser, InstalledBrowser, KNOWN_BROWSERS};
pub use driver::{
    BrowserAction, BrowserCommand, BrowserDriver, ChannelBrowserDriver, DriverError, PageContent,
    PageInfo, PageLink, ScrollDirection,
};
