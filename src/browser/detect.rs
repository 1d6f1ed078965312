//! Installed browser detection for the selection dialog

use serde::Serialize;
use std::path::PathBuf;

/// Browser the automation engine can drive
#[derive(Debug, Clone, Copy)]
pub struct KnownBrowser {
    pub id: &'static str,
    pub name: &'static str,
    /// Executable names probed on PATH, in order
    pub binaries: &'static [&'static str],
    /// Absolute install locations probed when PATH has none
    pub install_paths: &'static [&'static str],
}

pub const KNOWN_BROWSERS: &[KnownBrowser] = &[
    KnownBrowser {
        id: "chrome",
        name: "Google Chrome",
        binaries: &["google-chrome", "google-chrome-stable", "chrome"],
        install_paths: &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe",
        ],
    },
    KnownBrowser {
        id: "chromium",
        name: "Chromium",
        binaries: &["chromium", "chromium-browser"],
        install_paths: &["/Applications/Chromium.app/Contents/MacOS/Chromium"],
    },
    KnownBrowser {
        id: "firefox",
        name: "Firefox",
        binaries: &["firefox"],
        install_paths: &[
            "/Applications/Firefox.app/Contents/MacOS/firefox",
            "C:\\Program Files\\Mozilla Firefox\\firefox.exe",
        ],
    },
    KnownBrowser {
        id: "edge",
        name: "Microsoft Edge",
        binaries: &["microsoft-edge", "microsoft-edge-stable", "msedge"],
        install_paths: &[
            "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
            "C:\\Program Files (x86)\\Microsoft\\Edge\\Application\\msedge.exe",
        ],
    },
    KnownBrowser {
        id: "brave",
        name: "Brave",
        binaries: &["brave-browser", "brave"],
        install_paths: &["/Applications/Brave Browser.app/Contents/MacOS/Brave Browser"],
    },
    KnownBrowser {
        id: "safari",
        name: "Safari",
        binaries: &[],
        install_paths: &["/Applications/Safari.app/Contents/MacOS/Safari"],
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledBrowser {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
}

pub fn known_browser(id: &str) -> Option<&'static KnownBrowser> {
    KNOWN_BROWSERS.iter().find(|b| b.id.eq_ignore_ascii_case(id))
}

impl KnownBrowser {
    /// First matching executable on PATH, then fixed install locations
    pub fn locate(&self) -> Option<PathBuf> {
        self.binaries
            .iter()
            .find_map(|bin| which::which(bin).ok())
            .or_else(|| {
                self.install_paths
                    .iter()
                    .map(PathBuf::from)
                    .find(|p| p.exists())
            })
    }
}

/// Known browsers present on this machine
pub fn available_browsers() -> Vec<InstalledBrowser> {
    let found: Vec<InstalledBrowser> = KNOWN_BROWSERS
        .iter()
        .filter_map(|b| {
            b.locate().map(|path| InstalledBrowser {
                id: b.id.to_string(),
                name: b.name.to_string(),
                path,
            })
        })
        .collect();
    tracing::debug!("Detected {} installed browsers", found.len());
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_browser_lookup() {
        assert_eq!(known_browser("Firefox").map(|b| b.id), Some("firefox"));
        assert!(known_browser("netscape").is_none());
    }

    #[test]
    fn test_ids_unique() {
        let mut ids: Vec<_> = KNOWN_BROWSERS.iter().map(|b| b.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), KNOWN_BROWSERS.len());
    }

    #[test]
    fn test_available_browsers_are_known() {
        for browser in available_browsers() {
            assert!(known_browser(&browser.id).is_some());
            assert!(browser.path.is_absolute());
        }
    }
}
