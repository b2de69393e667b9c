//! Chrome executable discovery.
//!
//! Resolution order:
//!
//! 1. Explicit override from [`PostOptions`](crate::PostOptions)
//! 2. `WEIBO_BROWSER_CHROME_PATH` environment variable
//! 3. `X_BROWSER_CHROME_PATH` environment variable
//! 4. Platform-specific install path candidates
//!
//! Pure lookup, no state. Edge and Chromium builds are accepted since
//! they all speak the same debugging protocol.

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Environment variables checked for an executable override, in priority order.
const ENV_OVERRIDES: [&str; 2] = ["WEIBO_BROWSER_CHROME_PATH", "X_BROWSER_CHROME_PATH"];

#[cfg(target_os = "macos")]
const CANDIDATES: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
    "/Applications/Google Chrome Beta.app/Contents/MacOS/Google Chrome Beta",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
];

#[cfg(target_os = "windows")]
const CANDIDATES: &[&str] = &[
    "C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe",
    "C:\\Program Files (x86)\\Google\\Chrome\\Application\\chrome.exe",
    "C:\\Program Files\\Microsoft\\Edge\\Application\\msedge.exe",
    "C:\\Program Files (x86)\\Microsoft\\Edge\\Application\\msedge.exe",
];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const CANDIDATES: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/usr/bin/microsoft-edge",
];

// ============================================================================
// Locator
// ============================================================================

/// Resolves an installed Chrome-family binary.
///
/// # Errors
///
/// Returns [`Error::ExecutableNotFound`] when no candidate exists on disk.
pub fn locate(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            debug!(path = %path.display(), "Using explicit Chrome executable");
            return Ok(path.to_path_buf());
        }
        return Err(Error::ExecutableNotFound);
    }

    for var in ENV_OVERRIDES {
        if let Ok(value) = env::var(var) {
            let trimmed = value.trim();
            if !trimmed.is_empty() && Path::new(trimmed).exists() {
                debug!(var, path = trimmed, "Using Chrome executable from environment");
                return Ok(PathBuf::from(trimmed));
            }
        }
    }

    for candidate in CANDIDATES {
        let path = Path::new(candidate);
        if path.exists() {
            debug!(path = candidate, "Found installed Chrome executable");
            return Ok(path.to_path_buf());
        }
    }

    Err(Error::ExecutableNotFound)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_list_is_nonempty() {
        assert!(!CANDIDATES.is_empty());
    }

    #[test]
    fn test_explicit_existing_path_wins() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        let resolved = locate(Some(file.path())).expect("locate");
        assert_eq!(resolved, file.path());
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let result = locate(Some(Path::new("/nonexistent/chrome-binary")));
        assert!(matches!(result, Err(Error::ExecutableNotFound)));
    }

    #[test]
    fn test_env_override_order() {
        assert_eq!(ENV_OVERRIDES[0], "WEIBO_BROWSER_CHROME_PATH");
        assert_eq!(ENV_OVERRIDES[1], "X_BROWSER_CHROME_PATH");
    }
}
