//! Debug endpoint readiness polling.
//!
//! A spawned Chrome process is not immediately controllable: the
//! DevTools HTTP endpoint comes up some time after the process itself.
//! This module polls `http://127.0.0.1:{port}/json/version` until the
//! response carries a usable `webSocketDebuggerUrl`, decoupling
//! "process started" from "protocol ready".

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use tokio::time::{Instant, sleep};
use tracing::{debug, trace};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Interval between readiness probes.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

// ============================================================================
// VersionInfo
// ============================================================================

/// Subset of the `/json/version` resource we care about.
#[derive(Debug, Deserialize)]
struct VersionInfo {
    #[serde(rename = "webSocketDebuggerUrl", default)]
    web_socket_debugger_url: Option<String>,
}

impl VersionInfo {
    /// Returns the debugger URL if present and non-empty.
    fn debugger_url(self) -> Option<String> {
        self.web_socket_debugger_url.filter(|url| !url.is_empty())
    }
}

// ============================================================================
// Poller
// ============================================================================

/// Waits until the local debug endpoint reports its WebSocket debugger URL.
///
/// # Errors
///
/// Returns [`Error::DebugPortTimeout`] carrying the last observed error
/// once `budget` is exhausted.
pub async fn wait_for_debugger(port: u16, budget: Duration) -> Result<String> {
    let url = version_url(port);
    let deadline = Instant::now() + budget;
    let mut last_error = String::from("no response received");

    debug!(%url, budget_ms = budget.as_millis() as u64, "Waiting for Chrome debug endpoint");

    while Instant::now() < deadline {
        match probe(&url).await {
            Ok(Some(ws_url)) => {
                debug!(ws_url, "Debug endpoint ready");
                return Ok(ws_url);
            }
            Ok(None) => {
                last_error = String::from("missing webSocketDebuggerUrl");
            }
            Err(e) => {
                trace!(error = %e, "Debug endpoint probe failed");
                last_error = e;
            }
        }

        sleep(POLL_INTERVAL).await;
    }

    Err(Error::debug_port_timeout(
        budget.as_millis() as u64,
        last_error,
    ))
}

/// One GET against the version resource.
async fn probe(url: &str) -> std::result::Result<Option<String>, String> {
    let response = reqwest::get(url).await.map_err(|e| e.to_string())?;

    if !response.status().is_success() {
        return Err(format!("request failed: {}", response.status()));
    }

    let info: VersionInfo = response.json().await.map_err(|e| e.to_string())?;
    Ok(info.debugger_url())
}

/// Builds the version-resource URL for a debug port.
fn version_url(port: u16) -> String {
    format!("http://127.0.0.1:{port}/json/version")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_url() {
        assert_eq!(version_url(9222), "http://127.0.0.1:9222/json/version");
    }

    #[test]
    fn test_version_info_with_url() {
        let info: VersionInfo = serde_json::from_str(
            r#"{"Browser": "Chrome/120.0", "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/browser/abc"}"#,
        )
        .expect("parse");

        assert_eq!(
            info.debugger_url().as_deref(),
            Some("ws://127.0.0.1:9222/devtools/browser/abc")
        );
    }

    #[test]
    fn test_version_info_missing_url() {
        let info: VersionInfo =
            serde_json::from_str(r#"{"Browser": "Chrome/120.0"}"#).expect("parse");
        assert!(info.debugger_url().is_none());
    }

    #[test]
    fn test_version_info_empty_url_is_not_ready() {
        let info: VersionInfo =
            serde_json::from_str(r#"{"webSocketDebuggerUrl": ""}"#).expect("parse");
        assert!(info.debugger_url().is_none());
    }

    #[tokio::test]
    async fn test_wait_times_out_with_last_error() {
        // Nothing listens on this port; every probe records its failure.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("addr").port()
        };

        let result = wait_for_debugger(port, Duration::from_millis(350)).await;
        match result {
            Err(Error::DebugPortTimeout {
                timeout_ms,
                last_error,
            }) => {
                assert_eq!(timeout_ms, 350);
                assert!(!last_error.is_empty());
            }
            other => panic!("expected DebugPortTimeout, got {other:?}"),
        }
    }
}
