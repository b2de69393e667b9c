//! Error types for weibo-autopost.
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`].
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Launch | [`Error::ExecutableNotFound`], [`Error::PortAllocationFailed`], [`Error::DebugPortTimeout`] |
//! | Connection | [`Error::ConnectionFailed`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::CallTimeout`], [`Error::Protocol`] |
//! | Page | [`Error::EditorNotFound`], [`Error::TextInjectionFailed`], [`Error::SubmitButtonNotFound`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Launch Errors
    // ========================================================================
    /// No Chrome executable could be resolved.
    ///
    /// Returned when the override, environment variables, and platform
    /// candidate list all fail to produce an existing binary.
    #[error(
        "Chrome not found. Set WEIBO_BROWSER_CHROME_PATH or pass an explicit executable path."
    )]
    ExecutableNotFound,

    /// Failed to allocate a free local TCP port for the debug endpoint.
    #[error("Port allocation failed: {message}")]
    PortAllocationFailed {
        /// Description of the allocation failure.
        message: String,
    },

    /// Failed to spawn the browser process.
    #[error("Failed to launch Chrome: {message}")]
    ProcessLaunchFailed {
        /// Description of the launch failure.
        message: String,
    },

    /// The debug endpoint never reported a usable WebSocket debugger URL.
    ///
    /// Carries the last error observed while polling, for diagnosis.
    #[error("Chrome debug port not ready after {timeout_ms}ms: {last_error}")]
    DebugPortTimeout {
        /// Milliseconds waited before giving up.
        timeout_ms: u64,
        /// Last error observed during polling.
        last_error: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection to the debugger could not be established.
    #[error("CDP connection failed: {message}")]
    ConnectionFailed {
        /// Description of the connection error.
        message: String,
    },

    /// WebSocket handshake did not complete within the timeout.
    #[error("CDP connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Connection closed while calls were still in flight.
    #[error("CDP connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// A protocol call received no reply within its timeout.
    #[error("CDP timeout after {timeout_ms}ms: {method}")]
    CallTimeout {
        /// Method of the call that timed out.
        method: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The browser reported a protocol-level error for a call.
    #[error("CDP error: {message}")]
    Protocol {
        /// Error message reported by the browser.
        message: String,
    },

    // ========================================================================
    // Page Errors
    // ========================================================================
    /// The composer editor never became ready, even after the login retry.
    #[error("Timed out waiting for the Weibo editor")]
    EditorNotFound,

    /// The editor was found but the text could not be injected.
    #[error("Failed to set post text")]
    TextInjectionFailed,

    /// No enabled submit button matched the target label.
    #[error("Submit button ({label}) not found")]
    SubmitButtonNotFound {
        /// The label that was searched for.
        label: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a port allocation error.
    #[inline]
    pub fn port_allocation(err: IoError) -> Self {
        Self::PortAllocationFailed {
            message: err.to_string(),
        }
    }

    /// Creates a process launch error.
    #[inline]
    pub fn process_launch(err: IoError) -> Self {
        Self::ProcessLaunchFailed {
            message: err.to_string(),
        }
    }

    /// Creates a debug port timeout error.
    #[inline]
    pub fn debug_port_timeout(timeout_ms: u64, last_error: impl Into<String>) -> Self {
        Self::DebugPortTimeout {
            timeout_ms,
            last_error: last_error.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a call timeout error.
    #[inline]
    pub fn call_timeout(method: impl Into<String>, timeout_ms: u64) -> Self {
        Self::CallTimeout {
            method: method.into(),
            timeout_ms,
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a submit button error.
    #[inline]
    pub fn submit_button_not_found(label: impl Into<String>) -> Self {
        Self::SubmitButtonNotFound {
            label: label.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::DebugPortTimeout { .. }
                | Self::ConnectionTimeout { .. }
                | Self::CallTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is a page-interaction failure.
    #[inline]
    #[must_use]
    pub fn is_page_error(&self) -> bool {
        matches!(
            self,
            Self::EditorNotFound | Self::TextInjectionFailed | Self::SubmitButtonNotFound { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_call_timeout_names_method() {
        let err = Error::call_timeout("Runtime.evaluate", 15_000);
        assert_eq!(
            err.to_string(),
            "CDP timeout after 15000ms: Runtime.evaluate"
        );
    }

    #[test]
    fn test_debug_port_timeout_carries_last_error() {
        let err = Error::debug_port_timeout(30_000, "connection refused");
        assert!(err.to_string().contains("connection refused"));
        assert!(err.to_string().contains("30000"));
    }

    #[test]
    fn test_submit_button_display() {
        let err = Error::submit_button_not_found("发送");
        assert_eq!(err.to_string(), "Submit button (发送) not found");
    }

    #[test]
    fn test_is_timeout() {
        assert!(Error::connection_timeout(5000).is_timeout());
        assert!(Error::call_timeout("Page.enable", 1000).is_timeout());
        assert!(Error::debug_port_timeout(1000, "x").is_timeout());
        assert!(!Error::ConnectionClosed.is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection_failed("refused").is_connection_error());
        assert!(Error::connection_timeout(1000).is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(!Error::EditorNotFound.is_connection_error());
    }

    #[test]
    fn test_is_page_error() {
        assert!(Error::EditorNotFound.is_page_error());
        assert!(Error::TextInjectionFailed.is_page_error());
        assert!(Error::submit_button_not_found("发送").is_page_error());
        assert!(!Error::protocol("boom").is_page_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
