//! CDP wire message types.
//!
//! Outbound commands are [`Envelope`]s carrying a monotonically
//! increasing call id; inbound traffic is parsed as [`Reply`], which
//! covers correlated responses, remote errors, and push notifications
//! (events) in one shape. Replies are loosely typed JSON; callers decode
//! the `result` value into per-call-site structs at the boundary.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Constants
// ============================================================================

/// Default timeout applied to protocol calls.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_millis(15_000);

// ============================================================================
// SessionId
// ============================================================================

/// Opaque token addressing one attached page session.
///
/// All domain-scoped calls after `Target.attachToTarget` must carry this
/// token. Sessions are never explicitly detached; teardown closes the
/// whole connection instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps a raw session token.
    #[inline]
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Call
// ============================================================================

/// One protocol call, ready to be assigned an id and sent.
#[derive(Debug, Clone)]
pub struct Call {
    /// Method name, e.g. `Runtime.evaluate`.
    pub method: String,
    /// Method parameters; omitted from the wire when `None`.
    pub params: Option<Value>,
    /// Session token for session-scoped addressing.
    pub session: Option<SessionId>,
    /// Per-call timeout. `Duration::ZERO` disables the timer.
    pub timeout: Duration,
}

impl Call {
    /// Creates a call with the default timeout and no params.
    #[inline]
    #[must_use]
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: None,
            session: None,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Sets the call parameters.
    #[inline]
    #[must_use]
    pub fn params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Routes the call through an attached session.
    #[inline]
    #[must_use]
    pub fn session(mut self, session: &SessionId) -> Self {
        self.session = Some(session.clone());
        self
    }

    /// Overrides the call timeout. `Duration::ZERO` waits indefinitely.
    #[inline]
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// Outbound command envelope.
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    /// Correlation id, unique per connection, starting at 1.
    pub id: u64,

    /// Method name.
    pub method: &'a str,

    /// Method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<&'a Value>,

    /// Session token for session-scoped addressing.
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<&'a str>,
}

// ============================================================================
// Reply
// ============================================================================

/// Inbound message: correlated reply or push notification.
///
/// A message with an `id` is a reply to an in-flight call; a message
/// with a `method` but no `id` is an event. Anything else is noise and
/// gets dropped by the connection.
#[derive(Debug, Deserialize)]
pub struct Reply {
    /// Correlation id; absent on push notifications.
    #[serde(default)]
    pub id: Option<u64>,

    /// Result payload on success.
    #[serde(default)]
    pub result: Option<Value>,

    /// Remote-reported error on failure.
    #[serde(default)]
    pub error: Option<RemoteError>,

    /// Event method on push notifications.
    #[serde(default)]
    pub method: Option<String>,
}

impl Reply {
    /// Returns `true` if this is a push notification rather than a reply.
    #[inline]
    #[must_use]
    pub fn is_event(&self) -> bool {
        self.id.is_none() && self.method.is_some()
    }
}

/// Error object carried by a failed reply.
#[derive(Debug, Deserialize)]
pub struct RemoteError {
    /// Numeric protocol error code.
    #[serde(default)]
    pub code: i64,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_minimal() {
        let envelope = Envelope {
            id: 1,
            method: "Target.getTargets",
            params: None,
            session_id: None,
        };

        let json = serde_json::to_value(&envelope).expect("serialize");
        assert_eq!(json, json!({"id": 1, "method": "Target.getTargets"}));
    }

    #[test]
    fn test_envelope_with_session_and_params() {
        let params = json!({"expression": "1 + 1", "returnByValue": true});
        let envelope = Envelope {
            id: 7,
            method: "Runtime.evaluate",
            params: Some(&params),
            session_id: Some("SESSION-1"),
        };

        let json = serde_json::to_value(&envelope).expect("serialize");
        assert_eq!(json["id"], 7);
        assert_eq!(json["method"], "Runtime.evaluate");
        assert_eq!(json["sessionId"], "SESSION-1");
        assert_eq!(json["params"]["expression"], "1 + 1");
    }

    #[test]
    fn test_reply_success() {
        let reply: Reply =
            serde_json::from_str(r#"{"id": 3, "result": {"value": 42}}"#).expect("parse");
        assert_eq!(reply.id, Some(3));
        assert!(reply.error.is_none());
        assert!(!reply.is_event());
        assert_eq!(reply.result.expect("result")["value"], 42);
    }

    #[test]
    fn test_reply_error() {
        let reply: Reply = serde_json::from_str(
            r#"{"id": 4, "error": {"code": -32000, "message": "Target closed"}}"#,
        )
        .expect("parse");

        let error = reply.error.expect("error");
        assert_eq!(error.code, -32000);
        assert_eq!(error.message, "Target closed");
    }

    #[test]
    fn test_reply_event() {
        let reply: Reply = serde_json::from_str(
            r#"{"method": "Page.loadEventFired", "params": {"timestamp": 1.0}}"#,
        )
        .expect("parse");

        assert!(reply.is_event());
        assert!(reply.id.is_none());
    }

    #[test]
    fn test_call_builder() {
        let session = SessionId::new("S1");
        let call = Call::new("DOM.enable")
            .params(json!({}))
            .session(&session)
            .timeout(Duration::from_secs(5));

        assert_eq!(call.method, "DOM.enable");
        assert_eq!(call.session.as_ref().map(SessionId::as_str), Some("S1"));
        assert_eq!(call.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_call_default_timeout() {
        let call = Call::new("Page.enable");
        assert_eq!(call.timeout, DEFAULT_CALL_TIMEOUT);
        assert!(call.params.is_none());
        assert!(call.session.is_none());
    }

    #[test]
    fn test_session_id_display() {
        let session = SessionId::new("ABCDEF");
        assert_eq!(session.to_string(), "ABCDEF");
    }
}
