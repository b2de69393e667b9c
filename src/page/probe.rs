//! Page-state polling primitive.
//!
//! Readiness on a page with unknown DOM structure is observed, not
//! evented: a boolean in-page expression is re-evaluated until it turns
//! true or the budget runs out. Timing out is a valid negative result
//! (`Ok(false)`), distinct from a hard protocol failure, which
//! propagates.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::{Instant, sleep};
use tracing::trace;

use crate::cdp::{Call, Connection, SessionId};
use crate::error::Result;

// ============================================================================
// Reply Shapes
// ============================================================================

/// `Runtime.evaluate` reply envelope.
#[derive(Debug, Deserialize)]
struct EvalReply {
    #[serde(default)]
    result: EvalValue,
}

/// The remote object wrapper around a by-value result.
#[derive(Debug, Default, Deserialize)]
struct EvalValue {
    #[serde(default)]
    value: Value,
}

// ============================================================================
// Evaluate
// ============================================================================

/// Evaluates an expression in the page and returns its by-value result.
///
/// # Errors
///
/// Propagates protocol failures and reply-decoding errors.
pub async fn evaluate(conn: &Connection, session: &SessionId, expression: &str) -> Result<Value> {
    let reply = conn
        .send(
            Call::new("Runtime.evaluate")
                .params(json!({ "expression": expression, "returnByValue": true }))
                .session(session),
        )
        .await?;

    let decoded: EvalReply = serde_json::from_value(reply)?;
    Ok(decoded.result.value)
}

/// Evaluates a boolean expression; non-boolean results count as `false`.
pub async fn evaluate_bool(
    conn: &Connection,
    session: &SessionId,
    expression: &str,
) -> Result<bool> {
    Ok(evaluate(conn, session, expression)
        .await?
        .as_bool()
        .unwrap_or(false))
}

// ============================================================================
// Poll
// ============================================================================

/// Re-evaluates `predicate` every `interval` until it returns `true` or
/// `budget` elapses.
///
/// Returns `Ok(false)` on timeout; protocol failures propagate.
pub async fn poll_until(
    conn: &Connection,
    session: &SessionId,
    predicate: &str,
    budget: Duration,
    interval: Duration,
) -> Result<bool> {
    let deadline = Instant::now() + budget;

    loop {
        if evaluate_bool(conn, session, predicate).await? {
            return Ok(true);
        }

        if Instant::now() >= deadline {
            trace!(budget_ms = budget.as_millis() as u64, "Predicate poll budget exhausted");
            return Ok(false);
        }

        sleep(interval).await;
    }
}

// ============================================================================
// Tests
// ============================================================================
