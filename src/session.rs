//! Target discovery and session attachment.
//!
//! Finds (or creates) the page target for the destination URL, attaches
//! a flattened session to it, and enables the capability domains the
//! rest of the crate relies on. Callers may assume `Page`, `Runtime`,
//! and `DOM` are active on the returned session.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use url::Url;

use crate::cdp::{Call, Connection, SessionId};
use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Capability domains enabled on every attached session.
const ENABLED_DOMAINS: [&str; 3] = ["Page", "Runtime", "DOM"];

// ============================================================================
// Reply Shapes
// ============================================================================

/// One entry from `Target.getTargets`.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetInfo {
    /// Opaque target id.
    #[serde(rename = "targetId")]
    pub target_id: String,

    /// Target kind; only `"page"` targets are attachable tabs.
    #[serde(rename = "type")]
    pub kind: String,

    /// Current URL of the target.
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct TargetList {
    #[serde(rename = "targetInfos")]
    target_infos: Vec<TargetInfo>,
}

#[derive(Debug, Deserialize)]
struct CreatedTarget {
    #[serde(rename = "targetId")]
    target_id: String,
}

#[derive(Debug, Deserialize)]
struct AttachedSession {
    #[serde(rename = "sessionId")]
    session_id: SessionId,
}

// ============================================================================
// PageSession
// ============================================================================

/// An attached page target ready for session-scoped calls.
#[derive(Debug, Clone)]
pub struct PageSession {
    /// The attached target's id.
    pub target_id: String,
    /// Session token carried by all subsequent domain-scoped calls.
    pub session: SessionId,
}

// ============================================================================
// Attach
// ============================================================================

/// Discovers or creates the destination page and attaches a session.
///
/// Selects the first existing page-type target whose URL contains the
/// destination host; otherwise creates a fresh target at the destination
/// URL. The session uses flattened addressing, so commands route through
/// the session token rather than nested target contexts.
///
/// # Errors
///
/// Propagates protocol failures and reply-decoding errors.
pub async fn attach_to_page(conn: &Connection, destination_url: &str) -> Result<PageSession> {
    let host = destination_host(destination_url);

    let targets: TargetList =
        serde_json::from_value(conn.send(Call::new("Target.getTargets")).await?)?;

    let target_id = match select_page_target(&targets.target_infos, &host) {
        Some(target) => {
            debug!(target_id = %target.target_id, url = %target.url, "Reusing existing page target");
            target.target_id.clone()
        }
        None => {
            let created: CreatedTarget = serde_json::from_value(
                conn.send(
                    Call::new("Target.createTarget").params(json!({ "url": destination_url })),
                )
                .await?,
            )?;
            debug!(target_id = %created.target_id, "Created new page target");
            created.target_id
        }
    };

    let attached: AttachedSession = serde_json::from_value(
        conn.send(
            Call::new("Target.attachToTarget")
                .params(json!({ "targetId": target_id, "flatten": true })),
        )
        .await?,
    )?;
    let session = attached.session_id;

    for domain in ENABLED_DOMAINS {
        conn.send(
            Call::new(format!("{domain}.enable"))
                .params(json!({}))
                .session(&session),
        )
        .await?;
    }

    info!(%target_id, %session, "Attached to page session");

    Ok(PageSession { target_id, session })
}

/// Extracts the host to match existing targets against.
///
/// Falls back to the raw string when the destination does not parse as a
/// URL with a host.
fn destination_host(destination_url: &str) -> String {
    Url::parse(destination_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| destination_url.to_string())
}

/// Picks the first page-type target whose URL contains the host.
fn select_page_target<'a>(targets: &'a [TargetInfo], host: &str) -> Option<&'a TargetInfo> {
    targets
        .iter()
        .find(|target| target.kind == "page" && target.url.contains(host))
}

// ============================================================================
// Tests
// ============================================================================
