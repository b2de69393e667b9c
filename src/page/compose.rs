//! Composer operations: editor wait, text injection, labeled clicks,
//! image attachment.
//!
//! These are thin sequenced wrappers over the script builders and the
//! DOM capability domain; the sequencer owns ordering and retries.

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tokio::time::sleep;
use tracing::debug;

use crate::cdp::{Call, Connection, SessionId};
use crate::error::Result;

use super::probe::{evaluate_bool, poll_until};
use super::scripts;

// ============================================================================
// Constants
// ============================================================================

/// Interval between editor-readiness probes.
const EDITOR_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Pause after clicking the upload trigger, before the file input appears.
const UPLOAD_REVEAL_DELAY: Duration = Duration::from_millis(500);

/// Pause after submitting files so the page starts processing them.
const UPLOAD_SETTLE_DELAY: Duration = Duration::from_millis(2_000);

/// Selector matching file-upload inputs.
const FILE_INPUT_SELECTOR: &str = "input[type=\"file\"]";

// ============================================================================
// Reply Shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct GetDocumentReply {
    root: DocumentRoot,
}

#[derive(Debug, Deserialize)]
struct DocumentRoot {
    #[serde(rename = "nodeId")]
    node_id: i64,
}

#[derive(Debug, Deserialize)]
struct QueryAllReply {
    #[serde(rename = "nodeIds", default)]
    node_ids: Vec<i64>,
}

// ============================================================================
// Editor
// ============================================================================

/// Waits until the composer editor is resolved and marked.
///
/// Returns `Ok(false)` when the budget elapses without an editor; a
/// negative result, not an error, so the caller can decide to retry.
pub async fn wait_for_editor(
    conn: &Connection,
    session: &SessionId,
    budget: Duration,
) -> Result<bool> {
    poll_until(
        conn,
        session,
        &scripts::editor_probe_script(),
        budget,
        EDITOR_POLL_INTERVAL,
    )
    .await
}

/// Injects the post text into the marked editor.
pub async fn set_text(conn: &Connection, session: &SessionId, text: &str) -> Result<bool> {
    evaluate_bool(conn, session, &scripts::set_text_script(text)).await
}

/// Clicks the best visible, enabled control matching `label`.
pub async fn click_labeled(conn: &Connection, session: &SessionId, label: &str) -> Result<bool> {
    evaluate_bool(conn, session, &scripts::click_labeled_script(label)).await
}

// ============================================================================
// Images
// ============================================================================

/// Attaches images to the composer.
///
/// Paths that do not exist are silently dropped. Clicks the upload
/// trigger, waits for the uploader to be revealed, then sets the files
/// on the last file input in the document - last-in-DOM is assumed to be
/// the most recently revealed, most specific uploader. Returns the
/// number of files actually submitted.
pub async fn attach_images(
    conn: &Connection,
    session: &SessionId,
    images: &[PathBuf],
) -> Result<usize> {
    let existing = existing_files(images);
    if existing.is_empty() {
        return Ok(0);
    }

    click_labeled(conn, session, scripts::IMAGE_LABEL).await?;
    sleep(UPLOAD_REVEAL_DELAY).await;

    let document: GetDocumentReply = serde_json::from_value(
        conn.send(
            Call::new("DOM.getDocument")
                .params(json!({}))
                .session(session),
        )
        .await?,
    )?;

    let inputs: QueryAllReply = serde_json::from_value(
        conn.send(
            Call::new("DOM.querySelectorAll")
                .params(json!({
                    "nodeId": document.root.node_id,
                    "selector": FILE_INPUT_SELECTOR,
                }))
                .session(session),
        )
        .await?,
    )?;

    let Some(&target_node) = inputs.node_ids.last() else {
        debug!("No file input found after upload trigger");
        return Ok(0);
    };

    conn.send(
        Call::new("DOM.setFileInputFiles")
            .params(json!({ "nodeId": target_node, "files": existing }))
            .session(session),
    )
    .await?;

    sleep(UPLOAD_SETTLE_DELAY).await;

    debug!(count = existing.len(), "Submitted files to uploader");
    Ok(existing.len())
}

/// Filters to paths that exist on disk, as strings for the wire.
fn existing_files(images: &[PathBuf]) -> Vec<String> {
    images
        .iter()
        .filter(|path| path.exists())
        .map(|path| path.display().to_string())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_files_drops_missing_paths() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        let images = vec![
            file.path().to_path_buf(),
            PathBuf::from("/definitely/missing.png"),
        ];

        let existing = existing_files(&images);
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0], file.path().display().to_string());
    }

    #[test]
    fn test_existing_files_empty_input() {
        assert!(existing_files(&[]).is_empty());
    }

    #[test]
    fn test_get_document_reply_decoding() {
        let reply: GetDocumentReply =
            serde_json::from_str(r##"{"root": {"nodeId": 1, "nodeName": "#document"}}"##)
                .expect("parse");
        assert_eq!(reply.root.node_id, 1);
    }

    #[test]
    fn test_query_all_reply_decoding() {
        let reply: QueryAllReply =
            serde_json::from_str(r#"{"nodeIds": [4, 9, 17]}"#).expect("parse");
        assert_eq!(reply.node_ids, vec![4, 9, 17]);

        let empty: QueryAllReply = serde_json::from_str(r#"{}"#).expect("parse");
        assert!(empty.node_ids.is_empty());
    }

    #[test]
    fn test_last_file_input_is_targeted() {
        let reply: QueryAllReply =
            serde_json::from_str(r#"{"nodeIds": [4, 9, 17]}"#).expect("parse");
        assert_eq!(reply.node_ids.last(), Some(&17));
    }
}
