//! End-to-end action sequencing and teardown.
//!
//! One invocation drives a strictly sequential pipeline:
//!
//! ```text
//! Launching -> WaitingForDebugPort -> Connecting -> AttachingSession
//!   -> WaitingForEditor -> SettingText? -> UploadingImages?
//!   -> Submitting? | Previewing -> TearingDown
//! ```
//!
//! No step begins before the previous one resolves, and no branch
//! re-enters an earlier state except one explicit retry: a failed editor
//! wait logs a login prompt, holds for a grace period, and retries the
//! wait exactly once. Teardown runs unconditionally, whichever state
//! preceded it, and its own failures are swallowed so they never mask
//! the primary error.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::cdp::{Call, Connection, SessionId};
use crate::error::{Error, Result};
use crate::launcher::{BrowserProcess, EphemeralPort, locate, wait_for_debugger};
use crate::options::PostOptions;
use crate::page::{compose, scripts};
use crate::session::attach_to_page;

// ============================================================================
// Constants
// ============================================================================

/// Destination page for every invocation.
pub const WEIBO_URL: &str = "https://weibo.com/";

/// Budget for the debug endpoint to become ready.
const DEBUG_PORT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Budget for the WebSocket handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Timeout for the graceful protocol-level browser close.
const BROWSER_CLOSE_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Grace window between terminate and forced kill.
const KILL_GRACE: Duration = Duration::from_millis(2_000);

// ============================================================================
// Step
// ============================================================================

/// Pipeline states, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Launching,
    WaitingForDebugPort,
    Connecting,
    AttachingSession,
    WaitingForEditor,
    SettingText,
    UploadingImages,
    Submitting,
    Previewing,
    TearingDown,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Launching => "launching",
            Self::WaitingForDebugPort => "waiting-for-debug-port",
            Self::Connecting => "connecting",
            Self::AttachingSession => "attaching-session",
            Self::WaitingForEditor => "waiting-for-editor",
            Self::SettingText => "setting-text",
            Self::UploadingImages => "uploading-images",
            Self::Submitting => "submitting",
            Self::Previewing => "previewing",
            Self::TearingDown => "tearing-down",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Timings
// ============================================================================

/// Fixed delays used by the compose pipeline.
///
/// Production values match observed page behavior; tests shrink them.
#[derive(Debug, Clone)]
pub struct Timings {
    /// Pause after session attach before the first editor probe.
    pub initial_settle: Duration,
    /// Hold for the user to log in before the single editor-wait retry.
    pub login_grace: Duration,
    /// Pause after text injection.
    pub text_settle: Duration,
    /// Pause after the submit click before teardown.
    pub submit_settle: Duration,
    /// How long the browser stays open in preview mode.
    pub preview_hold: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            initial_settle: Duration::from_millis(1_500),
            login_grace: Duration::from_millis(30_000),
            text_settle: Duration::from_millis(500),
            submit_settle: Duration::from_millis(2_000),
            preview_hold: Duration::from_millis(30_000),
        }
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Result of a completed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Whether the post was actually submitted (vs. previewed).
    pub submitted: bool,
    /// Number of image files handed to the uploader.
    pub images_attached: usize,
}

// ============================================================================
// ComposeSurface
// ============================================================================

/// The page operations the sequencer drives.
///
/// The live implementation evaluates scripts through an attached CDP
/// session; tests substitute a scripted surface.
#[async_trait]
pub trait ComposeSurface {
    /// Waits for the editor to resolve; `Ok(false)` on a quiet timeout.
    async fn wait_for_editor(&mut self, budget: Duration) -> Result<bool>;

    /// Injects the post text; `Ok(false)` when nothing could be mutated.
    async fn set_text(&mut self, text: &str) -> Result<bool>;

    /// Attaches existing image files; returns the submitted count.
    async fn attach_images(&mut self, images: &[PathBuf]) -> Result<usize>;

    /// Clicks the submit control; `Ok(false)` when no match was found.
    async fn click_submit(&mut self) -> Result<bool>;
}

/// Live surface bound to one attached page session.
struct LivePage {
    conn: Connection,
    session: SessionId,
}

#[async_trait]
impl ComposeSurface for LivePage {
    async fn wait_for_editor(&mut self, budget: Duration) -> Result<bool> {
        compose::wait_for_editor(&self.conn, &self.session, budget).await
    }

    async fn set_text(&mut self, text: &str) -> Result<bool> {
        compose::set_text(&self.conn, &self.session, text).await
    }

    async fn attach_images(&mut self, images: &[PathBuf]) -> Result<usize> {
        compose::attach_images(&self.conn, &self.session, images).await
    }

    async fn click_submit(&mut self) -> Result<bool> {
        compose::click_labeled(&self.conn, &self.session, scripts::SUBMIT_LABEL).await
    }
}

// ============================================================================
// Entry Point
// ============================================================================

/// Runs one full posting invocation against a real Chrome window.
///
/// # Errors
///
/// Propagates the first unrecoverable step failure. The browser process
/// is torn down before this returns, success or not.
pub async fn post(options: &PostOptions) -> Result<Outcome> {
    post_with_timings(options, &Timings::default()).await
}

/// [`post`] with injectable delays.
pub async fn post_with_timings(options: &PostOptions, timings: &Timings) -> Result<Outcome> {
    let executable = locate(options.executable.as_deref())?;
    let profile_dir = options.effective_profile_dir();
    let port = EphemeralPort::allocate()?.into_port();

    info!(step = %Step::Launching, profile = %profile_dir.display(), "Launching Chrome");
    let process = BrowserProcess::launch(&executable, port, &profile_dir, WEIBO_URL).await?;

    // Whatever happens from here on, the process gets torn down.
    let mut conn: Option<Connection> = None;
    let outcome = run_session(port, &mut conn, options, timings).await;
    teardown(conn, process).await;

    outcome
}

/// Everything between process launch and teardown.
///
/// The connection is parked in `conn_slot` as soon as it exists so the
/// teardown path can reach it even when a later step fails.
async fn run_session(
    port: u16,
    conn_slot: &mut Option<Connection>,
    options: &PostOptions,
    timings: &Timings,
) -> Result<Outcome> {
    info!(step = %Step::WaitingForDebugPort, port, "Waiting for debug endpoint");
    let ws_url = wait_for_debugger(port, DEBUG_PORT_TIMEOUT).await?;

    info!(step = %Step::Connecting, "Connecting to CDP");
    let conn = Connection::connect(&ws_url, CONNECT_TIMEOUT).await?;
    *conn_slot = Some(conn.clone());

    info!(step = %Step::AttachingSession, "Attaching to page");
    let page = attach_to_page(&conn, WEIBO_URL).await?;

    let mut surface = LivePage {
        conn,
        session: page.session,
    };

    run_compose(&mut surface, options, timings).await
}

// ============================================================================
// Compose Pipeline
// ============================================================================

/// Drives the compose steps against any surface.
pub async fn run_compose(
    surface: &mut impl ComposeSurface,
    options: &PostOptions,
    timings: &Timings,
) -> Result<Outcome> {
    let budget = options.effective_timeout();

    info!(step = %Step::WaitingForEditor, "Waiting for editor");
    sleep(timings.initial_settle).await;

    if !surface.wait_for_editor(budget).await? {
        // Most likely not logged in; give the user one chance to fix
        // that in the visible window, then retry the wait exactly once.
        info!("Editor not found. Please log in to Weibo in the browser window.");
        sleep(timings.login_grace).await;

        if !surface.wait_for_editor(budget).await? {
            return Err(Error::EditorNotFound);
        }
    }

    if let Some(text) = options.text.as_deref().filter(|t| !t.is_empty()) {
        info!(step = %Step::SettingText, "Setting text");
        if !surface.set_text(text).await? {
            return Err(Error::TextInjectionFailed);
        }
        sleep(timings.text_settle).await;
    }

    let mut images_attached = 0;
    if !options.images.is_empty() {
        info!(step = %Step::UploadingImages, count = options.images.len(), "Attaching images");
        images_attached = surface.attach_images(&options.images).await?;
        if images_attached > 0 {
            info!(count = images_attached, "Selected image(s)");
        }
    }

    if options.submit {
        info!(step = %Step::Submitting, "Submitting");
        if !surface.click_submit().await? {
            return Err(Error::submit_button_not_found(scripts::SUBMIT_LABEL));
        }
        sleep(timings.submit_settle).await;
        info!("Submitted");

        Ok(Outcome {
            submitted: true,
            images_attached,
        })
    } else {
        info!(step = %Step::Previewing, "Draft composed (preview mode). Pass --submit to post.");
        info!(
            hold_ms = timings.preview_hold.as_millis() as u64,
            "Browser stays open for preview"
        );
        sleep(timings.preview_hold).await;

        Ok(Outcome {
            submitted: false,
            images_attached,
        })
    }
}

// ============================================================================
// Teardown
// ============================================================================

/// Unconditional, ordered teardown.
///
/// Graceful protocol-level close under a short timeout, then transport
/// close, then the supervisor's terminate-then-kill. Every failure here
/// is swallowed.
async fn teardown(conn: Option<Connection>, process: BrowserProcess) {
    info!(step = %Step::TearingDown, "Tearing down");

    if let Some(conn) = conn {
        let close = conn
            .send(Call::new("Browser.close").timeout(BROWSER_CLOSE_TIMEOUT))
            .await;
        if let Err(e) = close {
            debug!(error = %e, "Graceful browser close failed");
        }
        conn.close();
    }

    process.shutdown(KILL_GRACE).await;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Instant;

    fn fast_timings() -> Timings {
        Timings {
            initial_settle: Duration::from_millis(1),
            login_grace: Duration::from_millis(100),
            text_settle: Duration::from_millis(1),
            submit_settle: Duration::from_millis(1),
            preview_hold: Duration::from_millis(1),
        }
    }

    /// Scripted surface recording every call.
    #[derive(Default)]
    struct ScriptedSurface {
        editor_replies: Vec<bool>,
        editor_calls: usize,
        set_text_ok: bool,
        texts_set: Vec<String>,
        attach_result: usize,
        attach_calls: usize,
        submit_ok: bool,
        submit_calls: usize,
    }

    #[async_trait]
    impl ComposeSurface for ScriptedSurface {
        async fn wait_for_editor(&mut self, _budget: Duration) -> Result<bool> {
            let reply = self
                .editor_replies
                .get(self.editor_calls)
                .copied()
                .unwrap_or(false);
            self.editor_calls += 1;
            Ok(reply)
        }

        async fn set_text(&mut self, text: &str) -> Result<bool> {
            self.texts_set.push(text.to_string());
            Ok(self.set_text_ok)
        }

        async fn attach_images(&mut self, images: &[PathBuf]) -> Result<usize> {
            self.attach_calls += 1;
            let _ = images;
            Ok(self.attach_result)
        }

        async fn click_submit(&mut self) -> Result<bool> {
            self.submit_calls += 1;
            Ok(self.submit_ok)
        }
    }

    #[tokio::test]
    async fn test_preview_mode_never_touches_submit_button() {
        let mut surface = ScriptedSurface {
            editor_replies: vec![true],
            set_text_ok: true,
            ..Default::default()
        };
        let options = PostOptions::new().with_text("Hello");

        let outcome = run_compose(&mut surface, &options, &fast_timings())
            .await
            .expect("preview run");

        assert!(!outcome.submitted);
        assert_eq!(surface.texts_set, vec!["Hello"]);
        assert_eq!(surface.submit_calls, 0);
    }

    #[tokio::test]
    async fn test_missing_submit_button_fails_after_text_was_set() {
        let mut surface = ScriptedSurface {
            editor_replies: vec![true],
            set_text_ok: true,
            submit_ok: false,
            ..Default::default()
        };
        let options = PostOptions::new().with_text("Hello").with_submit();

        let result = run_compose(&mut surface, &options, &fast_timings()).await;

        assert!(matches!(result, Err(Error::SubmitButtonNotFound { .. })));
        // Text injection completed before the submit search failed.
        assert_eq!(surface.texts_set, vec!["Hello"]);
        assert_eq!(surface.submit_calls, 1);
    }

    #[tokio::test]
    async fn test_editor_retry_waits_full_grace_period() {
        let mut surface = ScriptedSurface {
            editor_replies: vec![false, false],
            ..Default::default()
        };
        let timings = fast_timings();
        let options = PostOptions::new()
            .with_text("Hello")
            .with_timeout(Duration::from_millis(1));

        let start = Instant::now();
        let result = run_compose(&mut surface, &options, &timings).await;
        let elapsed = start.elapsed();

        assert!(matches!(result, Err(Error::EditorNotFound)));
        // Exactly one retry, and only after the full login grace hold.
        assert_eq!(surface.editor_calls, 2);
        assert!(elapsed >= timings.login_grace);
    }

    #[tokio::test]
    async fn test_editor_found_on_retry_continues() {
        let mut surface = ScriptedSurface {
            editor_replies: vec![false, true],
            set_text_ok: true,
            ..Default::default()
        };
        let options = PostOptions::new().with_text("Hello");

        let outcome = run_compose(&mut surface, &options, &fast_timings())
            .await
            .expect("run");

        assert_eq!(surface.editor_calls, 2);
        assert!(!outcome.submitted);
    }

    #[tokio::test]
    async fn test_text_injection_failure_is_fatal() {
        let mut surface = ScriptedSurface {
            editor_replies: vec![true],
            set_text_ok: false,
            ..Default::default()
        };
        let options = PostOptions::new().with_text("Hello").with_submit();

        let result = run_compose(&mut surface, &options, &fast_timings()).await;

        assert!(matches!(result, Err(Error::TextInjectionFailed)));
        assert_eq!(surface.submit_calls, 0);
        assert_eq!(surface.attach_calls, 0);
    }

    #[tokio::test]
    async fn test_submit_run_reports_outcome() {
        let mut surface = ScriptedSurface {
            editor_replies: vec![true],
            set_text_ok: true,
            submit_ok: true,
            attach_result: 1,
            ..Default::default()
        };
        let options = PostOptions::new()
            .with_text("Hello")
            .with_image("/tmp/a.png")
            .with_submit();

        let outcome = run_compose(&mut surface, &options, &fast_timings())
            .await
            .expect("run");

        assert!(outcome.submitted);
        assert_eq!(outcome.images_attached, 1);
        assert_eq!(surface.attach_calls, 1);
        assert_eq!(surface.submit_calls, 1);
    }

    #[tokio::test]
    async fn test_empty_text_skips_injection() {
        let mut surface = ScriptedSurface {
            editor_replies: vec![true],
            ..Default::default()
        };
        let options = PostOptions::new().with_text("").with_image("/x.png");

        let _ = run_compose(&mut surface, &options, &fast_timings())
            .await
            .expect("run");

        assert!(surface.texts_set.is_empty());
    }

    #[test]
    fn test_step_display_names() {
        assert_eq!(Step::WaitingForEditor.to_string(), "waiting-for-editor");
        assert_eq!(Step::TearingDown.to_string(), "tearing-down");
    }
}
