//! Posting options and defaults.
//!
//! [`PostOptions`] is the typed input contract consumed by the sequencer.
//! The CLI layer fills it in; the core never reads argv or prompts.
//!
//! # Example
//!
//! ```ignore
//! use weibo_autopost::PostOptions;
//!
//! let options = PostOptions::new()
//!     .with_text("Hello 微博!")
//!     .with_image("./a.png")
//!     .with_submit();
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default budget for the editor-readiness wait.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(120_000);

/// Directory name for the persistent Chrome profile.
const PROFILE_DIR_NAME: &str = "weibo-autopost-profile";

// ============================================================================
// PostOptions
// ============================================================================

/// Options for one posting invocation.
///
/// `submit` defaults to `false` (preview-only): the post is composed but
/// never sent, and the browser stays open for inspection before teardown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostOptions {
    /// Post body text; skipped entirely when `None`.
    pub text: Option<String>,

    /// Image paths to attach. Paths that do not exist are silently dropped.
    pub images: Vec<PathBuf>,

    /// Actually click the submit button instead of previewing.
    pub submit: bool,

    /// Budget for the editor-readiness wait.
    pub timeout: Option<Duration>,

    /// Chrome profile directory. Defaults to a fixed per-user data dir
    /// so login cookies persist across runs.
    pub profile_dir: Option<PathBuf>,

    /// Explicit Chrome executable, bypassing discovery.
    pub executable: Option<PathBuf>,
}

// ============================================================================
// Constructors & Builder Methods
// ============================================================================

impl PostOptions {
    /// Creates empty options (preview mode, no text, no images).
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the post text.
    #[inline]
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Adds an image path.
    #[inline]
    #[must_use]
    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.images.push(path.into());
        self
    }

    /// Enables actual submission.
    #[inline]
    #[must_use]
    pub fn with_submit(mut self) -> Self {
        self.submit = true;
        self
    }

    /// Overrides the editor-wait timeout.
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the profile directory.
    #[inline]
    #[must_use]
    pub fn with_profile_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.profile_dir = Some(dir.into());
        self
    }

    /// Overrides the Chrome executable path.
    #[inline]
    #[must_use]
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }
}

// ============================================================================
// Resolution
// ============================================================================

impl PostOptions {
    /// Returns the effective editor-wait timeout.
    #[inline]
    #[must_use]
    pub fn effective_timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Returns the effective profile directory.
    #[inline]
    #[must_use]
    pub fn effective_profile_dir(&self) -> PathBuf {
        self.profile_dir
            .clone()
            .unwrap_or_else(default_profile_dir)
    }

    /// Returns `true` if there is nothing to post.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.as_deref().is_none_or(str::is_empty) && self.images.is_empty()
    }
}

// ============================================================================
// Defaults
// ============================================================================

/// Returns the default persistent profile directory.
///
/// Uses the platform data directory (XDG data home on Linux), falling
/// back to the current directory when no home can be resolved.
#[must_use]
pub fn default_profile_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(PROFILE_DIR_NAME)
}

// ============================================================================
// Tests
// ============================================================================
