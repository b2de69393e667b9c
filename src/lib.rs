//! Weibo posting through a visible Chrome window, driven over the
//! Chrome DevTools Protocol.
//!
//! The crate launches Chrome against a persistent profile with remote
//! debugging enabled, polls the debug endpoint, attaches to the Weibo
//! page over a single WebSocket connection, and drives a sequential
//! compose pipeline: resolve the editor heuristically, inject text,
//! attach images through the native file input, then submit or hold
//! open for preview. Teardown runs unconditionally.
//!
//! ```no_run
//! use weibo_autopost::{PostOptions, sequencer};
//!
//! # async fn run() -> weibo_autopost::Result<()> {
//! let options = PostOptions::new()
//!     .with_text("Hello from Rust")
//!     .with_image("photo.jpg");
//! let outcome = sequencer::post(&options).await?;
//! assert!(!outcome.submitted); // preview mode by default
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cdp;
pub mod error;
pub mod launcher;
pub mod options;
pub mod page;
pub mod sequencer;
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use cdp::{Call, Connection, SessionId};
pub use error::{Error, Result};
pub use options::PostOptions;
pub use sequencer::{Outcome, Timings, post, post_with_timings};
pub use session::{PageSession, attach_to_page};
