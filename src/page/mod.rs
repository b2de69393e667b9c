//! Page-level primitives: polling, in-page scripts, composer operations.
//!
//! Everything here runs through `Runtime.evaluate` round trips; the only
//! state that survives between calls is the editor mark attribute
//! written into the page's DOM.

pub mod compose;
pub mod probe;
pub mod scripts;

pub use compose::{attach_images, click_labeled, set_text, wait_for_editor};
pub use probe::{evaluate, evaluate_bool, poll_until};
