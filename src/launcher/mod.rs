//! Browser launch pipeline.
//!
//! Four leaf concerns, used in order by the sequencer:
//!
//! 1. [`locate::locate`] - resolve an installed Chrome binary
//! 2. [`port::EphemeralPort`] - allocate a free debugging port
//! 3. [`process::BrowserProcess`] - spawn and own the Chrome process
//! 4. [`endpoint::wait_for_debugger`] - wait for the CDP endpoint

pub mod endpoint;
pub mod locate;
pub mod port;
pub mod process;

pub use endpoint::wait_for_debugger;
pub use locate::locate;
pub use port::EphemeralPort;
pub use process::BrowserProcess;
