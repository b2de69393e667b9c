//! Chrome process supervision.
//!
//! [`BrowserProcess`] owns the OS-level process handle together with its
//! debugging port and profile directory; nothing else mutates them. The
//! window is real and user-visible, so shutdown is two-phase: a graceful
//! terminate first, a forced kill only as a safety net after the grace
//! window. The protocol-level `Browser.close` happens upstream in the
//! sequencer before this module is asked to stop the process.

// ============================================================================
// Imports
// ============================================================================

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::fs;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

// ============================================================================
// BrowserProcess
// ============================================================================

/// A spawned Chrome instance and the resources it was launched with.
#[derive(Debug)]
pub struct BrowserProcess {
    child: Child,
    port: u16,
    profile_dir: PathBuf,
}

impl BrowserProcess {
    /// Spawns Chrome with the remote-debugging endpoint enabled.
    ///
    /// The profile directory is created if absent and intentionally never
    /// deleted, so login cookies survive between runs.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the profile directory cannot be created
    /// - [`Error::ProcessLaunchFailed`] if the spawn fails
    pub async fn launch(
        executable: &Path,
        port: u16,
        profile_dir: &Path,
        url: &str,
    ) -> Result<Self> {
        fs::create_dir_all(profile_dir).await?;

        let mut cmd = Command::new(executable);
        cmd.arg(format!("--remote-debugging-port={port}"))
            .arg(format!("--user-data-dir={}", profile_dir.display()))
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--start-maximized")
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let child = cmd.spawn().map_err(Error::process_launch)?;

        info!(
            pid = child.id(),
            port,
            profile = %profile_dir.display(),
            "Chrome process spawned"
        );

        Ok(Self {
            child,
            port,
            profile_dir: profile_dir.to_path_buf(),
        })
    }

    /// Returns the debugging port this process was launched with.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the profile directory this process was launched with.
    #[inline]
    #[must_use]
    pub fn profile_dir(&self) -> &Path {
        &self.profile_dir
    }

    /// Stops the process: graceful terminate, then forced kill.
    ///
    /// Sends SIGTERM immediately (unix), waits up to `grace` for the
    /// process to exit, then SIGKILLs whatever is left. All failures are
    /// swallowed; teardown must never mask the primary error or block
    /// program exit.
    pub async fn shutdown(mut self, grace: Duration) {
        self.terminate_gracefully();

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!(%status, "Chrome exited within grace window");
                return;
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Failed waiting for Chrome exit");
            }
            Err(_) => {
                debug!(grace_ms = grace.as_millis() as u64, "Grace window elapsed, killing Chrome");
            }
        }

        if let Err(e) = self.child.kill().await {
            warn!(error = %e, "Failed to kill Chrome process");
        }
    }

    /// Delivers SIGTERM to the process on unix; no-op elsewhere.
    #[cfg(unix)]
    fn terminate_gracefully(&self) {
        let Some(pid) = self.child.id() else {
            return;
        };
        let Ok(pid_t) = libc::pid_t::try_from(pid) else {
            return;
        };

        let result = unsafe { libc::kill(pid_t, libc::SIGTERM) };
        if result != 0 {
            debug!(
                pid,
                error = %std::io::Error::last_os_error(),
                "SIGTERM delivery failed"
            );
        }
    }

    #[cfg(not(unix))]
    fn terminate_gracefully(&self) {}
}

// ============================================================================
// Tests
// ============================================================================
