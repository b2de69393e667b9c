//! Ephemeral debugging-port allocation.
//!
//! Chrome needs a free local TCP port for `--remote-debugging-port`.
//! The allocator binds `127.0.0.1:0` and keeps the listener alive inside
//! the returned guard, so two concurrently held allocations can never
//! report the same port. The socket is released with [`EphemeralPort::into_port`]
//! immediately before Chrome binds it.

// ============================================================================
// Imports
// ============================================================================

use std::net::TcpListener;

use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// EphemeralPort
// ============================================================================

/// A free local TCP port, held until consumed.
///
/// The bound listener is kept open for the lifetime of this value.
#[derive(Debug)]
pub struct EphemeralPort {
    port: u16,
    listener: TcpListener,
}

impl EphemeralPort {
    /// Allocates an unused local port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PortAllocationFailed`] if binding or address
    /// lookup fails.
    pub fn allocate() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").map_err(Error::port_allocation)?;
        let port = listener
            .local_addr()
            .map_err(Error::port_allocation)?
            .port();

        debug!(port, "Allocated ephemeral debug port");

        Ok(Self { port, listener })
    }

    /// Returns the reserved port number.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Releases the socket and returns the port for the browser to bind.
    ///
    /// There is a short window between release and the Chrome bind in
    /// which another process could grab the port; the debug-endpoint
    /// poller surfaces that case as a readiness timeout.
    #[must_use]
    pub fn into_port(self) -> u16 {
        drop(self.listener);
        self.port
    }
}

// ============================================================================
// Tests
// ============================================================================
