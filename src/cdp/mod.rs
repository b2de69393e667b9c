//! Chrome DevTools Protocol client.
//!
//! [`Connection`] owns the WebSocket transport and correlates replies to
//! calls by id; [`Call`] describes one command, optionally routed through
//! an attached [`SessionId`].

pub mod connection;
pub mod message;

pub use connection::Connection;
pub use message::{Call, DEFAULT_CALL_TIMEOUT, Envelope, RemoteError, Reply, SessionId};
