//! # Transport Abstraction
//!
//! A minimal, blocking interface for moving bytes between a dispatcher and
//! its peer.
//!
//! ## Philosophy
//!
//! - **Byte-Oriented**: the transport knows nothing about frames or types. It
//!   moves opaque buffers.
//! - **Symmetric**: initiator and responder use the same two operations.
//! - **Bounded**: `receive` gives up after a transport-defined wait so that
//!   loops built on top of it can observe shutdown and timeouts.

use std::sync::Arc;

/// Errors that occur at the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The peer is gone and no further messages can be exchanged.
    #[error("transport disconnected")]
    Disconnected,
    /// Generic I/O error or internal transport failure.
    #[error("I/O error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// A channel that moves whole messages in both directions.
///
/// This trait is object-safe (`Box<dyn Transport>`).
pub trait Transport: Send + Sync + 'static {
    /// Hands a message to the transport. There is no acknowledgement.
    fn send(&self, payload: &[u8]) -> Result<()>;

    /// Waits a bounded time for the next message.
    ///
    /// # Invariants
    /// - Returns `Ok(None)` when nothing arrived within the bound.
    /// - Must never block forever.
    fn receive(&self) -> Result<Option<Vec<u8>>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, payload: &[u8]) -> Result<()> {
        (**self).send(payload)
    }

    fn receive(&self) -> Result<Option<Vec<u8>>> {
        (**self).receive()
    }
}
