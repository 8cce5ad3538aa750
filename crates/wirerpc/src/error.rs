//! # Error Definitions
//!
//! Local marshalling failures. A failure of the remote callable is carried as
//! [`Error::Remote`]; everything else means this side could not build or
//! read a frame.

use crate::types::RemoteError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The frame was produced by an incompatible protocol revision.
    #[error("protocol version mismatch: expected {expected}, found {found}")]
    ProtocolVersionMismatch { expected: u8, found: u8 },
    /// The underlying wirepack stream could not be written or read.
    #[error("codec failure: {0}")]
    Pack(#[from] wirepack::Error),
    /// The stream was valid wirepack but not a valid frame.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    /// The argument list did not have the declared number of items.
    #[error("expected {expected} argument(s), found {found}")]
    ArgumentCount { expected: usize, found: usize },
    /// The remote callable failed.
    #[error("remote failure: {0}")]
    Remote(#[from] RemoteError),
}

/// A specialized Result type for marshalling operations.
pub type Result<T> = std::result::Result<T, Error>;
