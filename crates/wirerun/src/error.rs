//! # Error Definitions
//!
//! Everything that can go wrong on either side of a dispatcher. Remote
//! callable failures arrive wrapped as `Rpc(wirerpc::Error::Remote(..))`;
//! use [`Error::remote`] to get at them.

use std::time::Duration;

use wirerpc::InterfaceIdentity;
use wirerpc::RemoteError;

use crate::transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("function {function:?} is already registered on {interface}")]
    FunctionAlreadyRegistered { interface: InterfaceIdentity, function: String },
    #[error("unknown interface {0}")]
    UnknownInterface(InterfaceIdentity),
    #[error("unknown function {function:?} on {interface}")]
    UnknownFunction { interface: InterfaceIdentity, function: String },
    #[error(transparent)]
    Rpc(#[from] wirerpc::Error),
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
    /// No matching reply arrived within the call's timeout.
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    /// The caller's `CancelToken` fired while waiting.
    #[error("call cancelled")]
    Cancelled,
    /// Another caller on this dispatcher is already waiting on this `seq`.
    #[error("a call with seq {0} is already in flight")]
    SeqInFlight(u64),
    #[error("dispatcher is already serving")]
    AlreadyServing,
    /// `call_remote` on a dispatcher that owns the responder side.
    #[error("cannot initiate calls while serving")]
    InvalidMode,
    #[error("failed to spawn dispatch thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl Error {
    /// The responder-side failure, if this error came back over the wire.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Error::Rpc(wirerpc::Error::Remote(err)) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
