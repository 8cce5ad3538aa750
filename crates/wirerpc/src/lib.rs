//! # WireRPC
//!
//! Versioned call and reply envelopes over wirepack, plus the typed glue that
//! turns Rust functions into byte-level callables.
//!
//! ## Frames
//!
//! Every frame starts with a raw protocol version byte, followed by one
//! wirepack item:
//!
//! ```text
//! Call  = [v] Variant("Call",  Map{ seq, interface, major, minor, function, args: Bytes })
//! Reply = [v] Variant("Reply", Ok(Map{ seq, value: Bytes })
//!                            | Err(Map{ seq, type, message }))
//! ```
//!
//! Arguments travel as a nested `List[arg0, arg1, ...]` that stays opaque
//! until the receiving side knows the parameter types.
//!
//! ## Invariants
//!
//! - **Version gate**: a frame whose version byte differs from
//!   [`PROTOCOL_VERSION`] is rejected outright, never decoded best-effort.
//! - **Forward compatibility**: unknown map keys are skipped.
//! - **Remote errors are lossy**: a responder-side failure crosses the wire
//!   as a `(type, message)` pair and comes back as [`Error::Remote`].

mod args;
mod envelope;
mod error;
mod marshaller;
mod types;


pub use crate::args::ArgList;
pub use crate::envelope::CallEnvelope;
pub use crate::envelope::FrameHeader;
pub use crate::envelope::FrameKind;
pub use crate::envelope::ReplyEnvelope;
pub use crate::envelope::ResultEnvelope;
pub use crate::error::Error;
pub use crate::error::Result;
pub use crate::marshaller::Callable;
pub use crate::marshaller::Marshaller;
pub use crate::marshaller::fallible_skeleton;
pub use crate::marshaller::skeleton;
pub use crate::types::Buffer;
pub use crate::types::InterfaceIdentity;
pub use crate::types::PROTOCOL_VERSION;
pub use crate::types::RemoteError;
pub use crate::types::Version;
