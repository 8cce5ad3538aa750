//! # Wirerun
//!
//! The runtime half of wirerpc: a function registry, a dispatcher that routes
//! calls to it, and the transports that carry frames between two
//! dispatchers.
//!
//! ## Architecture
//!
//! - **Transport**: moves opaque buffers; [`QueueTransport`] is the in-memory
//!   reference implementation.
//! - **Dispatcher**: owns the [`Registry`] and one transport end. It either
//!   initiates calls ([`Dispatcher::call_remote`]) or serves them on a
//!   dedicated thread ([`Dispatcher::serve`]).
//! - **Bindings**: [`LocalFunction`] and [`RemoteFunction`] give both sides a
//!   typed face.
//!
//! ```no_run
//! use std::sync::Arc;
//! use wirerun::*;
//!
//! # fn main() -> wirerun::Result<()> {
//! let (client_end, server_end) = QueueTransport::pair();
//! let server = Arc::new(Dispatcher::new(server_end));
//! let client = Arc::new(Dispatcher::new(client_end));
//!
//! let math = Interface::new("Math", Version::new(1, 0));
//! let _add = LocalFunction::bind(&server, &math, "Add", |(a, b): (i32, i32)| a + b)?;
//! server.serve()?;
//!
//! let add = RemoteFunction::<(i32, i32), i32>::new(&client, &math, "Add");
//! assert_eq!(add.call((2, 3))?, 5);
//! # Ok(())
//! # }
//! ```

mod binding;
mod config;
mod dispatcher;
mod error;
mod queue;
mod registry;
mod transport;


pub use crate::binding::Interface;
pub use crate::binding::LocalFunction;
pub use crate::binding::RemoteFunction;
pub use crate::config::CallOptions;
pub use crate::config::CancelToken;
pub use crate::config::DEFAULT_CALL_TIMEOUT;
pub use crate::config::DispatcherConfig;
pub use crate::config::PollPolicy;
pub use crate::dispatcher::Dispatcher;
pub use crate::error::Error;
pub use crate::error::Result;
pub use crate::queue::DEFAULT_WAIT;
pub use crate::queue::QueueTransport;
pub use crate::registry::Registry;
pub use crate::transport::Transport;
pub use crate::transport::TransportError;

pub use wirerpc::RemoteError;
pub use wirerpc::Version;
