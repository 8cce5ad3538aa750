//! Wire-level identities and the remote error projection.

use std::any::Any;
use std::fmt;

/// Version byte written at the head of every frame.
pub const PROTOCOL_VERSION: u8 = 1;

/// The only type that crosses a transport.
pub type Buffer = Vec<u8>;

/// Interface version. Ordered by major, then minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
}

impl Version {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::new(1, 0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Registry key: two interfaces are the same iff name and version match
/// exactly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InterfaceIdentity {
    pub name: String,
    pub version: Version,
}

impl InterfaceIdentity {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self { name: name.into(), version }
    }
}

impl fmt::Display for InterfaceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// A responder-side failure, reduced to a type label and a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{type_name}: {message}")]
pub struct RemoteError {
    pub type_name: String,
    pub message: String,
}

impl RemoteError {
    /// Label for a callable that panicked with a string payload.
    pub const PANIC: &'static str = "panic";
    /// Label for a callable that panicked with any other payload.
    pub const UNKNOWN_EXCEPTION: &'static str = "Unknown exception type";
    /// No function is registered under the requested interface identity.
    pub const UNKNOWN_INTERFACE: &'static str = "UnknownInterface";
    /// The interface exists but has no function of that name.
    pub const UNKNOWN_FUNCTION: &'static str = "UnknownFunction";
    /// The responder could not decode the call.
    pub const MALFORMED_CALL: &'static str = "MalformedCall";

    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), message: message.into() }
    }

    /// Projects a returned error onto its type name and display message.
    pub fn from_error<E: fmt::Display>(err: &E) -> Self {
        Self::new(short_type_name::<E>(), err.to_string())
    }

    /// Projects a caught panic payload.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        if let Some(msg) = payload.downcast_ref::<&'static str>() {
            return Self::new(Self::PANIC, *msg);
        }
        match payload.downcast::<String>() {
            Ok(msg) => Self::new(Self::PANIC, *msg),
            Err(_) => Self::new(Self::UNKNOWN_EXCEPTION, Self::UNKNOWN_EXCEPTION),
        }
    }

    pub fn is_kind(&self, type_name: &str) -> bool {
        self.type_name == type_name
    }
}

/// `std::any::type_name` without the leading module path.
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base_end = full.find('<').unwrap_or(full.len());
    match full[..base_end].rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}
