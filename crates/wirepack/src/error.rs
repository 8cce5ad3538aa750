//! Codec failures.

use crate::tag::Scope;
use crate::tag::Tag;

/// Encoding and decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Buffer exhausted while reading.
    #[error("unexpected end of buffer")]
    UnexpectedEnd,
    /// Byte does not correspond to any known tag.
    #[error("invalid tag byte {0:#04x}")]
    InvalidTag(u8),
    /// A valid tag appeared where a different one was required.
    #[error("expected {expected:?}, found {found:?}")]
    UnexpectedTag { expected: Tag, found: Tag },
    /// String or char data is not valid UTF-8 / a valid scalar value.
    #[error("invalid utf-8 data")]
    InvalidUtf8,
    /// Blob or container length exceeds `u32::MAX`.
    #[error("blob of {0} bytes exceeds the u32 length limit")]
    TooLarge(usize),
    /// Closing a scope that is not the innermost open scope.
    #[error("scope mismatch: expected {expected:?}, found {actual:?}")]
    ScopeMismatch { expected: Scope, actual: Scope },
    /// Closing a scope when none is open.
    #[error("no open scope to close")]
    ScopeUnderflow,
    /// Finishing the encoder while scopes are still open.
    #[error("{0} scope(s) still open")]
    ScopeStillOpen(usize),
    /// More than one item written into an Option/Result/Variant.
    #[error("scope {0:?} holds exactly one item")]
    TooManyItems(Scope),
    /// Option/Result/Variant closed without its payload.
    #[error("scope {0:?} closed without a payload")]
    EmptyScope(Scope),
    /// Something other than a Variant written directly into a Map.
    #[error("map entries must be variants")]
    InvalidMapEntry,
    /// A value was fully decoded but bytes remain in its view.
    #[error("{0} trailing byte(s) after value")]
    TrailingBytes(usize),
}

/// Specialized `Result` for wirepack operations.
pub type Result<T> = std::result::Result<T, Error>;
