//! # Marshaller
//!
//! Converts typed calls and results to and from frames, and runs callables
//! against encoded arguments.
//!
//! ## Invariants
//!
//! 1. **Fresh sequence numbers**: each `encode_call` on one Marshaller gets a
//!    distinct `seq`, starting at 1.
//! 2. **Ordered decode**: arguments are decoded in declared order before the
//!    callable runs; a decode failure is a local error and the callable is
//!    never invoked.
//! 3. **Contained failures**: a returned error or a panic inside the callable
//!    always becomes `ResultEnvelope::Failure`.

use std::convert::Infallible;
use std::fmt::Display;
use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use wirepack::Decoder;
use wirepack::Encoder;
use wirepack::Pack;
use wirepack::Unpack;

use crate::args::ArgList;
use crate::envelope::CallEnvelope;
use crate::envelope::FrameHeader;
use crate::envelope::ReplyEnvelope;
use crate::envelope::ResultEnvelope;
use crate::envelope::encode_reply;
use crate::error::Error;
use crate::error::Result;
use crate::types::Buffer;
use crate::types::InterfaceIdentity;
use crate::types::RemoteError;

/// A registered function, erased to bytes in and an outcome out.
///
/// `Err` is reserved for local marshalling failures (the arguments could not
/// be decoded, or the return value could not be encoded).
pub type Callable = Arc<dyn Fn(&[u8]) -> Result<ResultEnvelope> + Send + Sync>;

/// Builds a `Callable` from an infallible function.
pub fn skeleton<A, R, F>(f: F) -> Callable
where
    A: ArgList + 'static,
    R: Pack + 'static,
    F: Fn(A) -> R + Send + Sync + 'static,
{
    Arc::new(move |arguments: &[u8]| {
        Marshaller::invoke_callable(arguments, |args: A| Ok::<R, Infallible>(f(args)))
    })
}

/// Builds a `Callable` from a function whose `Err` is sent back as a
/// remote error.
pub fn fallible_skeleton<A, R, E, F>(f: F) -> Callable
where
    A: ArgList + 'static,
    R: Pack + 'static,
    E: Display + 'static,
    F: Fn(A) -> std::result::Result<R, E> + Send + Sync + 'static,
{
    Arc::new(move |arguments: &[u8]| Marshaller::invoke_callable(arguments, |args: A| f(args)))
}

#[derive(Debug)]
pub struct Marshaller {
    next_seq: AtomicU64,
}

impl Default for Marshaller {
    fn default() -> Self {
        Self::new()
    }
}

impl Marshaller {
    pub fn new() -> Self {
        Self { next_seq: AtomicU64::new(1) }
    }

    fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Encodes an argument tuple as a standalone `List` payload.
    pub fn encode_args<A: ArgList>(args: &A) -> Result<Buffer> {
        let mut enc = Encoder::new();
        args.pack_args(&mut enc)?;
        Ok(enc.finish()?)
    }

    /// Frames a call with the current protocol version and a fresh `seq`.
    pub fn encode_call<A: ArgList>(
        &self,
        interface: &InterfaceIdentity,
        function: &str,
        args: &A,
    ) -> Result<Buffer> {
        CallEnvelope {
            seq: self.next_seq(),
            interface: interface.clone(),
            function: function.to_owned(),
            arguments: Self::encode_args(args)?,
        }
        .encode()
    }

    /// Decodes the call header. The arguments are left encoded.
    ///
    /// # Errors
    /// `Error::ProtocolVersionMismatch` if the version byte differs; no
    /// further decoding is attempted.
    pub fn decode_call(&self, bytes: &[u8]) -> Result<CallEnvelope> {
        CallEnvelope::decode(bytes)
    }

    /// Decodes `arguments` as `A`, runs `f` and captures its outcome.
    pub fn invoke_callable<A, R, E, F>(arguments: &[u8], f: F) -> Result<ResultEnvelope>
    where
        A: ArgList,
        R: Pack,
        E: Display,
        F: FnOnce(A) -> std::result::Result<R, E>,
    {
        let mut dec = Decoder::new(arguments);
        let args = A::unpack_args(&mut dec)?;
        dec.finish()?;

        match catch_unwind(AssertUnwindSafe(|| f(args))) {
            Ok(Ok(value)) => Ok(ResultEnvelope::Success(wirepack::to_bytes(&value)?)),
            Ok(Err(err)) => Ok(ResultEnvelope::Failure(RemoteError::from_error(&err))),
            Err(payload) => Ok(ResultEnvelope::Failure(RemoteError::from_panic(payload))),
        }
    }

    /// Frames a result as the reply to call `seq`.
    pub fn encode_result(&self, seq: u64, result: &ResultEnvelope) -> Result<Buffer> {
        encode_reply(seq, result)
    }

    pub fn decode_reply(&self, bytes: &[u8]) -> Result<ReplyEnvelope> {
        ReplyEnvelope::decode(bytes)
    }

    /// Decodes a reply into the caller's return type.
    ///
    /// # Errors
    /// `Error::Remote` carrying the remote type label and message when the
    /// reply is a `Failure`.
    pub fn decode_result<R: Unpack>(&self, bytes: &[u8]) -> Result<R> {
        match self.decode_reply(bytes)?.result {
            ResultEnvelope::Success(value) => Ok(wirepack::from_bytes(&value)?),
            ResultEnvelope::Failure(err) => Err(Error::Remote(err)),
        }
    }

    /// Reads the kind and `seq` of a frame without decoding the rest.
    pub fn peek(&self, bytes: &[u8]) -> Result<FrameHeader> {
        FrameHeader::peek(bytes)
    }

    pub fn peek_seq(&self, bytes: &[u8]) -> Result<u64> {
        Ok(self.peek(bytes)?.seq)
    }
}
