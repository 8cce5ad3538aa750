//! # Protocol Frames
//!
//! Defines the structure of the RPC envelope (Call vs Reply).
//!
//! ## Invariants
//! - **Panic Safety**: all decoding paths return `Result`, never panicking on
//!   unknown data.
//! - **Forward Compatibility**: unknown map keys are skipped.
//! - **Version First**: the version byte is checked before any TLV is read.

use wirepack::Decoder;
use wirepack::Encoder;
use wirepack::MapIter;

use crate::error::Error;
use crate::error::Result;
use crate::types::Buffer;
use crate::types::InterfaceIdentity;
use crate::types::PROTOCOL_VERSION;
use crate::types::RemoteError;
use crate::types::Version;

/// A decoded call. `arguments` stays encoded until the parameter types are
/// known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallEnvelope {
    pub seq: u64,
    pub interface: InterfaceIdentity,
    pub function: String,
    pub arguments: Buffer,
}

/// Outcome of one invocation. `Success` always carries an encoded value;
/// a function without a return value encodes `()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultEnvelope {
    Success(Buffer),
    Failure(RemoteError),
}

/// A decoded reply, correlated with its call by `seq`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyEnvelope {
    pub seq: u64,
    pub result: ResultEnvelope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Call,
    Reply,
}

/// Just enough of a frame to route it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub kind: FrameKind,
    pub seq: u64,
}

// ============================================================================
//  ENCODING
// ============================================================================

fn frame_encoder() -> Result<Encoder> {
    let mut enc = Encoder::new();
    enc.raw(&[PROTOCOL_VERSION])?;
    Ok(enc)
}

impl CallEnvelope {
    pub fn encode(&self) -> Result<Buffer> {
        let mut enc = frame_encoder()?;
        enc.variant_begin("Call")?;
        enc.map_begin()?;
        enc.entry("seq", |e| e.u64(self.seq))?;
        enc.entry("interface", |e| e.str(&self.interface.name))?;
        enc.entry("major", |e| e.u16(self.interface.version.major))?;
        enc.entry("minor", |e| e.u16(self.interface.version.minor))?;
        enc.entry("function", |e| e.str(&self.function))?;
        enc.entry("args", |e| e.bytes(&self.arguments))?;
        enc.map_end()?;
        enc.variant_end()?;
        Ok(enc.finish()?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let fields = open_frame(bytes, FrameKind::Call)?;

        let mut seq = None;
        let mut name = None;
        let mut major = None;
        let mut minor = None;
        let mut function = None;
        let mut arguments = None;

        for entry in fields {
            let (key, mut val) = entry?;
            match key {
                "seq" => seq = Some(single(val, Decoder::u64)?),
                "interface" => name = Some(single(val, Decoder::str)?),
                "major" => major = Some(single(val, Decoder::u16)?),
                "minor" => minor = Some(single(val, Decoder::u16)?),
                "function" => function = Some(single(val, Decoder::str)?),
                "args" => arguments = Some(single(val, Decoder::bytes)?),
                _ => val.skip()?,
            }
        }

        let version = Version::new(required(major, "major")?, required(minor, "minor")?);
        Ok(CallEnvelope {
            seq: required(seq, "seq")?,
            interface: InterfaceIdentity::new(required(name, "interface")?, version),
            function: required(function, "function")?.to_owned(),
            arguments: required(arguments, "args")?.to_vec(),
        })
    }
}

impl ReplyEnvelope {
    pub fn encode(&self) -> Result<Buffer> {
        encode_reply(self.seq, &self.result)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut dec = frame_payload(bytes, FrameKind::Reply)?;
        let (status, body) = match dec.result()? {
            Ok(body) => (true, body),
            Err(body) => (false, body),
        };
        let fields = enter_map(body)?;

        let mut seq = None;
        let mut value = None;
        let mut type_name = None;
        let mut message = None;

        for entry in fields {
            let (key, mut val) = entry?;
            match key {
                "seq" => seq = Some(single(val, Decoder::u64)?),
                "value" => value = Some(single(val, Decoder::bytes)?),
                "type" => type_name = Some(single(val, Decoder::str)?),
                "message" => message = Some(single(val, Decoder::str)?),
                _ => val.skip()?,
            }
        }

        let result = if status {
            ResultEnvelope::Success(required(value, "value")?.to_vec())
        } else {
            ResultEnvelope::Failure(RemoteError::new(
                required(type_name, "type")?,
                required(message, "message")?,
            ))
        };
        Ok(ReplyEnvelope { seq: required(seq, "seq")?, result })
    }
}

/// Encodes a reply without taking ownership of the result.
pub(crate) fn encode_reply(seq: u64, result: &ResultEnvelope) -> Result<Buffer> {
    let mut enc = frame_encoder()?;
    enc.variant_begin("Reply")?;
    match result {
        ResultEnvelope::Success(value) => {
            enc.ok_begin()?;
            enc.map_begin()?;
            enc.entry("seq", |e| e.u64(seq))?;
            enc.entry("value", |e| e.bytes(value))?;
            enc.map_end()?;
            enc.ok_end()?;
        }
        ResultEnvelope::Failure(err) => {
            enc.err_begin()?;
            enc.map_begin()?;
            enc.entry("seq", |e| e.u64(seq))?;
            enc.entry("type", |e| e.str(&err.type_name))?;
            enc.entry("message", |e| e.str(&err.message))?;
            enc.map_end()?;
            enc.err_end()?;
        }
    }
    enc.variant_end()?;
    Ok(enc.finish()?)
}

// ============================================================================
//  DECODING
// ============================================================================

impl FrameHeader {
    /// Reads the frame kind and sequence number, skipping everything else.
    pub fn peek(bytes: &[u8]) -> Result<Self> {
        let mut dec = versioned(bytes)?;
        let (name, mut body) = dec.variant()?;
        let kind = frame_kind(name)?;
        let fields = match kind {
            FrameKind::Call => body.map()?,
            FrameKind::Reply => match body.result()? {
                Ok(mut inner) | Err(mut inner) => inner.map()?,
            },
        };
        for entry in fields {
            let (key, val) = entry?;
            if key == "seq" {
                return Ok(FrameHeader { kind, seq: single(val, Decoder::u64)? });
            }
        }
        Err(Error::ProtocolViolation("missing seq".into()))
    }
}

/// Checks the version byte and returns the TLV stream behind it.
fn versioned(bytes: &[u8]) -> Result<Decoder<'_>> {
    let (&found, rest) = bytes
        .split_first()
        .ok_or_else(|| Error::ProtocolViolation("empty frame".into()))?;
    if found != PROTOCOL_VERSION {
        return Err(Error::ProtocolVersionMismatch { expected: PROTOCOL_VERSION, found });
    }
    Ok(Decoder::new(rest))
}

fn frame_kind(name: &str) -> Result<FrameKind> {
    match name {
        "Call" => Ok(FrameKind::Call),
        "Reply" => Ok(FrameKind::Reply),
        other => Err(Error::ProtocolViolation(format!("unknown frame {other:?}"))),
    }
}

/// Opens a frame of the expected kind and returns its payload view.
fn frame_payload(bytes: &[u8], expected: FrameKind) -> Result<Decoder<'_>> {
    let mut dec = versioned(bytes)?;
    let (name, body) = dec.variant()?;
    dec.finish()?;
    let kind = frame_kind(name)?;
    if kind != expected {
        return Err(Error::ProtocolViolation(format!("expected {expected:?} frame, found {kind:?}")));
    }
    Ok(body)
}

fn open_frame(bytes: &[u8], expected: FrameKind) -> Result<MapIter<'_>> {
    enter_map(frame_payload(bytes, expected)?)
}

fn enter_map(mut body: Decoder<'_>) -> Result<MapIter<'_>> {
    let fields = body.map()?;
    body.finish()?;
    Ok(fields)
}

/// Reads the one item an entry carries.
fn single<'a, T>(
    mut val: Decoder<'a>,
    read: impl FnOnce(&mut Decoder<'a>) -> wirepack::Result<T>,
) -> Result<T> {
    let item = read(&mut val)?;
    val.finish()?;
    Ok(item)
}

fn required<T>(field: Option<T>, name: &str) -> Result<T> {
    field.ok_or_else(|| Error::ProtocolViolation(format!("missing {name}")))
}
