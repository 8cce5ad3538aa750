//! # Encoder
//!
//! A state-machine driven writer. Open containers live on a stack so length
//! headers can be back-patched when the container closes.
//!
//! ## Invariants
//!
//! 1. **Map scopes** accept only `Variant` items (key/value pairs).
//! 2. **Single scopes** (Option, Result, Variant) hold exactly one item.
//! 3. **Finish** is only possible once every scope has been closed.

use crate::error::Error;
use crate::error::Result;
use crate::tag::Scope;
use crate::tag::Tag;

/// A container that has been opened but not yet closed.
struct Open {
    /// Offset of the first body byte; the u32 length sits right before it.
    body: usize,
    scope: Scope,
    items: usize,
}

/// Generates writers for the little-endian numeric scalars.
macro_rules! numeric_writers {
    ($($(#[$doc:meta])* $name:ident($ty:ty) => $tag:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(&mut self, v: $ty) -> Result<()> {
                self.open_item(Tag::$tag)?;
                self.buf.extend_from_slice(&v.to_le_bytes());
                self.close_item();
                Ok(())
            }
        )*
    };
}

/// Bounded wirepack writer.
pub struct Encoder {
    buf: Vec<u8>,
    open: Vec<Open>,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    /// Creates an encoder with a small initial buffer.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Creates an encoder with the given initial buffer capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            open: Vec::with_capacity(8),
        }
    }

    /// Appends raw bytes outside of any scope.
    ///
    /// Used for fixed headers that precede the TLV stream.
    ///
    /// # Errors
    /// Returns `Error::ScopeStillOpen` if a container is open.
    pub fn raw(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.open.is_empty() {
            return Err(Error::ScopeStillOpen(self.open.len()));
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Consumes the encoder and returns the encoded bytes.
    ///
    /// # Errors
    /// Returns `Error::ScopeStillOpen` if a container is still open.
    pub fn finish(self) -> Result<Vec<u8>> {
        if !self.open.is_empty() {
            return Err(Error::ScopeStillOpen(self.open.len()));
        }
        Ok(self.buf)
    }

    /// Bytes written so far, including unfinished containers.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn admit(&self, tag: Tag) -> Result<()> {
        let Some(top) = self.open.last() else {
            return Ok(());
        };
        match top.scope {
            Scope::List => Ok(()),
            Scope::Map if tag == Tag::Variant => Ok(()),
            Scope::Map => Err(Error::InvalidMapEntry),
            single if top.items >= 1 => Err(Error::TooManyItems(single)),
            _ => Ok(()),
        }
    }

    fn open_item(&mut self, tag: Tag) -> Result<()> {
        self.admit(tag)?;
        self.buf.push(tag as u8);
        Ok(())
    }

    fn close_item(&mut self) {
        if let Some(top) = self.open.last_mut() {
            top.items += 1;
        }
    }

    fn blob(&mut self, tag: Tag, data: &[u8]) -> Result<()> {
        let len = u32::try_from(data.len()).map_err(|_| Error::TooLarge(data.len()))?;
        self.open_item(tag)?;
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(data);
        self.close_item();
        Ok(())
    }

    fn begin(&mut self, tag: Tag, scope: Scope) -> Result<()> {
        self.open_item(tag)?;
        self.buf.extend_from_slice(&[0; 4]);
        self.open.push(Open { body: self.buf.len(), scope, items: 0 });
        Ok(())
    }

    fn end(&mut self, expected: Scope) -> Result<()> {
        let top = self.open.last().ok_or(Error::ScopeUnderflow)?;
        if top.scope != expected {
            return Err(Error::ScopeMismatch { expected, actual: top.scope });
        }
        if top.scope.is_single() && top.items == 0 {
            return Err(Error::EmptyScope(top.scope));
        }

        let body = top.body;
        let body_len = self.buf.len() - body;
        let len = u32::try_from(body_len).map_err(|_| Error::TooLarge(body_len))?;
        self.buf[body - 4..body].copy_from_slice(&len.to_le_bytes());
        self.open.pop();
        self.close_item();
        Ok(())
    }

    /// Encodes a boolean.
    pub fn bool(&mut self, v: bool) -> Result<()> {
        self.open_item(if v { Tag::True } else { Tag::False })?;
        self.close_item();
        Ok(())
    }

    numeric_writers! {
        /// Encodes a `u8`.
        u8(u8) => U8;
        /// Encodes a `u16`.
        u16(u16) => U16;
        /// Encodes a `u32`.
        u32(u32) => U32;
        /// Encodes a `u64`.
        u64(u64) => U64;
        /// Encodes an `i8`.
        i8(i8) => I8;
        /// Encodes an `i16`.
        i16(i16) => I16;
        /// Encodes an `i32`.
        i32(i32) => I32;
        /// Encodes an `i64`.
        i64(i64) => I64;
        /// Encodes an `f32`.
        f32(f32) => F32;
        /// Encodes an `f64`.
        f64(f64) => F64;
    }

    /// Encodes a char as its u32 scalar value.
    pub fn char(&mut self, v: char) -> Result<()> {
        self.open_item(Tag::Char)?;
        self.buf.extend_from_slice(&u32::from(v).to_le_bytes());
        self.close_item();
        Ok(())
    }

    /// Encodes unit `()`.
    pub fn unit(&mut self) -> Result<()> {
        self.open_item(Tag::Unit)?;
        self.close_item();
        Ok(())
    }

    /// Encodes `Option::None`.
    pub fn none(&mut self) -> Result<()> {
        self.open_item(Tag::OptionNone)?;
        self.close_item();
        Ok(())
    }

    /// Encodes a UTF-8 string blob.
    pub fn str(&mut self, v: &str) -> Result<()> {
        self.blob(Tag::Str, v.as_bytes())
    }

    /// Encodes a raw byte blob.
    pub fn bytes(&mut self, v: &[u8]) -> Result<()> {
        self.blob(Tag::Bytes, v)
    }

    /// Begins a List. Close with `list_end()`.
    pub fn list_begin(&mut self) -> Result<()> { self.begin(Tag::List, Scope::List) }
    /// Ends a List.
    pub fn list_end(&mut self) -> Result<()> { self.end(Scope::List) }

    /// Begins a Map. Only `variant_begin()` may write into it directly.
    pub fn map_begin(&mut self) -> Result<()> { self.begin(Tag::Map, Scope::Map) }
    /// Ends a Map.
    pub fn map_end(&mut self) -> Result<()> { self.end(Scope::Map) }

    /// Begins `Option::Some`. Exactly one item must follow.
    pub fn some_begin(&mut self) -> Result<()> { self.begin(Tag::OptionSome, Scope::Option) }
    /// Ends `Option::Some`.
    pub fn some_end(&mut self) -> Result<()> { self.end(Scope::Option) }

    /// Begins `Result::Ok`. Exactly one item must follow.
    pub fn ok_begin(&mut self) -> Result<()> { self.begin(Tag::ResultOk, Scope::Result) }
    /// Ends `Result::Ok`.
    pub fn ok_end(&mut self) -> Result<()> { self.end(Scope::Result) }

    /// Begins `Result::Err`. Exactly one item must follow.
    pub fn err_begin(&mut self) -> Result<()> { self.begin(Tag::ResultErr, Scope::Result) }
    /// Ends `Result::Err`.
    pub fn err_end(&mut self) -> Result<()> { self.end(Scope::Result) }

    /// Begins a named Variant and writes its name.
    ///
    /// The name is metadata: exactly one payload item must still follow.
    pub fn variant_begin(&mut self, name: &str) -> Result<()> {
        self.begin(Tag::Variant, Scope::Variant)?;
        self.str(name)?;
        if let Some(top) = self.open.last_mut() {
            top.items = 0;
        }
        Ok(())
    }
    /// Ends a Variant.
    pub fn variant_end(&mut self) -> Result<()> { self.end(Scope::Variant) }

    /// Writes a whole `name => payload` map entry.
    pub fn entry<F>(&mut self, name: &str, payload: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.variant_begin(name)?;
        payload(self)?;
        self.variant_end()
    }
}
