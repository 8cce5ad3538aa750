//! # Decoder
//!
//! Zero-copy, bounds-checked views over an encoded buffer. Reading advances
//! the view; entering a container yields a new `Decoder` limited to its body.

use crate::error::Error;
use crate::error::Result;
use crate::tag::Tag;

/// Generates readers for the little-endian numeric scalars.
macro_rules! numeric_readers {
    ($($(#[$doc:meta])* $name:ident -> $ty:ty => $tag:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(&mut self) -> Result<$ty> {
                self.expect(Tag::$tag)?;
                let raw = self.take_array::<{ std::mem::size_of::<$ty>() }>()?;
                Ok(<$ty>::from_le_bytes(raw))
            }
        )*
    };
}

/// A cursor over an encoded byte slice.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    rest: &'a [u8],
}

impl<'a> Decoder<'a> {
    /// Creates a decoder over the slice.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { rest: buf }
    }

    /// Bytes left in this view.
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    /// Fails unless the view has been fully consumed.
    pub fn finish(&self) -> Result<()> {
        match self.rest.len() {
            0 => Ok(()),
            n => Err(Error::TrailingBytes(n)),
        }
    }

    /// Peeks the next tag without advancing.
    pub fn peek_tag(&self) -> Result<Tag> {
        let byte = *self.rest.first().ok_or(Error::UnexpectedEnd)?;
        Tag::try_from(byte)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.rest.len() {
            return Err(Error::UnexpectedEnd);
        }
        let (head, tail) = self.rest.split_at(n);
        self.rest = tail;
        Ok(head)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn take_len(&mut self) -> Result<usize> {
        Ok(u32::from_le_bytes(self.take_array::<4>()?) as usize)
    }

    fn expect(&mut self, expected: Tag) -> Result<()> {
        let found = self.peek_tag()?;
        if found != expected {
            return Err(Error::UnexpectedTag { expected, found });
        }
        self.rest = &self.rest[1..];
        Ok(())
    }

    fn enter(&mut self, expected: Tag) -> Result<Decoder<'a>> {
        self.expect(expected)?;
        let len = self.take_len()?;
        Ok(Decoder::new(self.take(len)?))
    }

    /// Skips the next item, including any nested children.
    pub fn skip(&mut self) -> Result<()> {
        let tag = self.peek_tag()?;
        self.take(1)?;
        let len = match tag.fixed_width() {
            Some(width) => width,
            None => self.take_len()?,
        };
        self.take(len)?;
        Ok(())
    }

    /// Splits off the next item as its own view, tag included.
    pub fn next_item(&mut self) -> Result<Decoder<'a>> {
        let mut scan = self.clone();
        scan.skip()?;
        let len = self.rest.len() - scan.rest.len();
        Ok(Decoder::new(self.take(len)?))
    }

    /// Decodes a bool.
    pub fn bool(&mut self) -> Result<bool> {
        match self.peek_tag()? {
            Tag::True => { self.take(1)?; Ok(true) }
            Tag::False => { self.take(1)?; Ok(false) }
            found => Err(Error::UnexpectedTag { expected: Tag::True, found }),
        }
    }

    numeric_readers! {
        /// Decodes a `u8`.
        u8 -> u8 => U8;
        /// Decodes a `u16`.
        u16 -> u16 => U16;
        /// Decodes a `u32`.
        u32 -> u32 => U32;
        /// Decodes a `u64`.
        u64 -> u64 => U64;
        /// Decodes an `i8`.
        i8 -> i8 => I8;
        /// Decodes an `i16`.
        i16 -> i16 => I16;
        /// Decodes an `i32`.
        i32 -> i32 => I32;
        /// Decodes an `i64`.
        i64 -> i64 => I64;
        /// Decodes an `f32`.
        f32 -> f32 => F32;
        /// Decodes an `f64`.
        f64 -> f64 => F64;
    }

    /// Decodes a char.
    pub fn char(&mut self) -> Result<char> {
        self.expect(Tag::Char)?;
        let raw = u32::from_le_bytes(self.take_array::<4>()?);
        char::from_u32(raw).ok_or(Error::InvalidUtf8)
    }

    /// Decodes unit `()`.
    pub fn unit(&mut self) -> Result<()> {
        self.expect(Tag::Unit)
    }

    /// Decodes a string slice.
    pub fn str(&mut self) -> Result<&'a str> {
        self.expect(Tag::Str)?;
        let len = self.take_len()?;
        std::str::from_utf8(self.take(len)?).map_err(|_| Error::InvalidUtf8)
    }

    /// Decodes a byte slice.
    pub fn bytes(&mut self) -> Result<&'a [u8]> {
        self.expect(Tag::Bytes)?;
        let len = self.take_len()?;
        self.take(len)
    }

    /// Enters a List.
    pub fn list(&mut self) -> Result<ListIter<'a>> {
        Ok(ListIter { body: self.enter(Tag::List)? })
    }

    /// Enters a Map.
    pub fn map(&mut self) -> Result<MapIter<'a>> {
        Ok(MapIter { body: self.enter(Tag::Map)? })
    }

    /// Decodes an Option; `Some` carries a view of the payload.
    pub fn option(&mut self) -> Result<Option<Decoder<'a>>> {
        match self.peek_tag()? {
            Tag::OptionNone => { self.take(1)?; Ok(None) }
            Tag::OptionSome => Ok(Some(self.enter(Tag::OptionSome)?)),
            found => Err(Error::UnexpectedTag { expected: Tag::OptionSome, found }),
        }
    }

    /// Decodes a Result; either side carries a view of the payload.
    pub fn result(&mut self) -> Result<std::result::Result<Decoder<'a>, Decoder<'a>>> {
        match self.peek_tag()? {
            Tag::ResultOk => Ok(Ok(self.enter(Tag::ResultOk)?)),
            Tag::ResultErr => Ok(Err(self.enter(Tag::ResultErr)?)),
            found => Err(Error::UnexpectedTag { expected: Tag::ResultOk, found }),
        }
    }

    /// Decodes a Variant into `(name, payload)`.
    pub fn variant(&mut self) -> Result<(&'a str, Decoder<'a>)> {
        let mut body = self.enter(Tag::Variant)?;
        let name = body.str()?;
        Ok((name, body))
    }
}

/// Items of a List, each as its own view.
///
/// Iteration stops after the first error.
#[derive(Debug)]
pub struct ListIter<'a> {
    body: Decoder<'a>,
}

impl<'a> ListIter<'a> {
    /// Counts the items left without decoding them.
    pub fn count_remaining(&self) -> Result<usize> {
        let mut scan = self.body.clone();
        let mut count = 0;
        while !scan.is_empty() {
            scan.skip()?;
            count += 1;
        }
        Ok(count)
    }
}

impl<'a> Iterator for ListIter<'a> {
    type Item = Result<Decoder<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.body.is_empty() {
            return None;
        }
        let item = self.body.next_item();
        if item.is_err() {
            self.body = Decoder::new(&[]);
        }
        Some(item)
    }
}

/// Key/value entries of a Map.
///
/// Iteration stops after the first error.
#[derive(Debug)]
pub struct MapIter<'a> {
    body: Decoder<'a>,
}

impl<'a> Iterator for MapIter<'a> {
    type Item = Result<(&'a str, Decoder<'a>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.body.is_empty() {
            return None;
        }
        let entry = self.body.variant();
        if entry.is_err() {
            self.body = Decoder::new(&[]);
        }
        Some(entry)
    }
}
