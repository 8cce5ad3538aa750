//! Type tags and encoder scopes.

/// Identifies the type of the encoded value.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    // Fixed-width scalars
    True = 0x01,
    False = 0x02,
    U8 = 0x03,
    U16 = 0x04,
    U32 = 0x05,
    U64 = 0x06,
    I8 = 0x07,
    I16 = 0x08,
    I32 = 0x09,
    I64 = 0x0A,
    F32 = 0x0B,
    F64 = 0x0C,
    Char = 0x0D,

    // Payload-free markers
    Unit = 0x0E,
    OptionNone = 0x0F,

    // Blobs (Tag + u32 Len + Bytes)
    Str = 0x10,
    Bytes = 0x11,

    // Containers (Tag + u32 Len + Body)
    List = 0x20,
    Map = 0x21,

    // Single-payload containers (Tag + u32 Len + Body)
    OptionSome = 0x30,
    ResultOk = 0x31,
    ResultErr = 0x32,
    Variant = 0x33,
}

impl Tag {
    /// Number of data bytes that follow a fixed-width tag, or `None` when the
    /// tag is followed by a u32 length header.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            Tag::True | Tag::False | Tag::Unit | Tag::OptionNone => Some(0),
            Tag::U8 | Tag::I8 => Some(1),
            Tag::U16 | Tag::I16 => Some(2),
            Tag::U32 | Tag::I32 | Tag::F32 | Tag::Char => Some(4),
            Tag::U64 | Tag::I64 | Tag::F64 => Some(8),
            Tag::Str | Tag::Bytes | Tag::List | Tag::Map |
            Tag::OptionSome | Tag::ResultOk | Tag::ResultErr | Tag::Variant => None,
        }
    }
}

impl TryFrom<u8> for Tag {
    type Error = crate::Error;

    fn try_from(byte: u8) -> crate::Result<Self> {
        let tag = match byte {
            0x01 => Tag::True,
            0x02 => Tag::False,
            0x03 => Tag::U8,
            0x04 => Tag::U16,
            0x05 => Tag::U32,
            0x06 => Tag::U64,
            0x07 => Tag::I8,
            0x08 => Tag::I16,
            0x09 => Tag::I32,
            0x0A => Tag::I64,
            0x0B => Tag::F32,
            0x0C => Tag::F64,
            0x0D => Tag::Char,
            0x0E => Tag::Unit,
            0x0F => Tag::OptionNone,
            0x10 => Tag::Str,
            0x11 => Tag::Bytes,
            0x20 => Tag::List,
            0x21 => Tag::Map,
            0x30 => Tag::OptionSome,
            0x31 => Tag::ResultOk,
            0x32 => Tag::ResultErr,
            0x33 => Tag::Variant,
            other => return Err(crate::Error::InvalidTag(other)),
        };
        Ok(tag)
    }
}

/// An open container on the `Encoder` stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Ordered sequence; any number of items.
    List,
    /// Key-value container; only `Tag::Variant` items.
    Map,
    /// Exactly one item.
    Option,
    /// Exactly one item.
    Result,
    /// Exactly one item (the payload) after the name.
    Variant,
}

impl Scope {
    /// Whether the scope must hold exactly one item.
    pub(crate) fn is_single(self) -> bool {
        matches!(self, Scope::Option | Scope::Result | Scope::Variant)
    }
}
