//! # Typed Values
//!
//! `Pack` and `Unpack` map Rust types onto the wirepack stream. Decoding is
//! driven entirely by the static type, so the receiver must know what it
//! expects to read.
//!
//! | Rust                 | Wire                    |
//! |----------------------|-------------------------|
//! | `bool`, ints, floats | scalar                  |
//! | `char`               | `Char`                  |
//! | `()`                 | `Unit`                  |
//! | `String`, `&str`     | `Str`                   |
//! | `Blob`               | `Bytes`                 |
//! | `Vec<T>`             | `List`                  |
//! | tuples (1..=8)       | `List` of fixed length  |
//! | `Option<T>`          | `OptionNone` / `OptionSome` |
//! | `BTreeMap<String, V>`| `Map`                   |

use std::collections::BTreeMap;

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::Error;
use crate::error::Result;

/// A value that can be written to an `Encoder` as exactly one item.
pub trait Pack {
    fn pack(&self, enc: &mut Encoder) -> Result<()>;
}

/// A value that can be read back from exactly one item.
pub trait Unpack: Sized {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self>;
}

/// Packs a single value into a standalone buffer.
pub fn to_bytes<T: Pack + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut enc = Encoder::new();
    value.pack(&mut enc)?;
    enc.finish()
}

/// Unpacks a single value, rejecting trailing bytes.
pub fn from_bytes<T: Unpack>(bytes: &[u8]) -> Result<T> {
    let mut dec = Decoder::new(bytes);
    let value = T::unpack(&mut dec)?;
    dec.finish()?;
    Ok(value)
}

/// Binds a scalar type to its encoder and decoder methods.
macro_rules! scalar {
    ($($ty:ty => $method:ident),* $(,)?) => {
        $(
            impl Pack for $ty {
                fn pack(&self, enc: &mut Encoder) -> Result<()> {
                    enc.$method(*self)
                }
            }

            impl Unpack for $ty {
                fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
                    dec.$method()
                }
            }
        )*
    };
}

scalar! {
    bool => bool,
    u8 => u8,
    u16 => u16,
    u32 => u32,
    u64 => u64,
    i8 => i8,
    i16 => i16,
    i32 => i32,
    i64 => i64,
    f32 => f32,
    f64 => f64,
    char => char,
}

impl Pack for () {
    fn pack(&self, enc: &mut Encoder) -> Result<()> {
        enc.unit()
    }
}

impl Unpack for () {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        dec.unit()
    }
}

impl Pack for str {
    fn pack(&self, enc: &mut Encoder) -> Result<()> {
        enc.str(self)
    }
}

impl Pack for String {
    fn pack(&self, enc: &mut Encoder) -> Result<()> {
        enc.str(self)
    }
}

impl Unpack for String {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(dec.str()?.to_owned())
    }
}

impl<T: Pack + ?Sized> Pack for &T {
    fn pack(&self, enc: &mut Encoder) -> Result<()> {
        (**self).pack(enc)
    }
}

impl<T: Pack + ?Sized> Pack for Box<T> {
    fn pack(&self, enc: &mut Encoder) -> Result<()> {
        (**self).pack(enc)
    }
}

impl<T: Unpack> Unpack for Box<T> {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        T::unpack(dec).map(Box::new)
    }
}

/// An opaque byte string, packed as a single `Bytes` blob instead of a list
/// of `u8` items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Blob(pub Vec<u8>);

impl Pack for Blob {
    fn pack(&self, enc: &mut Encoder) -> Result<()> {
        enc.bytes(&self.0)
    }
}

impl Unpack for Blob {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(Blob(dec.bytes()?.to_vec()))
    }
}

impl<T: Pack> Pack for [T] {
    fn pack(&self, enc: &mut Encoder) -> Result<()> {
        enc.list_begin()?;
        for item in self {
            item.pack(enc)?;
        }
        enc.list_end()
    }
}

impl<T: Pack> Pack for Vec<T> {
    fn pack(&self, enc: &mut Encoder) -> Result<()> {
        self.as_slice().pack(enc)
    }
}

impl<T: Unpack> Unpack for Vec<T> {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        let mut out = Vec::new();
        for item in dec.list()? {
            out.push(unpack_whole(item?)?);
        }
        Ok(out)
    }
}

impl<T: Pack> Pack for Option<T> {
    fn pack(&self, enc: &mut Encoder) -> Result<()> {
        match self {
            Some(value) => {
                enc.some_begin()?;
                value.pack(enc)?;
                enc.some_end()
            }
            None => enc.none(),
        }
    }
}

impl<T: Unpack> Unpack for Option<T> {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        dec.option()?.map(unpack_whole).transpose()
    }
}

impl<V: Pack> Pack for BTreeMap<String, V> {
    fn pack(&self, enc: &mut Encoder) -> Result<()> {
        enc.map_begin()?;
        for (key, value) in self {
            enc.entry(key, |enc| value.pack(enc))?;
        }
        enc.map_end()
    }
}

impl<V: Unpack> Unpack for BTreeMap<String, V> {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        let mut out = BTreeMap::new();
        for entry in dec.map()? {
            let (key, body) = entry?;
            out.insert(key.to_owned(), unpack_whole(body)?);
        }
        Ok(out)
    }
}

/// Unpacks a value that must occupy the entire view.
fn unpack_whole<T: Unpack>(mut view: Decoder<'_>) -> Result<T> {
    let value = T::unpack(&mut view)?;
    view.finish()?;
    Ok(value)
}

/// Tuples are fixed-length lists.
macro_rules! tuple {
    ($($name:ident . $idx:tt),+) => {
        impl<$($name: Pack),+> Pack for ($($name,)+) {
            fn pack(&self, enc: &mut Encoder) -> Result<()> {
                enc.list_begin()?;
                $( self.$idx.pack(enc)?; )+
                enc.list_end()
            }
        }

        impl<$($name: Unpack),+> Unpack for ($($name,)+) {
            fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
                let mut items = dec.list()?;
                let value = ($(
                    unpack_whole::<$name>(items.next().ok_or(Error::UnexpectedEnd)??)?,
                )+);
                match items.next() {
                    None => Ok(value),
                    Some(_) => Err(Error::TrailingBytes(items.count_remaining()? + 1)),
                }
            }
        }
    };
}

tuple!(A.0);
tuple!(A.0, B.1);
tuple!(A.0, B.1, C.2);
tuple!(A.0, B.1, C.2, D.3);
tuple!(A.0, B.1, C.2, D.3, E.4);
tuple!(A.0, B.1, C.2, D.3, E.4, F.5);
tuple!(A.0, B.1, C.2, D.3, E.4, F.5, G.6);
tuple!(A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7);
