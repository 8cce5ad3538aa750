//! # Wirepack
//!
//! A small, bounded, schema-agnostic binary codec. Every buffer that crosses a
//! wirerpc transport is a wirepack stream.
//!
//! ## Format
//!
//! - **Scalars**: `[Tag: 1b][Data: N]`
//! - **Blobs**: `[Tag: 1b][Len: 4b][Data: Len]`
//! - **Containers**: `[Tag: 1b][Len: 4b][Body: Len]`
//!
//! All integers are little-endian. Because every item announces its own size,
//! a reader can skip values it does not understand.
//!
//! ## Layers
//!
//! - [`Encoder`] / [`Decoder`]: the raw, untyped stream.
//! - [`Pack`] / [`Unpack`]: typed Rust values on top of the stream. The type
//!   drives decoding, so the stream itself carries no schema.

mod decoder;
mod encoder;
mod error;
mod pack;
mod tag;


pub use crate::decoder::Decoder;
pub use crate::decoder::ListIter;
pub use crate::decoder::MapIter;
pub use crate::encoder::Encoder;
pub use crate::error::Error;
pub use crate::error::Result;
pub use crate::pack::Blob;
pub use crate::pack::Pack;
pub use crate::pack::Unpack;
pub use crate::pack::from_bytes;
pub use crate::pack::to_bytes;
pub use crate::tag::Scope;
pub use crate::tag::Tag;
