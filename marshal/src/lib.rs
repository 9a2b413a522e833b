//! Decode and encode binary records described by field tables.
//!
//! # Overview
//!
//! Many binary formats (file headers, chunked containers, device protocols) are sequences
//! of fixed-width scalars, strings with a format-specific termination rule, enum ordinals,
//! counted arrays and nested structures. This crate reads and writes such formats from a
//! declarative description instead of hand-written parsing code:
//!
//! - A [Schema] lists the [Field]s of a record type, in wire order, and may extend a base
//!   type whose fields come first.
//! - A [Registry] holds schemas by name and resolves each one, once, into a flattened
//!   [Layout]. Unsupported combinations and missing types are reported at resolution,
//!   before any byte is consumed.
//! - A [Codec] walks a layout over a [Reader] or [Writer], producing or consuming a
//!   [Record]: a dynamic tree of [Value]s.
//!
//! # Supported Fields
//!
//! - Primitives: `i8`..`i64`, `u8`..`u64`, `f32`, `f64`, `bool` (one byte) and UTF-16
//!   `char` units, in the cursor's [Endian] byte order.
//! - Strings: ASCII, UTF-8 or UTF-16, either null-terminated (with minimum/maximum lengths
//!   in code units) or prefixed by a 1, 2 or 4 byte length, optionally aligned.
//! - Enums: the constant's ordinal, 1, 2 or 4 bytes wide. Unknown ordinals decode leniently
//!   and are reported as [Warning]s.
//! - Arrays of primitives or records, with a length fixed by the schema or stored in the
//!   stream.
//! - Nested records, and any field with a custom [Adapter].
//!
//! # Safety
//!
//! Decoding untrusted input never panics. Every read is bounds checked, every length read
//! from the stream can be limited with [Config::lengths] before anything is allocated, and
//! nesting is limited by [Config::max_depth].
//!
//! # Example
//!
//! ```
//! use commonware_marshal::{
//!     Charset, Codec, Endian, Field, Primitive, Registry, Schema, StringPolicy, Value,
//! };
//! use std::sync::Arc;
//!
//! // Describe the format
//! let registry = Registry::new()
//!     .with(
//!         Schema::builder("Header")
//!             .field(Field::primitive("version", Primitive::U16))
//!             .field(Field::string("name", StringPolicy::new(Charset::Utf8)))
//!             .build(),
//!     )
//!     .unwrap();
//! let codec = Codec::new(Arc::new(registry));
//!
//! // Encode an instance
//! let mut header = codec.instantiate("Header").unwrap();
//! header.set("version", 3u16).unwrap();
//! header.set("name", "demo").unwrap();
//! let bytes = codec.to_bytes(&header, Endian::Big).unwrap();
//! assert_eq!(&bytes[..], b"\x00\x03demo\x00");
//!
//! // Decode it back
//! let decoded = codec.from_slice(&bytes, "Header", Endian::Big).unwrap();
//! assert!(decoded.is_clean());
//! assert_eq!(decoded.value.get("name"), Some(&Value::from("demo")));
//! ```

pub mod adapter;
pub mod array;
pub mod codec;
pub mod config;
pub mod cursor;
pub mod enumeration;
pub mod error;
pub mod length;
pub mod primitive;
pub mod schema;
pub mod string;
pub mod value;
mod walker;

// Re-export main types
pub use adapter::Adapter;
pub use array::{Array, ArrayLength};
pub use codec::{Codec, Decoded};
pub use config::{Config, RangeCfg};
pub use cursor::{Endian, Reader, Writer};
pub use enumeration::EnumType;
pub use error::{Error, Warning};
pub use length::LengthSize;
pub use primitive::Primitive;
pub use schema::{Field, Kind, Layout, Registry, Schema, MAX_FIXED_LENGTH};
pub use string::{Charset, StringPolicy};
pub use value::{Record, Value};
