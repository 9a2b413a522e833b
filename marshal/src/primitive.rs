//! Fixed-width scalar codec.
//!
//! Every primitive occupies exactly [Primitive::size] bytes and is written in the cursor's
//! byte order. Booleans are a single byte (any non-zero byte decodes as `true`) and
//! [Primitive::Char] is one UTF-16 code unit.

use crate::{Error, Reader, Value, Writer};

/// Scalar kinds with a constant encoded width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    Char,
}

macro_rules! impl_primitive {
    ($($kind:ident($type:ty) => $get:ident, $put:ident;)*) => {
        impl Primitive {
            /// Encoded width in bytes.
            pub const fn size(self) -> usize {
                match self {
                    $(Self::$kind => std::mem::size_of::<$type>(),)*
                    Self::Bool => 1,
                }
            }

            /// The zero value of this kind.
            pub fn zero(self) -> Value {
                match self {
                    $(Self::$kind => Value::$kind(<$type>::default()),)*
                    Self::Bool => Value::Bool(false),
                }
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$kind => stringify!($kind),)*
                    Self::Bool => "Bool",
                }
            }
        }

        /// Reads a scalar of the given kind.
        pub fn decode(reader: &mut Reader<'_>, kind: Primitive) -> Result<Value, Error> {
            Ok(match kind {
                $(Primitive::$kind => Value::$kind(reader.$get()?),)*
                Primitive::Bool => Value::Bool(reader.get_u8()? != 0),
            })
        }

        /// Writes `value`, which must be the [Value] variant matching `kind`.
        pub fn encode(
            writer: &mut Writer<'_>,
            kind: Primitive,
            value: &Value,
            field: &str,
        ) -> Result<(), Error> {
            match (kind, value) {
                $((Primitive::$kind, Value::$kind(v)) => writer.$put(*v),)*
                (Primitive::Bool, Value::Bool(v)) => writer.put_u8(u8::from(*v)),
                (kind, value) => Err(Error::mismatch(field, kind.name(), value.kind_name())),
            }
        }
    };
}

impl_primitive! {
    I8(i8) => get_i8, put_i8;
    I16(i16) => get_i16, put_i16;
    I32(i32) => get_i32, put_i32;
    I64(i64) => get_i64, put_i64;
    U8(u8) => get_u8, put_u8;
    U16(u16) => get_u16, put_u16;
    U32(u32) => get_u32, put_u32;
    U64(u64) => get_u64, put_u64;
    F32(f32) => get_f32, put_f32;
    F64(f64) => get_f64, put_f64;
    Char(u16) => get_u16, put_u16;
}
