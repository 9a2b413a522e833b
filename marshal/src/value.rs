//! Decoded value graph.
//!
//! A [Record] is an instance of a resolved [Layout]: one slot per field, in layout order
//! (base fields first). A slot is `None` when the field is unset, which only happens for enum
//! and custom fields that were never assigned or that decoded leniently.

use crate::{schema::Layout, Error};
use bytes::Bytes;
use std::sync::Arc;

/// A node of the decoded value graph.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Bool(bool),
    /// A single UTF-16 code unit.
    Char(u16),
    String(String),
    /// Name of an enum constant.
    Enum(String),
    Array(Vec<Value>),
    Record(Record),
    /// Opaque bytes, for use by custom adapters.
    Bytes(Bytes),
}

impl Value {
    /// Short name of the variant, used in mismatch errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::I8(_) => "I8",
            Self::I16(_) => "I16",
            Self::I32(_) => "I32",
            Self::I64(_) => "I64",
            Self::U8(_) => "U8",
            Self::U16(_) => "U16",
            Self::U32(_) => "U32",
            Self::U64(_) => "U64",
            Self::F32(_) => "F32",
            Self::F64(_) => "F64",
            Self::Bool(_) => "Bool",
            Self::Char(_) => "Char",
            Self::String(_) => "String",
            Self::Enum(_) => "Enum",
            Self::Array(_) => "Array",
            Self::Record(_) => "Record",
            Self::Bytes(_) => "Bytes",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Creates an enum value naming `variant`.
    pub fn variant(variant: impl Into<String>) -> Self {
        Self::Enum(variant.into())
    }
}

macro_rules! impl_from {
    ($($type:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$type> for Value {
                fn from(value: $type) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    bool => Bool,
    String => String,
    Vec<Value> => Array,
    Record => Record,
    Bytes => Bytes,
);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// An instance of a record type.
#[derive(Clone, Debug)]
pub struct Record {
    layout: Arc<Layout>,
    values: Vec<Option<Value>>,
}

impl Record {
    pub(crate) fn new(layout: Arc<Layout>, values: Vec<Option<Value>>) -> Self {
        debug_assert_eq!(layout.fields().len(), values.len());
        Self { layout, values }
    }

    /// The resolved layout this record is an instance of.
    pub fn layout(&self) -> &Arc<Layout> {
        &self.layout
    }

    pub fn type_name(&self) -> &str {
        self.layout.name()
    }

    /// Returns the value of `field`, or `None` if it is unset or unknown.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.layout
            .index_of(field)
            .and_then(|index| self.values[index].as_ref())
    }

    /// Assigns `field`.
    ///
    /// Values are not checked against the field kind until the record is encoded.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<(), Error> {
        let index = self.index(field)?;
        self.values[index] = Some(value.into());
        Ok(())
    }

    /// Clears `field`, returning its previous value.
    pub fn unset(&mut self, field: &str) -> Result<Option<Value>, Error> {
        let index = self.index(field)?;
        Ok(self.values[index].take())
    }

    /// Iterates over `(field name, value)` pairs in layout order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.layout
            .fields()
            .iter()
            .zip(self.values.iter())
            .map(|(field, value)| (field.name(), value.as_ref()))
    }

    fn index(&self, field: &str) -> Result<usize, Error> {
        self.layout
            .index_of(field)
            .ok_or_else(|| Error::UnknownField(format!("{}.{field}", self.type_name())))
    }

    pub(crate) fn slot(&self, index: usize) -> Option<&Value> {
        self.values[index].as_ref()
    }

    pub(crate) fn put(&mut self, index: usize, value: Value) {
        self.values[index] = Some(value);
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.type_name() == other.type_name() && self.values == other.values
    }
}
