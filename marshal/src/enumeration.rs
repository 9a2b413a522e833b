//! Enum values stored as their ordinal.
//!
//! The ordinal is written with the field's [LengthSize]. Values that do not name one of the
//! declared constants (including unset fields) are written as index `-1` truncated to the
//! width. Reading an index with no matching constant is not an error: the caller receives
//! [Index::Unknown] and decides how to report it.

use crate::{
    length::{read_index, write_index, LengthSize},
    Error, Reader, Writer,
};

/// Index written when a value has no matching constant (`-1` in two's complement).
pub const NOT_FOUND: u32 = u32::MAX;

/// An enumerated type: a name and its constants in declaration order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EnumType {
    name: String,
    variants: Vec<String>,
}

impl EnumType {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        variants: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    /// Ordinal of the constant named `variant`.
    pub fn index_of(&self, variant: &str) -> Option<usize> {
        self.variants.iter().position(|v| v == variant)
    }

    /// Constant at `index`.
    pub fn variant(&self, index: usize) -> Option<&str> {
        self.variants.get(index).map(String::as_str)
    }
}

/// Result of reading an ordinal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Index<'a> {
    Known(&'a str),
    Unknown(u32),
}

/// Reads an ordinal and looks it up in `ty`.
pub fn read<'t>(
    reader: &mut Reader<'_>,
    ty: &'t EnumType,
    size: LengthSize,
) -> Result<Index<'t>, Error> {
    let index = read_index(reader, size)?;
    let variant = usize::try_from(index)
        .ok()
        .and_then(|index| ty.variant(index));
    Ok(match variant {
        Some(variant) => Index::Known(variant),
        None => Index::Unknown(index),
    })
}

/// Writes the ordinal of `value` in `ty`, or [NOT_FOUND] if it names no constant.
pub fn write(
    writer: &mut Writer<'_>,
    ty: &EnumType,
    value: Option<&str>,
    size: LengthSize,
) -> Result<(), Error> {
    let index = match value.and_then(|value| ty.index_of(value)) {
        Some(index) => {
            let max = size.max();
            u32::try_from(index)
                .ok()
                .filter(|index| *index <= max)
                .ok_or(Error::LengthExceeded(index, max as usize))?
        }
        None => NOT_FOUND,
    };
    write_index(writer, index, size)
}
