//! Homogeneous sequences.
//!
//! A [ArrayLength::Fixed] array has its element count in the schema and nothing in the
//! stream. A [ArrayLength::Prefixed] array stores its count with the field's [LengthSize]
//! immediately before the elements. Elements are primitives or nested records.

use crate::{
    length::{read_length, write_length, LengthSize},
    primitive,
    schema::Kind,
    walker::{Decoder, Encoder},
    Error, Reader, Value, Writer,
};

/// How the element count of an array is determined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArrayLength {
    /// Declared by the schema, not stored.
    Fixed(usize),
    /// Stored before the elements.
    Prefixed,
}

/// Array descriptor: element kind and length mode.
#[derive(Clone, Debug)]
pub struct Array {
    element: Kind,
    length: ArrayLength,
}

impl Array {
    /// An array of exactly `len` elements.
    pub fn fixed(element: impl Into<Kind>, len: usize) -> Self {
        Self {
            element: element.into(),
            length: ArrayLength::Fixed(len),
        }
    }

    /// A length-prefixed array.
    pub fn prefixed(element: impl Into<Kind>) -> Self {
        Self {
            element: element.into(),
            length: ArrayLength::Prefixed,
        }
    }

    pub fn element(&self) -> &Kind {
        &self.element
    }

    pub fn length(&self) -> ArrayLength {
        self.length
    }

    /// Type name of the element if it is a nested record.
    pub(crate) fn element_record(&self) -> Option<&str> {
        match &self.element {
            Kind::Record(name) => Some(name),
            _ => None,
        }
    }
}

pub(crate) fn read(
    decoder: &mut Decoder<'_>,
    reader: &mut Reader<'_>,
    field: &str,
    array: &Array,
    size: LengthSize,
) -> Result<Vec<Value>, Error> {
    let len = match array.length {
        ArrayLength::Fixed(len) => len,
        ArrayLength::Prefixed => {
            let len = read_length(reader, size)?;
            if !decoder.config().lengths.contains(&len) {
                return Err(Error::InvalidLength(len));
            }
            len
        }
    };

    match &array.element {
        Kind::Primitive(kind) => {
            let bytes = len
                .checked_mul(kind.size())
                .ok_or(Error::InvalidLength(len))?;
            reader.at_least(bytes)?;
            (0..len).map(|_| primitive::decode(reader, *kind)).collect()
        }
        Kind::Record(name) => {
            let mut values = Vec::with_capacity(len.min(reader.remaining()));
            for _ in 0..len {
                let start = reader.position();
                values.push(Value::Record(decoder.decode_record(reader, name)?));
                check_width(array, reader.position() - start, len)?;
            }
            Ok(values)
        }
        other => Err(unsupported(field, other)),
    }
}

pub(crate) fn write(
    encoder: &mut Encoder<'_>,
    writer: &mut Writer<'_>,
    field: &str,
    array: &Array,
    size: LengthSize,
    values: &[Value],
) -> Result<(), Error> {
    match array.length {
        ArrayLength::Fixed(len) if len != values.len() => {
            return Err(Error::mismatch(
                field,
                format!("{len} elements"),
                format!("{} elements", values.len()),
            ));
        }
        ArrayLength::Fixed(_) => {}
        ArrayLength::Prefixed => write_length(writer, values.len(), size)?,
    }

    match &array.element {
        Kind::Primitive(kind) => {
            for value in values {
                primitive::encode(writer, *kind, value, field)?;
            }
        }
        Kind::Record(name) => {
            for value in values {
                let start = writer.position();
                encoder.encode_nested(writer, field, name, Some(value))?;
                check_width(array, writer.position() - start, values.len())?;
            }
        }
        other => return Err(unsupported(field, other)),
    }
    Ok(())
}

/// Every record element of a prefixed array must occupy at least one byte, which bounds a
/// stored count by the size of the input.
fn check_width(array: &Array, width: usize, len: usize) -> Result<(), Error> {
    if width == 0 && array.length == ArrayLength::Prefixed {
        return Err(Error::InvalidLength(len));
    }
    Ok(())
}

fn unsupported(field: &str, kind: &Kind) -> Error {
    Error::Configuration(
        field.to_string(),
        format!("unsupported array element {}", kind.name()),
    )
}
