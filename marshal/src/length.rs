//! Unsigned length fields of configurable width.
//!
//! Lengths (and enum indices) precede the payload they describe and are 1, 2 or 4 bytes
//! wide. Narrow widths are always read as unsigned.

use crate::{Error, Reader, Writer};

/// Width of a length or index field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LengthSize {
    One,
    Two,
    #[default]
    Four,
}

impl LengthSize {
    /// Maps a configured width to a [LengthSize]. Anything other than 1 or 2 is 4.
    pub const fn normalize(size: i32) -> Self {
        match size {
            1 => Self::One,
            2 => Self::Two,
            _ => Self::Four,
        }
    }

    /// Width in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
        }
    }

    /// Largest value representable at this width.
    pub const fn max(self) -> u32 {
        match self {
            Self::One => u8::MAX as u32,
            Self::Two => u16::MAX as u32,
            Self::Four => u32::MAX,
        }
    }
}

impl From<i32> for LengthSize {
    fn from(size: i32) -> Self {
        Self::normalize(size)
    }
}

/// Reads a raw unsigned index.
pub fn read_index(reader: &mut Reader<'_>, size: LengthSize) -> Result<u32, Error> {
    Ok(match size {
        LengthSize::One => u32::from(reader.get_u8()?),
        LengthSize::Two => u32::from(reader.get_u16()?),
        LengthSize::Four => reader.get_u32()?,
    })
}

/// Writes `value` truncated to the width.
pub(crate) fn write_index(
    writer: &mut Writer<'_>,
    value: u32,
    size: LengthSize,
) -> Result<(), Error> {
    match size {
        LengthSize::One => writer.put_u8(value as u8),
        LengthSize::Two => writer.put_u16(value as u16),
        LengthSize::Four => writer.put_u32(value),
    }
}

/// Reads a length.
pub fn read_length(reader: &mut Reader<'_>, size: LengthSize) -> Result<usize, Error> {
    let len = read_index(reader, size)?;
    usize::try_from(len).map_err(|_| Error::InvalidLength(usize::MAX))
}

/// Writes a length, failing if it does not fit the width.
pub fn write_length(writer: &mut Writer<'_>, len: usize, size: LengthSize) -> Result<(), Error> {
    let max = size.max();
    let value = u32::try_from(len)
        .ok()
        .filter(|value| *value <= max)
        .ok_or(Error::LengthExceeded(len, max as usize))?;
    write_index(writer, value, size)
}
