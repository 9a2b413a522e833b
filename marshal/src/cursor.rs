//! Positioned byte cursors used by every codec.
//!
//! A [Reader] consumes a borrowed slice and a [Writer] appends to any [BufMut]. Both carry a
//! single [Endian] for their whole lifetime and only ever move forward. Every access checks
//! bounds first, so running past the end of a buffer surfaces as [Error::EndOfBuffer] rather
//! than a panic (including writes into fixed-capacity targets like `&mut [u8]`).

use crate::Error;
use bytes::{Buf, BufMut};

/// Byte order of multi-byte primitives and lengths.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Endian {
    #[default]
    Big,
    Little,
}

/// Read cursor over a borrowed byte slice.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    len: usize,
    endian: Endian,
}

macro_rules! impl_get {
    ($($name:ident: $type:ty => $be:ident, $le:ident;)*) => {
        $(
            #[doc = concat!("Reads a `", stringify!($type), "` in the reader's byte order.")]
            #[inline]
            pub fn $name(&mut self) -> Result<$type, Error> {
                self.at_least(std::mem::size_of::<$type>())?;
                Ok(match self.endian {
                    Endian::Big => self.buf.$be(),
                    Endian::Little => self.buf.$le(),
                })
            }
        )*
    };
}

impl<'a> Reader<'a> {
    /// Creates a big-endian reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_endian(data, Endian::Big)
    }

    pub fn with_endian(data: &'a [u8], endian: Endian) -> Self {
        Self {
            buf: data,
            len: data.len(),
            endian,
        }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.len - self.buf.len()
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Bytes that have not been consumed yet.
    pub fn rest(&self) -> &'a [u8] {
        self.buf
    }

    /// Returns [Error::EndOfBuffer] unless at least `len` bytes remain.
    #[inline]
    pub fn at_least(&self, len: usize) -> Result<(), Error> {
        if self.buf.remaining() < len {
            return Err(Error::EndOfBuffer);
        }
        Ok(())
    }

    /// Returns the byte `offset` bytes past the current position without consuming it.
    #[inline]
    pub fn peek_u8(&self, offset: usize) -> Result<u8, Error> {
        self.buf.get(offset).copied().ok_or(Error::EndOfBuffer)
    }

    /// Returns the `u16` starting `offset` bytes past the current position without consuming it.
    pub fn peek_u16(&self, offset: usize) -> Result<u16, Error> {
        let end = offset.checked_add(2).ok_or(Error::EndOfBuffer)?;
        let bytes = self.buf.get(offset..end).ok_or(Error::EndOfBuffer)?;
        let bytes = [bytes[0], bytes[1]];
        Ok(match self.endian {
            Endian::Big => u16::from_be_bytes(bytes),
            Endian::Little => u16::from_le_bytes(bytes),
        })
    }

    /// Advances the cursor by `len` bytes.
    pub fn skip(&mut self, len: usize) -> Result<(), Error> {
        self.at_least(len)?;
        self.buf.advance(len);
        Ok(())
    }

    /// Consumes and returns the next `len` bytes.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], Error> {
        self.at_least(len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    #[inline]
    pub fn get_u8(&mut self) -> Result<u8, Error> {
        self.at_least(1)?;
        Ok(self.buf.get_u8())
    }

    #[inline]
    pub fn get_i8(&mut self) -> Result<i8, Error> {
        self.at_least(1)?;
        Ok(self.buf.get_i8())
    }

    impl_get! {
        get_u16: u16 => get_u16, get_u16_le;
        get_u32: u32 => get_u32, get_u32_le;
        get_u64: u64 => get_u64, get_u64_le;
        get_i16: i16 => get_i16, get_i16_le;
        get_i32: i32 => get_i32, get_i32_le;
        get_i64: i64 => get_i64, get_i64_le;
        get_f32: f32 => get_f32, get_f32_le;
        get_f64: f64 => get_f64, get_f64_le;
    }
}

/// Write cursor appending to any [BufMut].
pub struct Writer<'a> {
    buf: &'a mut dyn BufMut,
    written: usize,
    endian: Endian,
}

macro_rules! impl_put {
    ($($name:ident: $type:ty => $be:ident, $le:ident;)*) => {
        $(
            #[doc = concat!("Writes a `", stringify!($type), "` in the writer's byte order.")]
            #[inline]
            pub fn $name(&mut self, value: $type) -> Result<(), Error> {
                let len = std::mem::size_of::<$type>();
                self.reserve(len)?;
                match self.endian {
                    Endian::Big => self.buf.$be(value),
                    Endian::Little => self.buf.$le(value),
                }
                self.written += len;
                Ok(())
            }
        )*
    };
}

impl<'a> Writer<'a> {
    /// Creates a big-endian writer appending to `buf`.
    pub fn new(buf: &'a mut dyn BufMut) -> Self {
        Self::with_endian(buf, Endian::Big)
    }

    pub fn with_endian(buf: &'a mut dyn BufMut, endian: Endian) -> Self {
        Self {
            buf,
            written: 0,
            endian,
        }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Number of bytes written through this writer.
    pub fn position(&self) -> usize {
        self.written
    }

    #[inline]
    fn reserve(&self, len: usize) -> Result<(), Error> {
        if self.buf.remaining_mut() < len {
            return Err(Error::EndOfBuffer);
        }
        Ok(())
    }

    pub fn put_slice(&mut self, src: &[u8]) -> Result<(), Error> {
        self.reserve(src.len())?;
        self.buf.put_slice(src);
        self.written += src.len();
        Ok(())
    }

    /// Writes `len` zero bytes.
    pub fn put_zeros(&mut self, len: usize) -> Result<(), Error> {
        self.reserve(len)?;
        self.buf.put_bytes(0, len);
        self.written += len;
        Ok(())
    }

    #[inline]
    pub fn put_u8(&mut self, value: u8) -> Result<(), Error> {
        self.reserve(1)?;
        self.buf.put_u8(value);
        self.written += 1;
        Ok(())
    }

    #[inline]
    pub fn put_i8(&mut self, value: i8) -> Result<(), Error> {
        self.put_u8(value as u8)
    }

    impl_put! {
        put_u16: u16 => put_u16, put_u16_le;
        put_u32: u32 => put_u32, put_u32_le;
        put_u64: u64 => put_u64, put_u64_le;
        put_i16: i16 => put_i16, put_i16_le;
        put_i32: i32 => put_i32, put_i32_le;
        put_i64: i64 => put_i64, put_i64_le;
        put_f32: f32 => put_f32, put_f32_le;
        put_f64: f64 => put_f64, put_f64_le;
    }
}

impl std::fmt::Debug for Writer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writer")
            .field("written", &self.written)
            .field("endian", &self.endian)
            .finish()
    }
}
