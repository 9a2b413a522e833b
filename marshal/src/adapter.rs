//! User-supplied codecs for individual fields.

use crate::{Error, Reader, Record, Value, Writer};

/// Codec for a field whose layout the built-in kinds cannot express.
///
/// An adapter is registered once in a [crate::Field] and shared by every call that walks that
/// field, so implementations should not rely on per-call mutable state.
///
/// The containing record is passed to both methods. Fields are walked in layout order, so
/// when decoding only the fields before this one hold decoded values; later fields still
/// hold their defaults.
pub trait Adapter: Send + Sync + std::fmt::Debug {
    /// Reads the field value.
    fn decode(&self, reader: &mut Reader<'_>, record: &Record) -> Result<Value, Error>;

    /// Writes `value`. Returns [Error::TypeMismatch] if `value` is not something this adapter
    /// can encode.
    fn encode(&self, writer: &mut Writer<'_>, value: &Value, record: &Record)
        -> Result<(), Error>;
}
