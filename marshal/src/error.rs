//! Error and warning types for marshal operations

use thiserror::Error;

/// Error type for marshal operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unexpected end of buffer")]
    EndOfBuffer,
    #[error("extra data found: {0} bytes")]
    ExtraData(usize),
    #[error("invalid data in {0}: {1}")]
    InvalidData(String, String), // context, message
    #[error("cannot instantiate {0}: no schema registered")]
    Construction(String),
    #[error("invalid schema {0}: {1}")]
    Configuration(String, String), // type, reason
    #[error("type mismatch in {field}: expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },
    #[error("length exceeded: {0} > {1}")]
    LengthExceeded(usize, usize), // found, max
    #[error("invalid length: {0}")]
    InvalidLength(usize),
    #[error("nesting deeper than {0}")]
    DepthExceeded(usize),
    #[error("unknown field: {0}")]
    UnknownField(String),
}

impl Error {
    pub(crate) fn mismatch(
        field: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Non-fatal conditions observed while decoding.
///
/// Warnings never abort a call. They are returned next to the decoded value (see
/// [crate::Decoded]) and emitted as `tracing` events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A decoded enum index had no matching constant. The field was left untouched.
    UnknownEnumIndex {
        record: String,
        field: String,
        index: u32,
        variants: usize,
    },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownEnumIndex {
                record,
                field,
                index,
                variants,
            } => write!(
                f,
                "{record}.{field}: index {index} out of range for {variants} variants"
            ),
        }
    }
}
