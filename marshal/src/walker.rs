//! Field-by-field traversal of records.
//!
//! The walkers visit a record's layout in order and hand each field to the codec for its
//! kind. Custom adapters take precedence over every built-in kind. Skipped fields are never
//! touched.

use crate::{
    array,
    enumeration::{self, Index},
    primitive,
    schema::{Field, Kind, Registry},
    string, Config, Error, Reader, Record, Value, Warning, Writer,
};
use tracing::{trace, warn};

/// Decoding state for one call.
pub(crate) struct Decoder<'c> {
    registry: &'c Registry,
    cfg: &'c Config,
    warnings: Vec<Warning>,
    depth: usize,
}

impl<'c> Decoder<'c> {
    pub fn new(registry: &'c Registry, cfg: &'c Config) -> Self {
        Self {
            registry,
            cfg,
            warnings: Vec::new(),
            depth: 0,
        }
    }

    pub fn config(&self) -> &'c Config {
        self.cfg
    }

    /// Decodes a fresh instance of `name`.
    pub fn decode_record(&mut self, reader: &mut Reader<'_>, name: &str) -> Result<Record, Error> {
        let layout = self.registry.resolve(name)?;
        let mut record = self.registry.construct(layout, false)?;
        self.decode_into(reader, &mut record)?;
        Ok(record)
    }

    /// Decodes every non-skipped field of `record` in layout order.
    pub fn decode_into(
        &mut self,
        reader: &mut Reader<'_>,
        record: &mut Record,
    ) -> Result<(), Error> {
        if self.depth >= self.cfg.max_depth {
            return Err(Error::DepthExceeded(self.cfg.max_depth));
        }
        self.depth += 1;
        let result = self.decode_fields(reader, record);
        self.depth -= 1;
        result
    }

    fn decode_fields(&mut self, reader: &mut Reader<'_>, record: &mut Record) -> Result<(), Error> {
        let layout = record.layout().clone();
        let start = reader.position();
        for (index, field) in layout.fields().iter().enumerate() {
            if field.is_skipped() {
                continue;
            }
            if let Some(value) = self.decode_field(reader, field, record)? {
                record.put(index, value);
            }
        }
        trace!(
            name = layout.name(),
            start,
            end = reader.position(),
            "decoded record"
        );
        Ok(())
    }

    fn decode_field(
        &mut self,
        reader: &mut Reader<'_>,
        field: &Field,
        record: &Record,
    ) -> Result<Option<Value>, Error> {
        let size = field.length_size();
        let value = match field.kind() {
            Kind::Custom(adapter) => adapter.decode(reader, record)?,
            Kind::Primitive(kind) => primitive::decode(reader, *kind)?,
            Kind::Array(shape) => {
                Value::Array(array::read(self, reader, field.name(), shape, size)?)
            }
            Kind::Enum(ty) => match enumeration::read(reader, ty, size)? {
                Index::Known(variant) => Value::Enum(variant.to_string()),
                Index::Unknown(index) => {
                    warn!(
                        record = record.type_name(),
                        field = field.name(),
                        index,
                        variants = ty.variants().len(),
                        "enum index out of range"
                    );
                    self.warnings.push(Warning::UnknownEnumIndex {
                        record: record.type_name().to_string(),
                        field: field.name().to_string(),
                        index,
                        variants: ty.variants().len(),
                    });
                    return Ok(None);
                }
            },
            Kind::String(policy) => Value::String(string::read(reader, policy, size, self.cfg)?),
            Kind::Record(name) => Value::Record(self.decode_record(reader, name)?),
        };
        Ok(Some(value))
    }

    /// Warnings collected so far.
    pub fn finish(self) -> Vec<Warning> {
        self.warnings
    }
}

/// Encoding state for one call.
pub(crate) struct Encoder<'c> {
    cfg: &'c Config,
    depth: usize,
}

impl<'c> Encoder<'c> {
    pub fn new(cfg: &'c Config) -> Self {
        Self { cfg, depth: 0 }
    }

    /// Encodes every non-skipped field of `record` in layout order.
    pub fn encode_record(&mut self, writer: &mut Writer<'_>, record: &Record) -> Result<(), Error> {
        if self.depth >= self.cfg.max_depth {
            return Err(Error::DepthExceeded(self.cfg.max_depth));
        }
        self.depth += 1;
        let result = self.encode_fields(writer, record);
        self.depth -= 1;
        result
    }

    fn encode_fields(&mut self, writer: &mut Writer<'_>, record: &Record) -> Result<(), Error> {
        let start = writer.position();
        for (index, field) in record.layout().fields().iter().enumerate() {
            if field.is_skipped() {
                continue;
            }
            self.encode_field(writer, field, record.slot(index), record)?;
        }
        trace!(
            name = record.type_name(),
            start,
            end = writer.position(),
            "encoded record"
        );
        Ok(())
    }

    fn encode_field(
        &mut self,
        writer: &mut Writer<'_>,
        field: &Field,
        value: Option<&Value>,
        record: &Record,
    ) -> Result<(), Error> {
        let size = field.length_size();
        match field.kind() {
            Kind::Custom(adapter) => {
                adapter.encode(writer, required(field, "custom", value)?, record)
            }
            Kind::Primitive(kind) => {
                primitive::encode(writer, *kind, required(field, kind.name(), value)?, field.name())
            }
            Kind::Array(shape) => match required(field, "Array", value)? {
                Value::Array(values) => {
                    array::write(self, writer, field.name(), shape, size, values)
                }
                other => Err(Error::mismatch(field.name(), "Array", other.kind_name())),
            },
            Kind::Enum(ty) => {
                // Unset enums are written as "not found"
                let variant = match value {
                    None => None,
                    Some(Value::Enum(variant)) => Some(variant.as_str()),
                    Some(other) => {
                        return Err(Error::mismatch(field.name(), "Enum", other.kind_name()))
                    }
                };
                enumeration::write(writer, ty, variant, size)
            }
            Kind::String(policy) => match required(field, "String", value)? {
                Value::String(s) => string::write(writer, s, policy, size),
                other => Err(Error::mismatch(field.name(), "String", other.kind_name())),
            },
            Kind::Record(name) => self.encode_nested(writer, field.name(), name, value),
        }
    }

    /// Encodes `value` as a nested record of type `name`.
    pub fn encode_nested(
        &mut self,
        writer: &mut Writer<'_>,
        field: &str,
        name: &str,
        value: Option<&Value>,
    ) -> Result<(), Error> {
        match value {
            Some(Value::Record(record)) if record.type_name() == name => {
                self.encode_record(writer, record)
            }
            Some(Value::Record(record)) => Err(Error::mismatch(field, name, record.type_name())),
            Some(other) => Err(Error::mismatch(field, name, other.kind_name())),
            None => Err(Error::mismatch(field, name, "unset")),
        }
    }
}

fn required<'v>(
    field: &Field,
    expected: &str,
    value: Option<&'v Value>,
) -> Result<&'v Value, Error> {
    value.ok_or_else(|| Error::mismatch(field.name(), expected, "unset"))
}
