//! Entry points for decoding and encoding records.

use crate::{
    array,
    schema::{Field, Kind, Registry},
    walker::{Decoder, Encoder},
    Config, Endian, Error, Reader, Record, Value, Warning, Writer,
};
use bytes::BytesMut;
use std::sync::Arc;

/// A decoded value and the warnings raised while decoding it.
#[derive(Clone, Debug, PartialEq)]
pub struct Decoded<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Decoded<T> {
    /// Discards the warnings.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Returns true if decoding raised no warnings.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Decodes and encodes records described by a [Registry].
///
/// A `Codec` is cheap to clone and may be used from many threads at once. Each call works
/// on its own cursor; the only shared state is the registry's layout cache.
#[derive(Clone, Debug)]
pub struct Codec {
    registry: Arc<Registry>,
    cfg: Config,
}

impl Codec {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            cfg: Config::default(),
        }
    }

    pub fn with_config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Creates a default-populated instance of `name` (see [Registry::instantiate]).
    pub fn instantiate(&self, name: &str) -> Result<Record, Error> {
        self.registry.instantiate(name)
    }

    /// Decodes a new instance of `name` from the reader.
    ///
    /// The type (and every type reachable from it) is resolved before any byte is read.
    pub fn decode(&self, reader: &mut Reader<'_>, name: &str) -> Result<Decoded<Record>, Error> {
        self.registry.resolve(name)?;
        let mut decoder = Decoder::new(&self.registry, &self.cfg);
        let value = decoder.decode_record(reader, name)?;
        Ok(Decoded {
            value,
            warnings: decoder.finish(),
        })
    }

    /// Decodes into an existing record, overwriting every non-skipped field.
    ///
    /// Skipped fields, and enum fields whose index is out of range, keep their previous
    /// values. On error the record is left unchanged (the reader is not rewound).
    pub fn decode_into(
        &self,
        reader: &mut Reader<'_>,
        record: &mut Record,
    ) -> Result<Vec<Warning>, Error> {
        self.registry.resolve(record.type_name())?;
        let mut decoder = Decoder::new(&self.registry, &self.cfg);
        let mut scratch = record.clone();
        decoder.decode_into(reader, &mut scratch)?;
        *record = scratch;
        Ok(decoder.finish())
    }

    /// Encodes `record` using the layout it was created with.
    pub fn encode(&self, writer: &mut Writer<'_>, record: &Record) -> Result<(), Error> {
        self.registry.resolve(record.type_name())?;
        Encoder::new(&self.cfg).encode_record(writer, record)
    }

    /// Decodes an array that is not part of a record. `field` supplies the element kind,
    /// length mode, and length width.
    pub fn decode_array(
        &self,
        reader: &mut Reader<'_>,
        field: &Field,
    ) -> Result<Decoded<Vec<Value>>, Error> {
        let shape = self.array_kind(field)?;
        let mut decoder = Decoder::new(&self.registry, &self.cfg);
        let value = array::read(
            &mut decoder,
            reader,
            field.name(),
            shape,
            field.length_size(),
        )?;
        Ok(Decoded {
            value,
            warnings: decoder.finish(),
        })
    }

    /// Encodes an array that is not part of a record.
    pub fn encode_array(
        &self,
        writer: &mut Writer<'_>,
        field: &Field,
        values: &[Value],
    ) -> Result<(), Error> {
        let shape = self.array_kind(field)?;
        let mut encoder = Encoder::new(&self.cfg);
        array::write(
            &mut encoder,
            writer,
            field.name(),
            shape,
            field.length_size(),
            values,
        )
    }

    /// Encodes `record` into a new buffer.
    pub fn to_bytes(&self, record: &Record, endian: Endian) -> Result<BytesMut, Error> {
        let mut buf = BytesMut::new();
        let mut writer = Writer::with_endian(&mut buf, endian);
        self.encode(&mut writer, record)?;
        Ok(buf)
    }

    /// Decodes an instance of `name` that must occupy all of `data`.
    pub fn from_slice(
        &self,
        data: &[u8],
        name: &str,
        endian: Endian,
    ) -> Result<Decoded<Record>, Error> {
        let mut reader = Reader::with_endian(data, endian);
        let decoded = self.decode(&mut reader, name)?;
        match reader.remaining() {
            0 => Ok(decoded),
            extra => Err(Error::ExtraData(extra)),
        }
    }

    fn array_kind<'f>(&self, field: &'f Field) -> Result<&'f array::Array, Error> {
        let Kind::Array(shape) = field.kind() else {
            return Err(Error::Configuration(
                field.name().to_string(),
                format!("expected an array field, found {}", field.kind().name()),
            ));
        };
        self.registry.check_field(field)?;
        Ok(shape)
    }
}
