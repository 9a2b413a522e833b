//! Record-level behaviour: adapters, recursion, limits and resolution errors.

use bytes::Bytes;
use commonware_marshal::{
    string, Adapter, Array, Charset, Codec, Config, Endian, Error, Field, Kind, Primitive,
    Reader, Record, Registry, Schema, StringPolicy, Value, Writer,
};
use std::{sync::Arc, thread};

/// Raw bytes whose length is stored in an earlier `u16` field.
#[derive(Debug)]
struct SizedBy(&'static str);

impl SizedBy {
    fn len(&self, record: &Record) -> Result<usize, Error> {
        match record.get(self.0) {
            Some(Value::U16(len)) => Ok(usize::from(*len)),
            other => Err(Error::TypeMismatch {
                field: self.0.to_string(),
                expected: "U16".to_string(),
                found: other.map_or("unset", Value::kind_name).to_string(),
            }),
        }
    }
}

impl Adapter for SizedBy {
    fn decode(&self, reader: &mut Reader<'_>, record: &Record) -> Result<Value, Error> {
        let len = self.len(record)?;
        Ok(Value::Bytes(Bytes::copy_from_slice(reader.take(len)?)))
    }

    fn encode(&self, writer: &mut Writer<'_>, value: &Value, record: &Record) -> Result<(), Error> {
        let Value::Bytes(bytes) = value else {
            return Err(Error::TypeMismatch {
                field: "payload".to_string(),
                expected: "Bytes".to_string(),
                found: value.kind_name().to_string(),
            });
        };
        let len = self.len(record)?;
        if bytes.len() != len {
            return Err(Error::InvalidLength(bytes.len()));
        }
        writer.put_slice(bytes)
    }
}

fn packet_codec() -> Codec {
    let registry = Registry::new()
        .with(
            Schema::builder("Packet")
                .field(Field::primitive("len", Primitive::U16))
                .field(Field::custom("payload", Arc::new(SizedBy("len"))))
                .field(Field::primitive("crc", Primitive::U8))
                .build(),
        )
        .unwrap();
    Codec::new(Arc::new(registry))
}

fn tree_codec(cfg: Config) -> Codec {
    let registry = Registry::new()
        .with(
            Schema::builder("Node")
                .field(Field::primitive("value", Primitive::U8))
                .field(
                    Field::array("children", Array::prefixed(Kind::Record("Node".into())))
                        .with_length_size(1),
                )
                .build(),
        )
        .unwrap();
    Codec::new(Arc::new(registry)).with_config(cfg)
}

fn node(codec: &Codec, value: u8, children: Vec<Record>) -> Record {
    let mut node = codec.instantiate("Node").unwrap();
    node.set("value", value).unwrap();
    node.set(
        "children",
        children.into_iter().map(Value::Record).collect::<Vec<_>>(),
    )
    .unwrap();
    node
}

#[test]
fn test_adapter_reads_earlier_field() {
    let codec = packet_codec();
    let bytes = [0, 3, b'a', b'b', b'c', 0x5A];
    let packet = codec.from_slice(&bytes, "Packet", Endian::Big).unwrap().value;
    assert_eq!(packet.get("len"), Some(&Value::U16(3)));
    assert_eq!(
        packet.get("payload"),
        Some(&Value::Bytes(Bytes::from_static(b"abc")))
    );
    assert_eq!(packet.get("crc"), Some(&Value::U8(0x5A)));

    let encoded = codec.to_bytes(&packet, Endian::Big).unwrap();
    assert_eq!(&encoded[..], &bytes);
}

#[test]
fn test_adapter_errors_propagate() {
    let codec = packet_codec();

    // Not enough payload
    assert_eq!(
        codec.from_slice(&[0, 9, 1, 2], "Packet", Endian::Big),
        Err(Error::EndOfBuffer)
    );

    // Custom fields start unset
    let mut packet = codec.instantiate("Packet").unwrap();
    assert_eq!(packet.get("payload"), None);
    assert!(matches!(
        codec.to_bytes(&packet, Endian::Big),
        Err(Error::TypeMismatch { field, found, .. }) if field == "payload" && found == "unset"
    ));

    // The adapter rejects values it cannot encode
    packet.set("payload", "text").unwrap();
    assert!(matches!(
        codec.to_bytes(&packet, Endian::Big),
        Err(Error::TypeMismatch { expected, .. }) if expected == "Bytes"
    ));
    packet.set("payload", Bytes::from_static(b"xy")).unwrap();
    assert_eq!(
        codec.to_bytes(&packet, Endian::Big),
        Err(Error::InvalidLength(2))
    );
}

#[test]
fn test_recursive_tree() {
    let codec = tree_codec(Config::default());
    let tree = node(
        &codec,
        1,
        vec![
            node(&codec, 2, vec![]),
            node(&codec, 3, vec![node(&codec, 4, vec![])]),
        ],
    );
    let bytes = codec.to_bytes(&tree, Endian::Big).unwrap();
    assert_eq!(&bytes[..], &[1, 2, 2, 0, 3, 1, 4, 0]);

    let decoded = codec.from_slice(&bytes, "Node", Endian::Big).unwrap().value;
    assert_eq!(decoded, tree);
    let children = decoded.get("children").and_then(Value::as_array).unwrap();
    let grandchild = children[1]
        .as_record()
        .and_then(|child| child.get("children"))
        .and_then(Value::as_array)
        .unwrap();
    assert_eq!(
        grandchild[0].as_record().and_then(|n| n.get("value")),
        Some(&Value::U8(4))
    );
}

#[test]
fn test_depth_limit() {
    let bytes = [1, 2, 2, 0, 3, 1, 4, 0];
    let shallow = tree_codec(Config::default().with_max_depth(2));
    assert_eq!(
        shallow.from_slice(&bytes, "Node", Endian::Big),
        Err(Error::DepthExceeded(2))
    );
    let deep = tree_codec(Config::default().with_max_depth(3));
    assert!(deep.from_slice(&bytes, "Node", Endian::Big).is_ok());

    // Encoding is limited the same way
    let tree = deep.from_slice(&bytes, "Node", Endian::Big).unwrap().value;
    assert_eq!(
        shallow.to_bytes(&tree, Endian::Big),
        Err(Error::DepthExceeded(2))
    );

    // A chain of single children cannot exhaust the stack
    let mut chain = vec![1u8; 10_000];
    chain.push(0);
    let codec = tree_codec(Config::default());
    let nested: Vec<u8> = chain.iter().flat_map(|len| [7, *len]).collect();
    assert_eq!(
        codec.from_slice(&nested, "Node", Endian::Big),
        Err(Error::DepthExceeded(64))
    );
}

#[test]
fn test_length_limit_before_allocation() {
    let codec = tree_codec(Config::default().with_lengths(..=4));
    assert_eq!(
        codec.from_slice(&[1, 200], "Node", Endian::Big),
        Err(Error::InvalidLength(200))
    );
}

#[test]
fn test_resolution_errors_before_reading() {
    let registry = Registry::new()
        .with(
            Schema::builder("Outer")
                .field(Field::primitive("tag", Primitive::U8))
                .field(Field::record("inner", "Inner"))
                .build(),
        )
        .unwrap()
        .with(
            Schema::builder("Names")
                .field(Field::array(
                    "names",
                    Array::fixed(StringPolicy::new(Charset::Utf8), 2),
                ))
                .build(),
        )
        .unwrap();
    let codec = Codec::new(Arc::new(registry));

    let mut reader = Reader::new(&[1, 2, 3, 4]);
    assert_eq!(
        codec.decode(&mut reader, "Outer"),
        Err(Error::Construction("Inner".to_string()))
    );
    assert!(matches!(
        codec.decode(&mut reader, "Names"),
        Err(Error::Configuration(name, _)) if name == "Names"
    ));
    assert_eq!(
        codec.decode(&mut reader, "Missing"),
        Err(Error::Construction("Missing".to_string()))
    );
    assert_eq!(reader.position(), 0);
}

#[test]
fn test_fixed_capacity_writer() {
    let codec = packet_codec();
    let packet = codec
        .from_slice(&[0, 2, 9, 9, 1], "Packet", Endian::Big)
        .unwrap()
        .value;

    let mut storage = [0u8; 3];
    let mut target: &mut [u8] = &mut storage;
    let mut writer = Writer::new(&mut target);
    assert_eq!(codec.encode(&mut writer, &packet), Err(Error::EndOfBuffer));

    let mut storage = [0u8; 5];
    let mut target: &mut [u8] = &mut storage;
    let mut writer = Writer::new(&mut target);
    codec.encode(&mut writer, &packet).unwrap();
    assert_eq!(writer.position(), 5);
    assert_eq!(storage, [0, 2, 9, 9, 1]);
}

#[test]
fn test_concurrent_decode() {
    let codec = tree_codec(Config::default());
    let bytes: Arc<[u8]> = Arc::from(&[1u8, 2, 2, 0, 3, 1, 4, 0][..]);
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let codec = codec.clone();
            let bytes = bytes.clone();
            thread::spawn(move || {
                codec
                    .from_slice(&bytes, "Node", Endian::Big)
                    .unwrap()
                    .value
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));

    // Every thread saw the same cached layout
    let layout = codec.registry().resolve("Node").unwrap();
    assert!(results
        .iter()
        .all(|record| Arc::ptr_eq(record.layout(), &layout)));
}

#[test]
fn test_chunk_header_helpers() {
    // A four character code, then a null-terminated label
    let data = b"fmt \x00\x00\x00\x10wave\x00rest";
    let mut reader = Reader::new(data);
    assert_eq!(string::read_four_cc(&mut reader).unwrap(), "fmt ");
    assert_eq!(reader.get_u32().unwrap(), 16);
    assert_eq!(
        string::read_null_terminated(&mut reader, Charset::Ascii).unwrap(),
        "wave"
    );
    assert_eq!(reader.rest(), b"rest");
}
