#![no_main]

use arbitrary::Arbitrary;
use commonware_marshal::{
    Array, Charset, Codec, Config, EnumType, Endian, Error, Field, Kind, Primitive, Registry,
    Schema, StringPolicy,
};
use libfuzzer_sys::fuzz_target;
use std::sync::{Arc, OnceLock};

#[derive(Arbitrary, Debug)]
struct FuzzInput<'a> {
    little_endian: bool,
    max_depth: u8,
    max_length: Option<u16>,
    data: &'a [u8],
}

fn registry() -> Arc<Registry> {
    static REGISTRY: OnceLock<Arc<Registry>> = OnceLock::new();
    REGISTRY
        .get_or_init(|| {
            let kind = Arc::new(EnumType::new("Kind", ["Audio", "Video", "Text"]));
            let registry = Registry::new()
                .with(
                    Schema::builder("Chunk")
                        .field(Field::string(
                            "id",
                            StringPolicy::new(Charset::Ascii)
                                .with_min_length(4)
                                .with_max_length(4),
                        ))
                        .field(Field::primitive("version", Primitive::U16))
                        .build(),
                )
                .unwrap()
                .with(
                    Schema::builder("Track")
                        .base("Chunk")
                        .field(Field::enumeration("kind", kind).with_length_size(1))
                        .field(Field::primitive("enabled", Primitive::Bool))
                        .field(Field::primitive("gain", Primitive::F32))
                        .field(Field::string(
                            "name",
                            StringPolicy::new(Charset::Utf8)
                                .with_max_length(32)
                                .with_align(4),
                        ))
                        .field(
                            Field::string(
                                "note",
                                StringPolicy::new(Charset::Utf16).with_null_terminated(false),
                            )
                            .with_length_size(1),
                        )
                        .field(
                            Field::array("samples", Array::prefixed(Primitive::I16))
                                .with_length_size(2),
                        )
                        .field(Field::array("range", Array::fixed(Primitive::U8, 2)))
                        .field(
                            Field::array("children", Array::prefixed(Kind::Record("Track".into())))
                                .with_length_size(1),
                        )
                        .build(),
                )
                .unwrap();
            Arc::new(registry)
        })
        .clone()
}

fn fuzz(input: FuzzInput) {
    let mut cfg = Config::default().with_max_depth(usize::from(input.max_depth % 16) + 1);
    if let Some(max) = input.max_length {
        cfg = cfg.with_lengths(..=usize::from(max));
    }
    let codec = Codec::new(registry()).with_config(cfg);
    let endian = if input.little_endian {
        Endian::Little
    } else {
        Endian::Big
    };

    // Arbitrary input must never panic
    let Ok(decoded) = codec.from_slice(input.data, "Track", endian) else {
        return;
    };

    // Lossy text may grow past a length width
    let first = match codec.to_bytes(&decoded.value, endian) {
        Ok(bytes) => bytes,
        Err(Error::LengthExceeded(_, _)) => return,
        Err(err) => panic!("failed to encode decoded record: {err}"),
    };

    // Anything this codec writes must read back and re-encode identically
    let again = codec
        .from_slice(&first, "Track", endian)
        .expect("failed to decode encoded record");
    let second = codec
        .to_bytes(&again.value, endian)
        .expect("failed to re-encode record");
    assert_eq!(first, second);
}

fuzz_target!(|input: FuzzInput| {
    fuzz(input);
});
