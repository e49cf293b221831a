//! Property-based tests.
//!
//! These tests use proptest to check encoding invariants across many
//! generated inputs.

use proptest::prelude::*;

use contrail::binary::{decode_int, decode_long, decode_varint, encode_int, encode_long, encode_varint};
use contrail::codec::Codec;
use contrail::{AvroValue, Namespace};

// ============================================================================
// Value Generators
// ============================================================================

const READING_SCHEMA: &str = r#"{
    "type": "record", "name": "Reading", "namespace": "sensors",
    "fields": [
        {"name": "id", "type": "long"},
        {"name": "label", "type": ["null", "string"]},
        {"name": "values", "type": {"type": "array", "items": "double"}},
        {"name": "flags", "type": {"type": "map", "values": "boolean"}},
        {"name": "unit", "type": {"type": "enum", "name": "Unit", "symbols": ["C", "F", "K"]}},
        {"name": "raw", "type": "bytes"}
    ]
}"#;

/// Generate a value matching `READING_SCHEMA`.
fn arb_reading() -> impl Strategy<Value = AvroValue> {
    (
        any::<i64>(),
        proptest::option::of(".{0,12}"),
        proptest::collection::vec(-1.0e9f64..1.0e9, 0..8),
        proptest::collection::vec(("[a-z]{1,6}", any::<bool>()), 0..5),
        0usize..3,
        proptest::collection::vec(any::<u8>(), 0..32),
    )
        .prop_map(|(id, label, values, flags, unit, raw)| {
            let label = match label {
                Some(s) => AvroValue::Union(1, Box::new(AvroValue::String(s))),
                None => AvroValue::Union(0, Box::new(AvroValue::Null)),
            };
            let symbol = ["C", "F", "K"][unit];
            AvroValue::Record(vec![
                ("id".into(), AvroValue::Long(id)),
                ("label".into(), label),
                (
                    "values".into(),
                    AvroValue::Array(values.into_iter().map(AvroValue::Double).collect()),
                ),
                (
                    "flags".into(),
                    AvroValue::Map(
                        flags
                            .into_iter()
                            .map(|(k, v)| (k, AvroValue::Boolean(v)))
                            .collect(),
                    ),
                ),
                ("unit".into(), AvroValue::Enum(unit as i32, symbol.into())),
                ("raw".into(), AvroValue::Bytes(raw)),
            ])
        })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_varint_roundtrip(value in any::<u64>()) {
        let mut out = Vec::new();
        encode_varint(value, &mut out);
        prop_assert!(out.len() <= 10);
        let mut cursor = out.as_slice();
        prop_assert_eq!(decode_varint(&mut cursor).unwrap(), value);
        prop_assert!(cursor.is_empty());
    }

    #[test]
    fn prop_int_zigzag_roundtrip(value in any::<i32>()) {
        let mut out = Vec::new();
        encode_int(value, &mut out);
        prop_assert!(out.len() <= 5);
        prop_assert_eq!(decode_int(&mut out.as_slice()).unwrap(), value);
    }

    #[test]
    fn prop_small_magnitudes_are_short(value in -64i64..64) {
        let mut out = Vec::new();
        encode_long(value, &mut out);
        prop_assert_eq!(out.len(), 1);
        prop_assert_eq!(decode_long(&mut out.as_slice()).unwrap(), value);
    }

    #[test]
    fn prop_record_roundtrip(value in arb_reading()) {
        let namespace = Namespace::from_schema(READING_SCHEMA).unwrap();
        let schema = namespace.schema(0).unwrap();
        let bytes = schema.encode(&value).unwrap();
        let mut cursor = bytes.as_slice();
        prop_assert_eq!(schema.decode(&mut cursor).unwrap(), value);
        prop_assert!(cursor.is_empty());
    }

    #[test]
    fn prop_truncated_record_never_decodes(value in arb_reading(), cut in 1usize..16) {
        let namespace = Namespace::from_schema(READING_SCHEMA).unwrap();
        let schema = namespace.schema(0).unwrap();
        let bytes = schema.encode(&value).unwrap();
        let keep = bytes.len().saturating_sub(cut);
        let mut cursor = &bytes[..keep];
        prop_assert!(schema.decode(&mut cursor).is_err());
    }

    #[cfg(all(feature = "snappy", feature = "deflate"))]
    #[test]
    fn prop_codec_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
        for codec in [Codec::Null, Codec::Deflate, Codec::Snappy] {
            let payload = codec.compress(&data).unwrap();
            prop_assert_eq!(codec.decompress(&payload).unwrap(), data.clone());
        }
    }
}
