//! Avro binary decoder for primitive and complex types.
//!
//! Every decoder takes a `&mut &[u8]` cursor and advances it past what it
//! consumed. Truncated input is always an error, never a partial value.

use crate::binary::varint::decode_zigzag;
use crate::binary::AvroValue;
use crate::error::DecodeError;
use crate::schema::{DefinitionKind, Field, FieldType, Namespace};

/// Decode a boolean value.
///
/// Avro booleans are encoded as a single byte: 0x00 for false, 0x01 for true.
#[inline]
pub fn decode_boolean(data: &mut &[u8]) -> Result<bool, DecodeError> {
    let (&byte, rest) = data.split_first().ok_or(DecodeError::UnexpectedEof)?;
    *data = rest;
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(DecodeError::InvalidData(format!(
            "Invalid boolean value: {}, expected 0 or 1",
            byte
        ))),
    }
}

/// Decode a 32-bit signed integer (zigzag varint encoded).
#[inline]
pub fn decode_int(data: &mut &[u8]) -> Result<i32, DecodeError> {
    let long = decode_long(data)?;
    i32::try_from(long).map_err(|_| {
        DecodeError::InvalidData(format!("Integer overflow: {} does not fit in i32", long))
    })
}

/// Decode a 64-bit signed integer (zigzag varint encoded).
#[inline]
pub fn decode_long(data: &mut &[u8]) -> Result<i64, DecodeError> {
    decode_zigzag(data)
}

/// Decode a 32-bit IEEE 754 floating-point number (little-endian).
#[inline]
pub fn decode_float(data: &mut &[u8]) -> Result<f32, DecodeError> {
    let bytes = take(data, 4)?;
    Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Decode a 64-bit IEEE 754 floating-point number (little-endian).
#[inline]
pub fn decode_double(data: &mut &[u8]) -> Result<f64, DecodeError> {
    let bytes = take(data, 8)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    Ok(f64::from_le_bytes(buf))
}

/// Decode a byte array (length-prefixed).
#[inline]
pub fn decode_bytes(data: &mut &[u8]) -> Result<Vec<u8>, DecodeError> {
    let len = decode_length(data, "bytes")?;
    Ok(take(data, len)?.to_vec())
}

/// Decode a UTF-8 string (length-prefixed).
#[inline]
pub fn decode_string(data: &mut &[u8]) -> Result<String, DecodeError> {
    let bytes = decode_bytes(data)?;
    String::from_utf8(bytes).map_err(DecodeError::from)
}

/// Decode a fixed-size byte array.
#[inline]
pub fn decode_fixed(data: &mut &[u8], size: usize) -> Result<Vec<u8>, DecodeError> {
    Ok(take(data, size)?.to_vec())
}

/// Deepest nesting of arrays, maps, unions and records the decoder follows.
pub const MAX_NESTING_DEPTH: usize = 512;

/// Most items one array may hold when its items take no bytes on the wire.
pub const MAX_ZERO_WIDTH_ITEMS: u64 = 1 << 20;

/// Decode any value described by `field`.
///
/// This is the main entry point for decoding Avro data. It dispatches on the
/// field type and follows references into `namespace`.
///
/// # Arguments
/// * `namespace` - Resolved namespace that `field`'s references point into
/// * `field` - The schema describing the value to decode
/// * `data` - The input byte slice (cursor is advanced)
///
/// # Errors
/// Besides malformed input, returns [`DecodeError::InvalidData`] when values
/// nest deeper than [`MAX_NESTING_DEPTH`] or when a block count cannot be
/// backed by the remaining input.
pub fn decode_value(
    namespace: &Namespace,
    field: &Field,
    data: &mut &[u8],
) -> Result<AvroValue, DecodeError> {
    decode_type(namespace, &field.field_type, data, 0)
}

fn decode_type(
    namespace: &Namespace,
    field_type: &FieldType,
    data: &mut &[u8],
    depth: usize,
) -> Result<AvroValue, DecodeError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(DecodeError::InvalidData(format!(
            "Value nests deeper than {} levels",
            MAX_NESTING_DEPTH
        )));
    }

    match field_type {
        FieldType::Null => Ok(AvroValue::Null),
        FieldType::Boolean => Ok(AvroValue::Boolean(decode_boolean(data)?)),
        FieldType::Int => Ok(AvroValue::Int(decode_int(data)?)),
        FieldType::Long => Ok(AvroValue::Long(decode_long(data)?)),
        FieldType::Float => Ok(AvroValue::Float(decode_float(data)?)),
        FieldType::Double => Ok(AvroValue::Double(decode_double(data)?)),
        FieldType::Bytes => Ok(AvroValue::Bytes(decode_bytes(data)?)),
        FieldType::String => Ok(AvroValue::String(decode_string(data)?)),
        FieldType::Array(item) => {
            let zero_width = is_zero_width(namespace, &item.field_type, 0);
            let mut items = Vec::new();
            decode_blocks(data, zero_width, |data| {
                items.push(decode_type(namespace, &item.field_type, data, depth + 1)?);
                Ok(())
            })?;
            Ok(AvroValue::Array(items))
        }
        FieldType::Map(values) => {
            let mut entries = Vec::new();
            // Every entry carries at least its key length.
            decode_blocks(data, false, |data| {
                let key = decode_string(data)?;
                let value = decode_type(namespace, &values.field_type, data, depth + 1)?;
                entries.push((key, value));
                Ok(())
            })?;
            Ok(AvroValue::Map(entries))
        }
        FieldType::Union(branches) => {
            let index = decode_long(data)?;
            let branch = usize::try_from(index)
                .ok()
                .and_then(|i| branches.get(i))
                .ok_or_else(|| {
                    DecodeError::InvalidData(format!(
                        "Union index {} out of range (0..{})",
                        index,
                        branches.len()
                    ))
                })?;
            let value = decode_type(namespace, &branch.field_type, data, depth + 1)?;
            Ok(AvroValue::Union(index as i32, Box::new(value)))
        }
        FieldType::Reference(reference) => {
            let definition = reference
                .definition_id()
                .and_then(|id| namespace.definition(id))
                .ok_or_else(|| DecodeError::UnresolvedReference(reference.target.clone()))?;

            match &definition.kind {
                DefinitionKind::Record(record) => {
                    let mut fields = Vec::with_capacity(record.fields.len());
                    for field in &record.fields {
                        let value = decode_type(namespace, &field.field_type, data, depth + 1)?;
                        fields.push((field.name.clone(), value));
                    }
                    Ok(AvroValue::Record(fields))
                }
                DefinitionKind::Enum(e) => {
                    let index = decode_int(data)?;
                    let symbol = usize::try_from(index)
                        .ok()
                        .and_then(|i| e.symbols.get(i))
                        .ok_or_else(|| {
                            DecodeError::InvalidData(format!(
                                "Enum index {} out of range for enum '{}' with {} symbols",
                                index,
                                definition.name,
                                e.symbols.len()
                            ))
                        })?;
                    Ok(AvroValue::Enum(index, symbol.clone()))
                }
                DefinitionKind::Fixed(fixed) => Ok(AvroValue::Fixed(decode_fixed(data, fixed.size)?)),
            }
        }
    }
}

/// Whether values of this type occupy no bytes: null, zero-size fixed, and
/// records made only of those.
fn is_zero_width(namespace: &Namespace, field_type: &FieldType, depth: usize) -> bool {
    match field_type {
        FieldType::Null => true,
        FieldType::Reference(reference) if depth <= MAX_NESTING_DEPTH => {
            match reference.definition_id().and_then(|id| namespace.definition(id)) {
                Some(definition) => match &definition.kind {
                    DefinitionKind::Record(record) => record
                        .fields
                        .iter()
                        .all(|f| is_zero_width(namespace, &f.field_type, depth + 1)),
                    DefinitionKind::Fixed(fixed) => fixed.size == 0,
                    DefinitionKind::Enum(_) => false,
                },
                None => false,
            }
        }
        _ => false,
    }
}

/// Walk the blocks of an array or map, calling `item` once per element.
///
/// Each block is a long count followed by that many items; a negative count
/// means its absolute value is the count and a byte size follows. A zero
/// count ends the sequence.
///
/// Items that take space need at least one byte each, so a count larger than
/// the remaining input is rejected up front. Zero-width items are capped at
/// [`MAX_ZERO_WIDTH_ITEMS`] per collection instead.
fn decode_blocks<F>(data: &mut &[u8], zero_width: bool, mut item: F) -> Result<(), DecodeError>
where
    F: FnMut(&mut &[u8]) -> Result<(), DecodeError>,
{
    let mut total: u64 = 0;
    loop {
        let count = decode_long(data)?;
        if count == 0 {
            return Ok(());
        }
        if count < 0 {
            let _byte_size = decode_long(data)?;
        }

        let count = count.unsigned_abs();
        if zero_width {
            total = total.saturating_add(count);
            if total > MAX_ZERO_WIDTH_ITEMS {
                return Err(DecodeError::InvalidData(format!(
                    "Collection of empty items exceeds {} entries",
                    MAX_ZERO_WIDTH_ITEMS
                )));
            }
        } else if count > data.len() as u64 {
            return Err(DecodeError::InvalidData(format!(
                "Block count {} exceeds the {} remaining bytes",
                count,
                data.len()
            )));
        }

        for _ in 0..count {
            item(data)?;
        }
    }
}

fn decode_length(data: &mut &[u8], what: &str) -> Result<usize, DecodeError> {
    let len = decode_long(data)?;
    usize::try_from(len)
        .map_err(|_| DecodeError::InvalidData(format!("Negative {} length: {}", what, len)))
}

#[inline]
fn take<'a>(data: &mut &'a [u8], len: usize) -> Result<&'a [u8], DecodeError> {
    if data.len() < len {
        return Err(DecodeError::UnexpectedEof);
    }
    let (head, rest) = data.split_at(len);
    *data = rest;
    Ok(head)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(schema: &str, bytes: &[u8]) -> Result<AvroValue, DecodeError> {
        let namespace = Namespace::from_schema(schema).unwrap();
        let mut cursor = bytes;
        let value = namespace.schema(0).unwrap().decode(&mut cursor)?;
        assert!(cursor.is_empty(), "trailing bytes: {:?}", cursor);
        Ok(value)
    }

    // ========================================================================
    // Primitive decoding tests
    // ========================================================================

    #[test]
    fn test_decode_boolean() {
        let mut cursor: &[u8] = &[0x00, 0x01, 0x02];
        assert!(!decode_boolean(&mut cursor).unwrap());
        assert!(decode_boolean(&mut cursor).unwrap());
        assert!(matches!(
            decode_boolean(&mut cursor),
            Err(DecodeError::InvalidData(_))
        ));
    }

    #[test]
    fn test_decode_int_overflow() {
        // zigzag(2^31) does not fit in i32
        let mut cursor: &[u8] = &[0x80, 0x80, 0x80, 0x80, 0x10];
        assert!(matches!(
            decode_int(&mut cursor),
            Err(DecodeError::InvalidData(_))
        ));
    }

    #[test]
    fn test_decode_float_and_double() {
        let bytes = 3.5f32.to_le_bytes();
        let mut cursor = &bytes[..];
        assert_eq!(decode_float(&mut cursor).unwrap(), 3.5);

        let bytes = (-0.25f64).to_le_bytes();
        let mut cursor = &bytes[..];
        assert_eq!(decode_double(&mut cursor).unwrap(), -0.25);

        let mut cursor: &[u8] = &[0x00, 0x00, 0x00];
        assert!(matches!(
            decode_float(&mut cursor),
            Err(DecodeError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_decode_bytes_errors() {
        // Negative length
        let mut cursor: &[u8] = &[0x01];
        assert!(matches!(
            decode_bytes(&mut cursor),
            Err(DecodeError::InvalidData(_))
        ));

        // Length 3, only 2 bytes present
        let mut cursor: &[u8] = &[0x06, b'a', b'b'];
        assert!(matches!(
            decode_bytes(&mut cursor),
            Err(DecodeError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_decode_string_invalid_utf8() {
        let mut cursor: &[u8] = &[0x04, 0xC3, 0x28];
        assert!(matches!(
            decode_string(&mut cursor),
            Err(DecodeError::InvalidUtf8(_))
        ));
    }

    // ========================================================================
    // Complex decoding tests
    // ========================================================================

    #[test]
    fn test_decode_array_with_negative_block_count() {
        // Block of -2 items with byte size 2, then the terminator.
        let value = decode(
            r#"{"type": "array", "items": "int"}"#,
            &[0x03, 0x04, 0x02, 0x04, 0x00],
        )
        .unwrap();
        assert_eq!(
            value,
            AvroValue::Array(vec![AvroValue::Int(1), AvroValue::Int(2)])
        );
    }

    #[test]
    fn test_decode_map() {
        let value = decode(
            r#"{"type": "map", "values": "long"}"#,
            &[0x02, 0x02, b'k', 0x54, 0x00],
        )
        .unwrap();
        assert_eq!(
            value,
            AvroValue::Map(vec![("k".to_string(), AvroValue::Long(42))])
        );
    }

    #[test]
    fn test_decode_union() {
        let value = decode(r#"["null", "string"]"#, &[0x02, 0x02, b'x']).unwrap();
        assert_eq!(
            value,
            AvroValue::Union(1, Box::new(AvroValue::String("x".to_string())))
        );

        let err = decode(r#"["null", "string"]"#, &[0x04]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidData(_)));

        let err = decode(r#"["null", "string"]"#, &[0x01]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidData(_)));
    }

    #[test]
    fn test_decode_enum_out_of_range() {
        let schema = r#"{"type": "enum", "name": "E", "symbols": ["A", "B"]}"#;
        assert_eq!(
            decode(schema, &[0x02]).unwrap(),
            AvroValue::Enum(1, "B".to_string())
        );
        assert!(decode(schema, &[0x04]).is_err());
    }

    #[test]
    fn test_decode_truncated_record() {
        let schema = r#"{"type": "record", "name": "R", "fields": [
            {"name": "a", "type": "long"},
            {"name": "b", "type": "string"}
        ]}"#;
        let err = decode(schema, &[0x02, 0x06, b'a']).unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedEof));
    }

    #[test]
    fn test_deep_recursion_is_an_error() {
        let schema = r#"{"type": "record", "name": "L", "fields": [
            {"name": "n", "type": ["null", "L"]}
        ]}"#;

        // A chain well inside the limit decodes.
        let mut shallow = vec![0x02; 100];
        shallow.push(0x00);
        assert!(decode(schema, &shallow).is_ok());

        let hostile = vec![0x02; 200_000];
        let namespace = Namespace::from_schema(schema).unwrap();
        let err = namespace.schema(0).unwrap().decode(&mut hostile.as_slice()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidData(ref m) if m.contains("nests deeper")));
    }

    #[test]
    fn test_zero_width_items_are_capped() {
        // A single block claiming 20 million nulls.
        let mut bytes = Vec::new();
        crate::binary::encode_long(20_000_000, &mut bytes);
        bytes.push(0x00);
        let err = decode(r#"{"type": "array", "items": "null"}"#, &bytes).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidData(_)));

        let empty_record = r#"{"type": "array", "items": {"type": "record", "name": "E", "fields": []}}"#;
        let err = decode(empty_record, &bytes).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidData(_)));

        // Small collections of nulls are fine.
        assert_eq!(
            decode(r#"{"type": "array", "items": "null"}"#, &[0x06, 0x00]).unwrap(),
            AvroValue::Array(vec![AvroValue::Null; 3])
        );
    }

    #[test]
    fn test_block_count_larger_than_input() {
        // 1000 longs claimed, two bytes of input.
        let err = decode(r#"{"type": "array", "items": "long"}"#, &[0xD0, 0x0F, 0x02, 0x00]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidData(_)));
    }

    #[test]
    fn test_decode_fixed() {
        let schema = r#"{"type": "fixed", "name": "F", "size": 3}"#;
        assert_eq!(
            decode(schema, &[1, 2, 3]).unwrap(),
            AvroValue::Fixed(vec![1, 2, 3])
        );
        assert!(decode(schema, &[1, 2]).is_err());
    }
}
