//! Avro binary encoder.
//!
//! Values are checked against their field type as they are written, so a
//! value that does not fit the schema fails instead of producing bytes a
//! reader would misinterpret.

use crate::binary::value::json_to_avro_value;
use crate::binary::varint::{encode_int, encode_long};
use crate::binary::AvroValue;
use crate::error::EncodeError;
use crate::schema::{Definition, DefinitionKind, Field, FieldType, Namespace, Reference};

/// Append the encoding of `value` under `field` to `out`.
///
/// # Arguments
/// * `namespace` - Resolved namespace that `field`'s references point into
/// * `field` - The schema of the value
/// * `value` - The value to encode
/// * `out` - Sink the bytes are appended to
///
/// # Errors
/// - `EncodeError::TypeMismatch` if the value's kind does not fit the type
/// - `EncodeError::InvalidValue` for out-of-range union indices, unknown
///   enum symbols or wrong fixed sizes
/// - `EncodeError::MissingField` if a record field is absent and has no default
/// - `EncodeError::UnresolvedReference` if the namespace was not resolved
///
/// On error `out` may hold a partial encoding.
pub fn encode_value(
    namespace: &Namespace,
    field: &Field,
    value: &AvroValue,
    out: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    encode_type(namespace, &field.field_type, value, out)
}

fn encode_type(
    namespace: &Namespace,
    field_type: &FieldType,
    value: &AvroValue,
    out: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match (field_type, value) {
        (FieldType::Null, AvroValue::Null) => Ok(()),
        (FieldType::Boolean, AvroValue::Boolean(b)) => {
            out.push(*b as u8);
            Ok(())
        }
        (FieldType::Int, AvroValue::Int(i)) => {
            encode_int(*i, out);
            Ok(())
        }
        (FieldType::Long, AvroValue::Long(l)) => {
            encode_long(*l, out);
            Ok(())
        }
        (FieldType::Float, AvroValue::Float(f)) => {
            out.extend_from_slice(&f.to_le_bytes());
            Ok(())
        }
        (FieldType::Double, AvroValue::Double(d)) => {
            out.extend_from_slice(&d.to_le_bytes());
            Ok(())
        }
        (FieldType::Bytes, AvroValue::Bytes(b)) => {
            encode_bytes(b, out);
            Ok(())
        }
        (FieldType::String, AvroValue::String(s)) => {
            encode_bytes(s.as_bytes(), out);
            Ok(())
        }
        (FieldType::Array(item), AvroValue::Array(items)) => {
            if !items.is_empty() {
                encode_long(items.len() as i64, out);
                for v in items {
                    encode_type(namespace, &item.field_type, v, out)?;
                }
            }
            encode_long(0, out);
            Ok(())
        }
        (FieldType::Map(values), AvroValue::Map(entries)) => {
            if !entries.is_empty() {
                encode_long(entries.len() as i64, out);
                for (key, v) in entries {
                    encode_bytes(key.as_bytes(), out);
                    encode_type(namespace, &values.field_type, v, out)?;
                }
            }
            encode_long(0, out);
            Ok(())
        }
        (FieldType::Union(branches), value) => encode_union(namespace, branches, value, out),
        (FieldType::Reference(reference), value) => {
            let definition = lookup(namespace, reference)?;
            encode_named(namespace, definition, value, out)
        }
        (field_type, value) => Err(mismatch(field_type.describe(), value)),
    }
}

/// An explicit `Union(index, value)` picks its branch; any other value goes
/// to the first branch whose type accepts its kind.
fn encode_union(
    namespace: &Namespace,
    branches: &[Field],
    value: &AvroValue,
    out: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    let (index, inner) = match value {
        AvroValue::Union(index, inner) => {
            let index = usize::try_from(*index)
                .ok()
                .filter(|i| *i < branches.len())
                .ok_or_else(|| {
                    EncodeError::InvalidValue(format!(
                        "Union index {} out of range (0..{})",
                        index,
                        branches.len()
                    ))
                })?;
            (index, inner.as_ref())
        }
        other => {
            let index = branches
                .iter()
                .position(|b| accepts(namespace, &b.field_type, other))
                .ok_or_else(|| mismatch(format!("union of {}", branches.len()), other))?;
            (index, other)
        }
    };

    encode_long(index as i64, out);
    encode_type(namespace, &branches[index].field_type, inner, out)
}

fn encode_named(
    namespace: &Namespace,
    definition: &Definition,
    value: &AvroValue,
    out: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match (&definition.kind, value) {
        (DefinitionKind::Record(record), AvroValue::Record(values)) => {
            for field in &record.fields {
                match values.iter().find(|(name, _)| name == &field.name) {
                    Some((_, v)) => encode_type(namespace, &field.field_type, v, out)?,
                    None => {
                        let default = field.default.as_ref().ok_or_else(|| {
                            EncodeError::MissingField {
                                record: definition.name.clone(),
                                field: field.name.clone(),
                            }
                        })?;
                        let v = json_to_avro_value(namespace, &field.field_type, default)?;
                        encode_type(namespace, &field.field_type, &v, out)?;
                    }
                }
            }
            Ok(())
        }
        (DefinitionKind::Enum(e), AvroValue::Enum(index, symbol)) => {
            match e.symbol_index(symbol) {
                Some(i) if i as i64 == i64::from(*index) => {
                    encode_int(*index, out);
                    Ok(())
                }
                _ => Err(EncodeError::InvalidValue(format!(
                    "Enum value ({}, '{}') is not a symbol of {}",
                    index, symbol, definition.name
                ))),
            }
        }
        (DefinitionKind::Fixed(fixed), AvroValue::Fixed(bytes)) => {
            if bytes.len() != fixed.size {
                return Err(EncodeError::InvalidValue(format!(
                    "Fixed {} needs {} bytes, got {}",
                    definition.name,
                    fixed.size,
                    bytes.len()
                )));
            }
            out.extend_from_slice(bytes);
            Ok(())
        }
        (_, value) => Err(mismatch(definition.name.to_string(), value)),
    }
}

/// Whether a bare value could be written under `field_type`.
///
/// Only the outer kind is compared; the encoder validates the rest.
fn accepts(namespace: &Namespace, field_type: &FieldType, value: &AvroValue) -> bool {
    match (field_type, value) {
        (FieldType::Null, AvroValue::Null)
        | (FieldType::Boolean, AvroValue::Boolean(_))
        | (FieldType::Int, AvroValue::Int(_))
        | (FieldType::Long, AvroValue::Long(_))
        | (FieldType::Float, AvroValue::Float(_))
        | (FieldType::Double, AvroValue::Double(_))
        | (FieldType::Bytes, AvroValue::Bytes(_))
        | (FieldType::String, AvroValue::String(_))
        | (FieldType::Array(_), AvroValue::Array(_))
        | (FieldType::Map(_), AvroValue::Map(_)) => true,
        (FieldType::Reference(reference), value) => {
            match reference.definition_id().and_then(|id| namespace.definition(id)) {
                Some(definition) => matches!(
                    (&definition.kind, value),
                    (DefinitionKind::Record(_), AvroValue::Record(_))
                        | (DefinitionKind::Enum(_), AvroValue::Enum(..))
                        | (DefinitionKind::Fixed(_), AvroValue::Fixed(_))
                ),
                None => false,
            }
        }
        _ => false,
    }
}

fn lookup<'a>(namespace: &'a Namespace, reference: &Reference) -> Result<&'a Definition, EncodeError> {
    reference
        .definition_id()
        .and_then(|id| namespace.definition(id))
        .ok_or_else(|| EncodeError::UnresolvedReference(reference.target.clone()))
}

#[inline]
fn encode_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    encode_long(bytes.len() as i64, out);
    out.extend_from_slice(bytes);
}

fn mismatch(expected: String, value: &AvroValue) -> EncodeError {
    EncodeError::TypeMismatch {
        expected,
        found: value.kind(),
    }
}
