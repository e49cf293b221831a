//! In-memory representation of Avro values.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::EncodeError;
use crate::schema::{DefinitionKind, FieldType, Namespace};

/// A decoded (or to-be-encoded) Avro value.
///
/// Records and maps keep their entries in order; records in field order.
#[derive(Debug, Clone, PartialEq)]
pub enum AvroValue {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    Long(i64),
    /// 32-bit floating point
    Float(f32),
    /// 64-bit floating point
    Double(f64),
    /// Byte array
    Bytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// Record with named fields
    Record(Vec<(String, AvroValue)>),
    /// Enum variant (index and symbol name)
    Enum(i32, String),
    /// Array of values
    Array(Vec<AvroValue>),
    /// Map with string keys
    Map(Vec<(String, AvroValue)>),
    /// Union variant (branch index and value)
    Union(i32, Box<AvroValue>),
    /// Fixed-size byte array
    Fixed(Vec<u8>),
}

impl AvroValue {
    /// Name of the value's kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AvroValue::Null => "null",
            AvroValue::Boolean(_) => "boolean",
            AvroValue::Int(_) => "int",
            AvroValue::Long(_) => "long",
            AvroValue::Float(_) => "float",
            AvroValue::Double(_) => "double",
            AvroValue::Bytes(_) => "bytes",
            AvroValue::String(_) => "string",
            AvroValue::Record(_) => "record",
            AvroValue::Enum(..) => "enum",
            AvroValue::Array(_) => "array",
            AvroValue::Map(_) => "map",
            AvroValue::Union(..) => "union",
            AvroValue::Fixed(_) => "fixed",
        }
    }

    /// Look up a record field by name.
    pub fn field(&self, name: &str) -> Option<&AvroValue> {
        match self {
            AvroValue::Record(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// The value inside a union, or the value itself.
    pub fn unwrap_union(&self) -> &AvroValue {
        match self {
            AvroValue::Union(_, inner) => inner.unwrap_union(),
            other => other,
        }
    }

    /// Convert to a `serde_json::Value` in Avro's JSON encoding.
    ///
    /// Bytes and fixed become strings with one code point per byte; unions
    /// are written as their branch value.
    pub fn to_json(&self) -> Value {
        match self {
            AvroValue::Null => Value::Null,
            AvroValue::Boolean(b) => Value::Bool(*b),
            AvroValue::Int(i) => Value::from(*i),
            AvroValue::Long(l) => Value::from(*l),
            AvroValue::Float(f) => Value::from(*f as f64),
            AvroValue::Double(d) => Value::from(*d),
            AvroValue::Bytes(b) | AvroValue::Fixed(b) => {
                Value::String(b.iter().map(|&byte| byte as char).collect())
            }
            AvroValue::String(s) => Value::String(s.clone()),
            AvroValue::Record(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect::<Map<_, _>>(),
            ),
            AvroValue::Enum(_, symbol) => Value::String(symbol.clone()),
            AvroValue::Array(items) => Value::Array(items.iter().map(|v| v.to_json()).collect()),
            AvroValue::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect::<Map<_, _>>(),
            ),
            AvroValue::Union(_, value) => value.to_json(),
        }
    }
}

/// Plain rendering used for metric tags: strings and symbols verbatim,
/// numbers in decimal, sequences in brackets.
impl fmt::Display for AvroValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvroValue::Null => write!(f, "null"),
            AvroValue::Boolean(b) => write!(f, "{}", b),
            AvroValue::Int(i) => write!(f, "{}", i),
            AvroValue::Long(l) => write!(f, "{}", l),
            AvroValue::Float(v) => write!(f, "{}", v),
            AvroValue::Double(v) => write!(f, "{}", v),
            AvroValue::String(s) => write!(f, "{}", s),
            AvroValue::Enum(_, symbol) => write!(f, "{}", symbol),
            AvroValue::Union(_, inner) => write!(f, "{}", inner),
            AvroValue::Bytes(b) | AvroValue::Fixed(b) => write_joined(f, "[", b.iter(), "]"),
            AvroValue::Array(items) => write_joined(f, "[", items.iter(), "]"),
            AvroValue::Map(entries) => {
                write!(f, "map[")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}:{}", key, value)?;
                }
                write!(f, "]")
            }
            AvroValue::Record(fields) => write_joined(f, "{", fields.iter().map(|(_, v)| v), "}"),
        }
    }
}

fn write_joined<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    items: impl Iterator<Item = T>,
    close: &str,
) -> fmt::Result {
    write!(f, "{}", open)?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "{}", close)
}

/// Convert a JSON default into a value of the given type.
///
/// Follows Avro's JSON encoding of defaults: a union default belongs to the
/// first branch, bytes and fixed are strings of code points below 256.
pub fn json_to_avro_value(
    namespace: &Namespace,
    field_type: &FieldType,
    json: &Value,
) -> Result<AvroValue, EncodeError> {
    match (json, field_type) {
        (Value::Null, FieldType::Null) => Ok(AvroValue::Null),
        (Value::Bool(b), FieldType::Boolean) => Ok(AvroValue::Boolean(*b)),
        (Value::Number(n), FieldType::Int) => {
            let v = n
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| EncodeError::InvalidValue(format!("Cannot convert {} to int", n)))?;
            Ok(AvroValue::Int(v))
        }
        (Value::Number(n), FieldType::Long) => {
            let v = n
                .as_i64()
                .ok_or_else(|| EncodeError::InvalidValue(format!("Cannot convert {} to long", n)))?;
            Ok(AvroValue::Long(v))
        }
        (Value::Number(n), FieldType::Float) => {
            let v = n
                .as_f64()
                .ok_or_else(|| EncodeError::InvalidValue(format!("Cannot convert {} to float", n)))?;
            Ok(AvroValue::Float(v as f32))
        }
        (Value::Number(n), FieldType::Double) => {
            let v = n.as_f64().ok_or_else(|| {
                EncodeError::InvalidValue(format!("Cannot convert {} to double", n))
            })?;
            Ok(AvroValue::Double(v))
        }
        (Value::String(s), FieldType::String) => Ok(AvroValue::String(s.clone())),
        (Value::String(s), FieldType::Bytes) => Ok(AvroValue::Bytes(latin1_bytes(s)?)),
        (Value::Array(arr), FieldType::Array(item)) => {
            let items = arr
                .iter()
                .map(|v| json_to_avro_value(namespace, &item.field_type, v))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(AvroValue::Array(items))
        }
        (Value::Object(obj), FieldType::Map(values)) => {
            let entries = obj
                .iter()
                .map(|(k, v)| Ok((k.clone(), json_to_avro_value(namespace, &values.field_type, v)?)))
                .collect::<Result<Vec<_>, EncodeError>>()?;
            Ok(AvroValue::Map(entries))
        }
        (json, FieldType::Union(branches)) => {
            let first = branches
                .first()
                .ok_or_else(|| EncodeError::InvalidValue("Empty union".to_string()))?;
            let value = json_to_avro_value(namespace, &first.field_type, json)?;
            Ok(AvroValue::Union(0, Box::new(value)))
        }
        (json, FieldType::Reference(reference)) => {
            let definition = reference
                .definition_id()
                .and_then(|id| namespace.definition(id))
                .ok_or_else(|| EncodeError::UnresolvedReference(reference.target.clone()))?;

            match (json, &definition.kind) {
                (Value::Object(obj), DefinitionKind::Record(record)) => {
                    let fields = record
                        .fields
                        .iter()
                        .map(|field| {
                            let source = obj.get(&field.name).or(field.default.as_ref()).ok_or_else(
                                || EncodeError::MissingField {
                                    record: definition.name.clone(),
                                    field: field.name.clone(),
                                },
                            )?;
                            let value = json_to_avro_value(namespace, &field.field_type, source)?;
                            Ok((field.name.clone(), value))
                        })
                        .collect::<Result<Vec<_>, EncodeError>>()?;
                    Ok(AvroValue::Record(fields))
                }
                (Value::String(s), DefinitionKind::Enum(e)) => {
                    let index = e.symbol_index(s).ok_or_else(|| {
                        EncodeError::InvalidValue(format!(
                            "Unknown enum symbol '{}' for enum {}",
                            s, definition.name
                        ))
                    })?;
                    Ok(AvroValue::Enum(index as i32, s.clone()))
                }
                (Value::String(s), DefinitionKind::Fixed(fixed)) => {
                    let bytes = latin1_bytes(s)?;
                    if bytes.len() != fixed.size {
                        return Err(EncodeError::InvalidValue(format!(
                            "Fixed default for {} has wrong size: expected {}, got {}",
                            definition.name,
                            fixed.size,
                            bytes.len()
                        )));
                    }
                    Ok(AvroValue::Fixed(bytes))
                }
                (json, _) => Err(EncodeError::TypeMismatch {
                    expected: definition.name.to_string(),
                    found: json_kind(json),
                }),
            }
        }
        (json, field_type) => Err(EncodeError::TypeMismatch {
            expected: field_type.describe(),
            found: json_kind(json),
        }),
    }
}

fn latin1_bytes(s: &str) -> Result<Vec<u8>, EncodeError> {
    s.chars()
        .map(|c| {
            u8::try_from(c as u32).map_err(|_| {
                EncodeError::InvalidValue(format!("Character {:?} does not fit in a byte", c))
            })
        })
        .collect()
}

fn json_kind(json: &Value) -> &'static str {
    match json {
        Value::Null => "JSON null",
        Value::Bool(_) => "JSON boolean",
        Value::Number(_) => "JSON number",
        Value::String(_) => "JSON string",
        Value::Array(_) => "JSON array",
        Value::Object(_) => "JSON object",
    }
}
