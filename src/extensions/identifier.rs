//! Deterministic record identifiers.
//!
//! The values of a record's configured key fields are rendered to text,
//! joined with a separator and hashed into a name-based (v5) UUID.

use std::fmt::Write as _;

use uuid::Uuid;

use crate::binary::AvroValue;
use crate::schema::{DefinitionKind, FieldType, Namespace};

/// How key values are rendered and hashed.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierConfig {
    /// Placed between the rendered values of two keys (default: U+001E).
    pub field_separator: char,
    /// Placed between the elements of an array value (default: U+001F).
    pub array_separator: char,
    /// Digits after the decimal point for float and double (default: 4).
    pub float_precision: usize,
    /// UUID namespace the identifiers are derived in (default: OID).
    pub namespace: Uuid,
}

impl Default for IdentifierConfig {
    fn default() -> Self {
        Self {
            field_separator: '\u{1e}',
            array_separator: '\u{1f}',
            float_precision: 4,
            namespace: Uuid::NAMESPACE_OID,
        }
    }
}

impl IdentifierConfig {
    /// Create a new IdentifierConfig with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the separator between keys.
    pub fn with_field_separator(mut self, separator: char) -> Self {
        self.field_separator = separator;
        self
    }

    /// Set the separator between array elements.
    pub fn with_array_separator(mut self, separator: char) -> Self {
        self.array_separator = separator;
        self
    }

    /// Set the number of decimals for floating-point values.
    pub fn with_float_precision(mut self, precision: usize) -> Self {
        self.float_precision = precision;
        self
    }

    /// Set the UUID namespace.
    pub fn with_namespace(mut self, namespace: Uuid) -> Self {
        self.namespace = namespace;
        self
    }

    /// Hash the joined key text.
    pub fn hash(&self, source: &str) -> Uuid {
        Uuid::new_v5(&self.namespace, source.as_bytes())
    }

    /// Append the rendering of one key value to `out`.
    ///
    /// # Errors
    /// Returns the kind of the offending value for records and maps, which
    /// have no key rendering.
    pub fn render(&self, value: &AvroValue, out: &mut String) -> Result<(), &'static str> {
        // Writing to a String cannot fail.
        match value {
            AvroValue::Null => {}
            AvroValue::Boolean(b) => {
                let _ = write!(out, "{}", b);
            }
            AvroValue::Int(i) => {
                let _ = write!(out, "{}", i);
            }
            AvroValue::Long(l) => {
                let _ = write!(out, "{}", l);
            }
            AvroValue::Float(v) => {
                let _ = write!(out, "{:.*}", self.float_precision, v);
            }
            AvroValue::Double(v) => {
                let _ = write!(out, "{:.*}", self.float_precision, v);
            }
            AvroValue::Bytes(bytes) | AvroValue::Fixed(bytes) => {
                for byte in bytes {
                    let _ = write!(out, "{}", byte);
                }
            }
            AvroValue::String(s) => out.push_str(s),
            AvroValue::Enum(_, symbol) => out.push_str(symbol),
            AvroValue::Union(_, inner) => self.render(inner, out)?,
            AvroValue::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(self.array_separator);
                    }
                    self.render(item, out)?;
                }
            }
            AvroValue::Record(_) | AvroValue::Map(_) => return Err(value.kind()),
        }
        Ok(())
    }
}

/// Whether a field of this type can take part in an identifier.
///
/// Non-null primitives, enums and fixed qualify, as do arrays of those and
/// `[null, T]` unions where `T` qualifies.
pub(crate) fn is_identifier_type(namespace: &Namespace, field_type: &FieldType) -> bool {
    match field_type {
        FieldType::Array(item) => is_scalar(namespace, &item.field_type),
        FieldType::Union(branches) => match branches.as_slice() {
            [null, inner] if null.field_type == FieldType::Null => {
                is_scalar(namespace, &inner.field_type)
            }
            _ => false,
        },
        other => is_scalar(namespace, other),
    }
}

fn is_scalar(namespace: &Namespace, field_type: &FieldType) -> bool {
    match field_type {
        FieldType::Null | FieldType::Array(_) | FieldType::Map(_) | FieldType::Union(_) => false,
        FieldType::Reference(reference) => reference
            .definition_id()
            .and_then(|id| namespace.definition(id))
            .map_or(false, |def| {
                matches!(def.kind, DefinitionKind::Enum(_) | DefinitionKind::Fixed(_))
            }),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(value: &AvroValue) -> String {
        let mut out = String::new();
        IdentifierConfig::default().render(value, &mut out).unwrap();
        out
    }

    #[test]
    fn test_render_scalars() {
        assert_eq!(rendered(&AvroValue::String("abc".into())), "abc");
        assert_eq!(rendered(&AvroValue::Boolean(false)), "false");
        assert_eq!(rendered(&AvroValue::Int(-12)), "-12");
        assert_eq!(rendered(&AvroValue::Long(1 << 40)), "1099511627776");
        assert_eq!(rendered(&AvroValue::Double(1.5)), "1.5000");
        assert_eq!(rendered(&AvroValue::Float(0.25)), "0.2500");
        assert_eq!(rendered(&AvroValue::Enum(1, "RED".into())), "RED");
    }

    #[test]
    fn test_render_bytes_as_decimal_octets() {
        assert_eq!(rendered(&AvroValue::Fixed(vec![10, 0, 0, 1])), "10001");
        assert_eq!(rendered(&AvroValue::Bytes(vec![255, 7])), "2557");
    }

    #[test]
    fn test_render_null_branch_is_empty() {
        let value = AvroValue::Union(0, Box::new(AvroValue::Null));
        assert_eq!(rendered(&value), "");
        let value = AvroValue::Union(1, Box::new(AvroValue::Long(3)));
        assert_eq!(rendered(&value), "3");
    }

    #[test]
    fn test_render_array_uses_separator() {
        let value = AvroValue::Array(vec![
            AvroValue::String("a".into()),
            AvroValue::String("b".into()),
        ]);
        assert_eq!(rendered(&value), "a\u{1f}b");

        let config = IdentifierConfig::new().with_array_separator(',');
        let mut out = String::new();
        config.render(&value, &mut out).unwrap();
        assert_eq!(out, "a,b");
    }

    #[test]
    fn test_render_rejects_records() {
        let mut out = String::new();
        let err = IdentifierConfig::default()
            .render(&AvroValue::Map(vec![]), &mut out)
            .unwrap_err();
        assert_eq!(err, "map");
    }

    #[test]
    fn test_precision() {
        let config = IdentifierConfig::new().with_float_precision(1);
        let mut out = String::new();
        config.render(&AvroValue::Double(2.26), &mut out).unwrap();
        assert_eq!(out, "2.3");
    }

    #[test]
    fn test_hash_is_v5_in_configured_namespace() {
        let config = IdentifierConfig::default();
        let id = config.hash("example");
        assert_eq!(id, Uuid::new_v5(&Uuid::NAMESPACE_OID, b"example"));
        assert_eq!(id.get_version_num(), 5);
        assert_ne!(id, config.clone().with_namespace(Uuid::NAMESPACE_DNS).hash("example"));
    }
}
