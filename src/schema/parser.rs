//! JSON schema decoder.
//!
//! Turns Avro schema JSON into [`Field`]s and registers every named type it
//! meets in the target [`Namespace`]. Inline and by-name uses of a named type
//! both come out as a [`FieldType::Reference`]; linking happens later in
//! [`Namespace::resolve_references`].

use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::schema::{
    Definition, DefinitionKind, EnumDefinition, Field, FieldType, FixedDefinition, Namespace,
    QualifiedName, RecordDefinition, Reference,
};

/// Record-field attributes that are modelled directly on [`Field`].
pub(crate) const FIELD_KEYS: &[&str] = &["name", "type", "default"];

/// Decodes schema JSON into a namespace.
///
/// # Example
/// ```
/// use contrail::schema::{Namespace, SchemaParser};
///
/// let mut namespace = Namespace::new();
/// let value = serde_json::json!({"type": "array", "items": "long"});
/// let field = SchemaParser::new(&mut namespace)
///     .decode_field_type("", "ids", &value, None)
///     .unwrap();
/// assert_eq!(field.name, "ids");
/// ```
#[derive(Debug)]
pub struct SchemaParser<'ns> {
    namespace: &'ns mut Namespace,
}

impl<'ns> SchemaParser<'ns> {
    /// Create a parser that registers definitions into `namespace`.
    pub fn new(namespace: &'ns mut Namespace) -> Self {
        Self { namespace }
    }

    /// Decode a top-level schema value.
    pub fn decode_schema(&mut self, value: &Value) -> Result<Field, SchemaError> {
        self.decode_field_type("", "", value, None)
    }

    /// Decode the type of one field.
    ///
    /// # Arguments
    /// * `namespace` - Enclosing namespace used for unqualified names
    /// * `field_name` - Name of the slot, empty for anonymous ones
    /// * `value` - The JSON `type` value (string, array or object)
    /// * `default` - The field's `default` attribute, if it had one
    pub fn decode_field_type(
        &mut self,
        namespace: &str,
        field_name: &str,
        value: &Value,
        default: Option<&Value>,
    ) -> Result<Field, SchemaError> {
        match value {
            Value::String(s) => self.decode_type_name(namespace, field_name, s, default),
            Value::Array(branches) => self.decode_union(namespace, field_name, branches, default),
            Value::Object(obj) => self.decode_complex(namespace, field_name, obj, default),
            other => Err(SchemaError::wrong_type(
                "type",
                field_context(field_name),
                "a string, array or object",
                other,
            )),
        }
    }

    /// A primitive keyword, or otherwise a reference to a named type.
    fn decode_type_name(
        &mut self,
        namespace: &str,
        field_name: &str,
        type_name: &str,
        default: Option<&Value>,
    ) -> Result<Field, SchemaError> {
        match FieldType::primitive(type_name) {
            Some(primitive) => primitive_field(field_name, primitive, default),
            None => Ok(Field {
                name: field_name.to_string(),
                default: default.cloned(),
                field_type: FieldType::Reference(Reference::new(QualifiedName::parse(
                    namespace, type_name,
                ))),
                metadata: Map::new(),
            }),
        }
    }

    fn decode_union(
        &mut self,
        namespace: &str,
        field_name: &str,
        branches: &[Value],
        default: Option<&Value>,
    ) -> Result<Field, SchemaError> {
        if branches.is_empty() {
            return Err(SchemaError::InvalidSchema(format!(
                "Union for {} cannot be empty",
                field_context(field_name)
            )));
        }

        let mut decoded = Vec::with_capacity(branches.len());
        for branch in branches {
            let field = self.decode_field_type(namespace, "", branch, None)?;
            if matches!(field.field_type, FieldType::Union(_)) {
                return Err(SchemaError::InvalidSchema(format!(
                    "Union for {} may not immediately contain another union",
                    field_context(field_name)
                )));
            }
            decoded.push(field);
        }

        Ok(Field {
            name: field_name.to_string(),
            default: default.cloned(),
            field_type: FieldType::Union(decoded),
            metadata: Map::new(),
        })
    }

    fn decode_complex(
        &mut self,
        namespace: &str,
        field_name: &str,
        obj: &Map<String, Value>,
        default: Option<&Value>,
    ) -> Result<Field, SchemaError> {
        let type_name = required_str(obj, "type", &field_context(field_name))?;

        let field_type = match type_name {
            "array" => {
                let items = required(obj, "items", &field_context(field_name))?;
                let item = self.decode_field_type(namespace, "", items, None)?;
                FieldType::Array(Box::new(item))
            }
            "map" => {
                let values = required(obj, "values", &field_context(field_name))?;
                let value = self.decode_field_type(namespace, "", values, None)?;
                FieldType::Map(Box::new(value))
            }
            "record" | "enum" | "fixed" => {
                let definition = match type_name {
                    "record" => self.decode_record(namespace, obj)?,
                    "enum" => decode_enum(namespace, obj)?,
                    _ => decode_fixed(namespace, obj)?,
                };
                let target = definition.name.clone();
                self.namespace.register_definition(definition)?;
                FieldType::Reference(Reference::new(target))
            }
            other => match FieldType::primitive(other) {
                Some(primitive) => return primitive_field(field_name, primitive, default),
                None => return Err(SchemaError::UnknownTypeName(other.to_string())),
            },
        };

        Ok(Field {
            name: field_name.to_string(),
            default: default.cloned(),
            field_type,
            metadata: Map::new(),
        })
    }

    /// Decode a record definition. Nested named types are registered as they
    /// are met; the record itself is returned for the caller to register.
    fn decode_record(
        &mut self,
        enclosing: &str,
        obj: &Map<String, Value>,
    ) -> Result<Definition, SchemaError> {
        let name = decode_name(enclosing, obj, "record")?;
        let context = format!("record {}", name);

        let fields_value = required(obj, "fields", &context)?;
        let field_list = fields_value
            .as_array()
            .ok_or_else(|| SchemaError::wrong_type("fields", &context, "an array", fields_value))?;

        let mut fields = Vec::with_capacity(field_list.len());
        for field_value in field_list {
            let field_obj = field_value.as_object().ok_or_else(|| {
                SchemaError::wrong_type("fields", &context, "an array of objects", field_value)
            })?;
            let field_name = required_str(field_obj, "name", &context)?;
            let type_value = required(field_obj, "type", &format!("field '{}'", field_name))?;
            let mut field = self.decode_field_type(
                &name.namespace,
                field_name,
                type_value,
                field_obj.get("default"),
            )?;
            field.metadata = field_obj
                .iter()
                .filter(|(key, _)| !FIELD_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            fields.push(field);
        }

        // Absent means "no version"; zero is never used as a real version.
        let version = match obj.get("version") {
            None => None,
            Some(v) => Some(
                v.as_i64()
                    .or_else(|| v.as_f64().map(|f| f as i64))
                    .ok_or_else(|| SchemaError::wrong_type("version", &context, "a number", v))?,
            ),
        };

        let aliases = parse_aliases(obj, &name.namespace, &context)?;

        Ok(Definition {
            name,
            aliases,
            metadata: obj.clone(),
            kind: DefinitionKind::Record(RecordDefinition { fields, version }),
        })
    }
}

fn decode_enum(enclosing: &str, obj: &Map<String, Value>) -> Result<Definition, SchemaError> {
    let name = decode_name(enclosing, obj, "enum")?;
    let context = format!("enum {}", name);

    let symbols_value = required(obj, "symbols", &context)?;
    let symbols = symbols_value
        .as_array()
        .and_then(|arr| {
            arr.iter()
                .map(|v| v.as_str().map(String::from))
                .collect::<Option<Vec<_>>>()
        })
        .ok_or_else(|| {
            SchemaError::wrong_type("symbols", &context, "an array of strings", symbols_value)
        })?;

    if symbols.is_empty() {
        return Err(SchemaError::InvalidSchema(format!(
            "{} must have at least one symbol",
            context
        )));
    }
    for (i, symbol) in symbols.iter().enumerate() {
        if symbols[..i].contains(symbol) {
            return Err(SchemaError::InvalidSchema(format!(
                "{} has duplicate symbol '{}'",
                context, symbol
            )));
        }
    }

    let aliases = parse_aliases(obj, &name.namespace, &context)?;

    Ok(Definition {
        name,
        aliases,
        metadata: obj.clone(),
        kind: DefinitionKind::Enum(EnumDefinition { symbols }),
    })
}

fn decode_fixed(enclosing: &str, obj: &Map<String, Value>) -> Result<Definition, SchemaError> {
    let name = decode_name(enclosing, obj, "fixed")?;
    let context = format!("fixed {}", name);

    let size_value = required(obj, "size", &context)?;
    let size = size_value
        .as_u64()
        .or_else(|| {
            size_value
                .as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        })
        .ok_or_else(|| {
            SchemaError::wrong_type("size", &context, "a non-negative integer", size_value)
        })?;

    let aliases = parse_aliases(obj, &name.namespace, &context)?;

    Ok(Definition {
        name,
        aliases,
        metadata: obj.clone(),
        kind: DefinitionKind::Fixed(FixedDefinition {
            size: size as usize,
        }),
    })
}

/// Read `name` and the optional `namespace` override of a named type.
fn decode_name(
    enclosing: &str,
    obj: &Map<String, Value>,
    kind: &str,
) -> Result<QualifiedName, SchemaError> {
    let name = required_str(obj, "name", kind)?;
    let namespace = match obj.get("namespace") {
        None | Some(Value::Null) => enclosing,
        Some(Value::String(ns)) => ns.as_str(),
        Some(other) => {
            return Err(SchemaError::wrong_type(
                "namespace",
                format!("{} {}", kind, name),
                "a string",
                other,
            ))
        }
    };
    Ok(QualifiedName::parse(namespace, name))
}

/// Parse the `aliases` attribute; absent means no aliases.
fn parse_aliases(
    obj: &Map<String, Value>,
    namespace: &str,
    context: &str,
) -> Result<Vec<QualifiedName>, SchemaError> {
    let aliases = match obj.get("aliases") {
        None => return Ok(Vec::new()),
        Some(v) => v,
    };

    let list = aliases
        .as_array()
        .ok_or_else(|| SchemaError::wrong_type("aliases", context, "an array", aliases))?;

    list.iter()
        .map(|alias| {
            alias
                .as_str()
                .map(|s| QualifiedName::parse(namespace, s))
                .ok_or_else(|| {
                    SchemaError::wrong_type("aliases", context, "an array of strings", aliases)
                })
        })
        .collect()
}

/// Build a primitive field, checking and narrowing its default.
fn primitive_field(
    field_name: &str,
    field_type: FieldType,
    default: Option<&Value>,
) -> Result<Field, SchemaError> {
    let default = match default {
        Some(value) => Some(check_primitive_default(field_name, &field_type, value)?),
        None => None,
    };
    Ok(Field {
        name: field_name.to_string(),
        default,
        field_type,
        metadata: Map::new(),
    })
}

fn check_primitive_default(
    field_name: &str,
    field_type: &FieldType,
    value: &Value,
) -> Result<Value, SchemaError> {
    let invalid = |expected: &'static str| SchemaError::InvalidDefault {
        field: field_name.to_string(),
        expected,
        found: value.to_string(),
    };

    match field_type {
        FieldType::Null => match value {
            Value::Null => Ok(Value::Null),
            _ => Err(invalid("null")),
        },
        FieldType::Boolean => match value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            _ => Err(invalid("a boolean")),
        },
        FieldType::Int => {
            let n = integral(value).ok_or_else(|| invalid("a number"))?;
            let narrowed = i32::try_from(n).map_err(|_| invalid("a 32-bit integer"))?;
            Ok(Value::from(narrowed))
        }
        FieldType::Long => {
            let n = integral(value).ok_or_else(|| invalid("a number"))?;
            Ok(Value::from(n))
        }
        // Kept as written; narrowed to f32 only when the default is encoded.
        FieldType::Float => match value {
            Value::Number(_) => Ok(value.clone()),
            _ => Err(invalid("a number")),
        },
        FieldType::Double => {
            let f = value.as_f64().ok_or_else(|| invalid("a number"))?;
            Ok(Value::from(f))
        }
        FieldType::Bytes | FieldType::String => match value {
            Value::String(s) => Ok(Value::String(s.clone())),
            _ => Err(invalid("a string")),
        },
        _ => Ok(value.clone()),
    }
}

/// Any JSON number as a whole number, truncating fractions.
fn integral(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
}

fn required<'v>(
    obj: &'v Map<String, Value>,
    key: &'static str,
    context: &str,
) -> Result<&'v Value, SchemaError> {
    obj.get(key).ok_or_else(|| SchemaError::MissingKey {
        key,
        context: context.to_string(),
    })
}

fn required_str<'v>(
    obj: &'v Map<String, Value>,
    key: &'static str,
    context: &str,
) -> Result<&'v str, SchemaError> {
    let value = required(obj, key, context)?;
    value
        .as_str()
        .ok_or_else(|| SchemaError::wrong_type(key, context, "a string", value))
}

fn field_context(field_name: &str) -> String {
    if field_name.is_empty() {
        "anonymous type".to_string()
    } else {
        format!("field '{}'", field_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> Result<(Namespace, Field), SchemaError> {
        let mut namespace = Namespace::new();
        let field = SchemaParser::new(&mut namespace).decode_schema(&value)?;
        Ok((namespace, field))
    }

    #[test]
    fn test_primitive_strings() {
        let (_, field) = decode(json!("long")).unwrap();
        assert_eq!(field.field_type, FieldType::Long);
        assert!(!field.has_default());
    }

    #[test]
    fn test_unknown_string_is_reference() {
        let (_, field) = decode(json!("com.example.User")).unwrap();
        match field.field_type {
            FieldType::Reference(r) => {
                assert_eq!(r.target, QualifiedName::new("com.example", "User"));
                assert!(!r.is_resolved());
            }
            other => panic!("expected reference, got {:?}", other),
        }
    }

    #[test]
    fn test_primitive_object_form() {
        let (_, field) = decode(json!({"type": "string", "logicalType": "uuid"})).unwrap();
        assert_eq!(field.field_type, FieldType::String);
    }

    #[test]
    fn test_unknown_object_type_is_error() {
        let err = decode(json!({"type": "tuple"})).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownTypeName(ref t) if t == "tuple"));
    }

    #[test]
    fn test_missing_type_key() {
        let err = decode(json!({"items": "int"})).unwrap_err();
        assert!(matches!(err, SchemaError::MissingKey { key: "type", .. }));
    }

    #[test]
    fn test_number_schema_is_error() {
        let err = decode(json!(42)).unwrap_err();
        assert!(matches!(err, SchemaError::WrongValueType { key: "type", .. }));
    }

    #[test]
    fn test_int_default_is_narrowed() {
        let mut namespace = Namespace::new();
        let field = SchemaParser::new(&mut namespace)
            .decode_field_type("", "age", &json!("int"), Some(&json!(7.0)))
            .unwrap();
        assert_eq!(field.default, Some(json!(7)));
    }

    #[test]
    fn test_int_default_out_of_range() {
        let mut namespace = Namespace::new();
        let err = SchemaParser::new(&mut namespace)
            .decode_field_type("", "age", &json!("int"), Some(&json!(1_i64 << 40)))
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefault { .. }));
    }

    #[test]
    fn test_float_default_kept_as_written() {
        let mut namespace = Namespace::new();
        let field = SchemaParser::new(&mut namespace)
            .decode_field_type("", "ratio", &json!("float"), Some(&json!(0.1)))
            .unwrap();
        assert_eq!(field.default, Some(json!(0.1)));
    }

    #[test]
    fn test_field_attributes_kept() {
        let (namespace, _) = decode(json!({
            "type": "record", "name": "R",
            "fields": [{"name": "a", "type": "int", "doc": "counter", "default": 1}]
        }))
        .unwrap();
        let record = namespace.definitions()[0].as_record().unwrap();
        assert_eq!(record.fields[0].metadata.get("doc"), Some(&json!("counter")));
        assert!(!record.fields[0].metadata.contains_key("default"));
    }

    #[test]
    fn test_default_kind_mismatch() {
        let mut namespace = Namespace::new();
        let mut parser = SchemaParser::new(&mut namespace);
        for (ty, default) in [
            ("string", json!(1)),
            ("boolean", json!("true")),
            ("long", json!("1")),
            ("double", json!(null)),
            ("float", json!("0.5")),
            ("bytes", json!([1, 2])),
            ("null", json!(0)),
        ] {
            let err = parser
                .decode_field_type("", "f", &json!(ty), Some(&default))
                .unwrap_err();
            assert!(
                matches!(err, SchemaError::InvalidDefault { .. }),
                "{} with {} should fail",
                ty,
                default
            );
        }
    }

    #[test]
    fn test_union_branches_have_no_default() {
        let mut namespace = Namespace::new();
        let field = SchemaParser::new(&mut namespace)
            .decode_field_type("", "opt", &json!(["null", "string"]), Some(&json!(null)))
            .unwrap();
        assert!(field.has_default());
        match field.field_type {
            FieldType::Union(branches) => {
                assert_eq!(branches.len(), 2);
                assert!(branches.iter().all(|b| !b.has_default() && b.name.is_empty()));
            }
            other => panic!("expected union, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_union_rejected() {
        let err = decode(json!(["null", ["int", "string"]])).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidSchema(_)));
    }

    #[test]
    fn test_empty_union_rejected() {
        assert!(decode(json!([])).is_err());
    }

    #[test]
    fn test_inline_record_registers_definition() {
        let (namespace, field) = decode(json!({
            "type": "record",
            "name": "Outer",
            "namespace": "ns",
            "fields": [
                {"name": "inner", "type": {
                    "type": "record", "name": "Inner", "fields": [{"name": "x", "type": "int"}]
                }}
            ]
        }))
        .unwrap();

        assert!(matches!(field.field_type, FieldType::Reference(_)));
        // Inner inherits the namespace of Outer.
        assert!(namespace.get(&QualifiedName::new("ns", "Inner")).is_some());
        assert!(namespace.get(&QualifiedName::new("ns", "Outer")).is_some());
    }

    #[test]
    fn test_record_version_and_aliases() {
        let (namespace, _) = decode(json!({
            "type": "record",
            "name": "Rec",
            "namespace": "a",
            "version": 3,
            "aliases": ["Old", "b.Older"],
            "fields": []
        }))
        .unwrap();
        let def = namespace.get(&QualifiedName::new("a", "Rec")).unwrap();
        assert_eq!(def.as_record().unwrap().version, Some(3));
        assert_eq!(
            def.aliases,
            vec![QualifiedName::new("a", "Old"), QualifiedName::new("b", "Older")]
        );
        assert_eq!(
            namespace.get(&QualifiedName::new("b", "Older")).map(|d| &d.name),
            Some(&QualifiedName::new("a", "Rec"))
        );
    }

    #[test]
    fn test_record_without_version() {
        let (namespace, _) = decode(json!({"type": "record", "name": "R", "fields": []})).unwrap();
        let def = namespace.get(&QualifiedName::new("", "R")).unwrap();
        assert_eq!(def.as_record().unwrap().version, None);
    }

    #[test]
    fn test_malformed_aliases() {
        let err = decode(json!({"type": "record", "name": "R", "aliases": "Old", "fields": []}))
            .unwrap_err();
        assert!(matches!(err, SchemaError::WrongValueType { key: "aliases", .. }));

        let err = decode(json!({"type": "record", "name": "R", "aliases": ["Old", 1], "fields": []}))
            .unwrap_err();
        assert!(matches!(err, SchemaError::WrongValueType { key: "aliases", .. }));
    }

    #[test]
    fn test_record_field_requires_name_and_type() {
        let err = decode(json!({"type": "record", "name": "R", "fields": [{"type": "int"}]}))
            .unwrap_err();
        assert!(matches!(err, SchemaError::MissingKey { key: "name", .. }));

        let err = decode(json!({"type": "record", "name": "R", "fields": [{"name": "x"}]}))
            .unwrap_err();
        assert!(matches!(err, SchemaError::MissingKey { key: "type", .. }));
    }

    #[test]
    fn test_enum_validation() {
        assert!(decode(json!({"type": "enum", "name": "E", "symbols": []})).is_err());
        assert!(decode(json!({"type": "enum", "name": "E", "symbols": ["A", "A"]})).is_err());
        assert!(decode(json!({"type": "enum", "name": "E", "symbols": ["A", 2]})).is_err());
        assert!(decode(json!({"type": "enum", "name": "E"})).is_err());

        let (namespace, _) =
            decode(json!({"type": "enum", "name": "E", "symbols": ["A", "B"]})).unwrap();
        assert!(namespace.get(&QualifiedName::new("", "E")).is_some());
    }

    #[test]
    fn test_fixed_validation() {
        assert!(decode(json!({"type": "fixed", "name": "F", "size": "16"})).is_err());
        assert!(decode(json!({"type": "fixed", "name": "F", "size": -1})).is_err());
        assert!(decode(json!({"type": "fixed", "name": "F"})).is_err());

        let (namespace, _) = decode(json!({"type": "fixed", "name": "F", "size": 16})).unwrap();
        match &namespace.get(&QualifiedName::new("", "F")).unwrap().kind {
            DefinitionKind::Fixed(f) => assert_eq!(f.size, 16),
            other => panic!("expected fixed, got {:?}", other),
        }
    }

    #[test]
    fn test_array_and_map() {
        let (_, field) = decode(json!({"type": "map", "values": {"type": "array", "items": "int"}}))
            .unwrap();
        match field.field_type {
            FieldType::Map(values) => match values.field_type {
                FieldType::Array(items) => assert_eq!(items.field_type, FieldType::Int),
                other => panic!("expected array, got {:?}", other),
            },
            other => panic!("expected map, got {:?}", other),
        }

        assert!(decode(json!({"type": "array"})).is_err());
        assert!(decode(json!({"type": "map"})).is_err());
    }
}
