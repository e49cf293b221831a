//! Canonical JSON emission of resolved schemas.
//!
//! A named type is expanded in full the first time it is met during one
//! emission and written as its qualified name afterwards, so recursive
//! schemas come out finite.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::schema::parser::FIELD_KEYS;
use crate::schema::{Definition, DefinitionId, DefinitionKind, Field, FieldType, Namespace, QualifiedName};

/// Attributes emitted from the model rather than copied from metadata.
const STRUCTURAL_KEYS: &[&str] = &[
    "type",
    "name",
    "namespace",
    "fields",
    "symbols",
    "size",
    "aliases",
];

impl Namespace {
    /// Emit a field's type as a JSON schema value.
    ///
    /// # Arguments
    /// * `field` - The field to emit
    /// * `seen` - Names already expanded in this emission; updated in place
    pub fn emit(&self, field: &Field, seen: &mut HashSet<QualifiedName>) -> Value {
        self.emit_type(&field.field_type, "", seen)
    }

    /// Emit a definition, or just its name if it is already in `seen`.
    pub fn emit_definition(&self, id: DefinitionId, seen: &mut HashSet<QualifiedName>) -> Value {
        match self.definition(id) {
            Some(definition) => self.expand(definition, "", seen),
            None => Value::Null,
        }
    }

    /// Compact JSON text of a top-level schema.
    pub fn schema_json(&self, index: usize) -> Option<String> {
        self.schema(index).map(|schema| schema.to_json())
    }

    fn emit_type(
        &self,
        field_type: &FieldType,
        enclosing: &str,
        seen: &mut HashSet<QualifiedName>,
    ) -> Value {
        match field_type {
            FieldType::Null => Value::from("null"),
            FieldType::Boolean => Value::from("boolean"),
            FieldType::Int => Value::from("int"),
            FieldType::Long => Value::from("long"),
            FieldType::Float => Value::from("float"),
            FieldType::Double => Value::from("double"),
            FieldType::Bytes => Value::from("bytes"),
            FieldType::String => Value::from("string"),
            FieldType::Array(item) => {
                let mut obj = Map::new();
                obj.insert("type".into(), Value::from("array"));
                obj.insert("items".into(), self.emit_type(&item.field_type, enclosing, seen));
                Value::Object(obj)
            }
            FieldType::Map(values) => {
                let mut obj = Map::new();
                obj.insert("type".into(), Value::from("map"));
                obj.insert("values".into(), self.emit_type(&values.field_type, enclosing, seen));
                Value::Object(obj)
            }
            FieldType::Union(branches) => Value::Array(
                branches
                    .iter()
                    .map(|b| self.emit_type(&b.field_type, enclosing, seen))
                    .collect(),
            ),
            FieldType::Reference(reference) => {
                match reference.definition_id().and_then(|id| self.definition(id)) {
                    Some(definition) => self.expand(definition, enclosing, seen),
                    None => Value::from(reference.target.to_string()),
                }
            }
        }
    }

    fn expand(
        &self,
        definition: &Definition,
        enclosing: &str,
        seen: &mut HashSet<QualifiedName>,
    ) -> Value {
        if !seen.insert(definition.name.clone()) {
            return Value::from(definition.name.to_string());
        }

        let own_namespace = definition.name.namespace.as_str();
        let mut obj = Map::new();
        obj.insert("type".into(), Value::from(definition.type_name()));
        obj.insert("name".into(), Value::from(definition.name.name.clone()));
        if own_namespace != enclosing {
            obj.insert("namespace".into(), Value::from(own_namespace));
        }

        match &definition.kind {
            DefinitionKind::Record(record) => {
                let fields = record
                    .fields
                    .iter()
                    .map(|field| {
                        let mut f = Map::new();
                        f.insert("name".into(), Value::from(field.name.clone()));
                        f.insert(
                            "type".into(),
                            self.emit_type(&field.field_type, own_namespace, seen),
                        );
                        if let Some(default) = &field.default {
                            f.insert("default".into(), default.clone());
                        }
                        for (key, value) in &field.metadata {
                            if !FIELD_KEYS.contains(&key.as_str()) {
                                f.insert(key.clone(), value.clone());
                            }
                        }
                        Value::Object(f)
                    })
                    .collect();
                obj.insert("fields".into(), Value::Array(fields));
            }
            DefinitionKind::Enum(e) => {
                obj.insert(
                    "symbols".into(),
                    Value::Array(e.symbols.iter().map(|s| Value::from(s.clone())).collect()),
                );
            }
            DefinitionKind::Fixed(f) => {
                obj.insert("size".into(), Value::from(f.size));
            }
        }

        if !definition.aliases.is_empty() {
            obj.insert(
                "aliases".into(),
                Value::Array(
                    definition
                        .aliases
                        .iter()
                        .map(|a| Value::from(a.to_string()))
                        .collect(),
                ),
            );
        }

        for (key, value) in &definition.metadata {
            if !STRUCTURAL_KEYS.contains(&key.as_str()) {
                obj.insert(key.clone(), value.clone());
            }
        }

        Value::Object(obj)
    }
}
