//! The resolution context for one linking pass.
//!
//! A [`Namespace`] owns every [`Definition`] decoded during the pass in an
//! arena, indexes them by qualified name (primary names and aliases), and
//! keeps the top-level schemas in the order they were added. References in
//! fields are linked to arena indices by [`Namespace::resolve_references`].

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::binary::{decode_value, encode_value, AvroValue};
use crate::error::{DecodeError, EncodeError, SchemaError};
use crate::schema::{Definition, DefinitionId, DefinitionKind, Field, FieldType, QualifiedName, SchemaParser};

/// A top-level schema added to a namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    root: Field,
    text: String,
}

impl Schema {
    /// The decoded root field.
    pub fn root(&self) -> &Field {
        &self.root
    }

    /// The schema text exactly as it was added.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Named types and top-level schemas of one resolution pass.
///
/// # Example
/// ```
/// use contrail::schema::Namespace;
///
/// let mut namespace = Namespace::new();
/// let index = namespace
///     .add_schema(r#"{"type": "record", "name": "Node", "fields": [
///         {"name": "next", "type": ["null", "Node"]}
///     ]}"#)
///     .unwrap();
/// namespace.resolve_references().unwrap();
///
/// let schema = namespace.schema(index).unwrap();
/// assert_eq!(schema.to_json(), r#"{"type":"record","name":"Node","fields":[{"name":"next","type":["null","Node"]}]}"#);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    definitions: Vec<Definition>,
    names: HashMap<QualifiedName, DefinitionId>,
    schemas: Vec<Schema>,
}

impl Namespace {
    /// Create an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a single schema and link it.
    ///
    /// The schema is available as `schemas()[0]` / `schema(0)`.
    pub fn from_schema(text: &str) -> Result<Self, SchemaError> {
        let mut namespace = Self::new();
        namespace.add_schema(text)?;
        namespace.resolve_references()?;
        Ok(namespace)
    }

    /// Register a definition under its name and every alias.
    ///
    /// # Errors
    /// Returns [`SchemaError::Conflict`] if any of those names is already
    /// registered, or if the definition lists the same name twice. Nothing
    /// is inserted in that case.
    pub fn register_definition(&mut self, definition: Definition) -> Result<DefinitionId, SchemaError> {
        let mut claimed: Vec<&QualifiedName> = Vec::with_capacity(1 + definition.aliases.len());
        for name in definition.all_names() {
            if self.names.contains_key(name) || claimed.contains(&name) {
                return Err(SchemaError::Conflict(name.clone()));
            }
            claimed.push(name);
        }

        let id = DefinitionId(self.definitions.len());
        for name in definition.all_names() {
            self.names.insert(name.clone(), id);
        }

        debug!(
            name = %definition.name,
            kind = definition.type_name(),
            aliases = definition.aliases.len(),
            "Registered definition"
        );
        self.definitions.push(definition);
        Ok(id)
    }

    /// Decode a schema text and record it as a top-level schema.
    ///
    /// Named types found in the schema are registered as they are met.
    /// If decoding fails, every definition registered for this schema is
    /// removed again. References stay unlinked until
    /// [`resolve_references`](Self::resolve_references).
    ///
    /// # Returns
    /// The index of the schema in [`schemas`](Self::schemas).
    pub fn add_schema(&mut self, text: &str) -> Result<usize, SchemaError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| SchemaError::ParseError(e.to_string()))?;

        let checkpoint = self.definitions.len();
        let decoded = SchemaParser::new(self).decode_schema(&value);
        let root = match decoded {
            Ok(root) => root,
            Err(e) => {
                self.truncate_definitions(checkpoint);
                return Err(e);
            }
        };
        self.schemas.push(Schema {
            root,
            text: text.to_string(),
        });
        Ok(self.schemas.len() - 1)
    }

    /// Drop every definition registered at or after `len`, with its names.
    fn truncate_definitions(&mut self, len: usize) {
        if self.definitions.len() <= len {
            return;
        }
        for definition in self.definitions.drain(len..) {
            for name in definition.all_names() {
                self.names.remove(name);
            }
        }
        debug!(
            definitions = self.definitions.len(),
            "Rolled back definitions of a rejected schema"
        );
    }

    /// Link every reference to the definition it names.
    ///
    /// Walks the fields of every record and every schema root. Linking is by
    /// lookup, so recursive types stay finite. Safe to call again after more
    /// schemas are added.
    ///
    /// # Errors
    /// Returns [`SchemaError::UnknownType`] for the first reference whose
    /// target was never registered.
    pub fn resolve_references(&mut self) -> Result<(), SchemaError> {
        let names = &self.names;
        let mut linked = 0usize;

        for definition in &mut self.definitions {
            if let DefinitionKind::Record(record) = &mut definition.kind {
                for field in &mut record.fields {
                    link_field(field, names, &mut linked)?;
                }
            }
        }
        for schema in &mut self.schemas {
            link_field(&mut schema.root, names, &mut linked)?;
        }

        debug!(
            definitions = self.definitions.len(),
            schemas = self.schemas.len(),
            references = linked,
            "Resolved references"
        );
        Ok(())
    }

    /// Get a definition by arena index.
    pub fn definition(&self, id: DefinitionId) -> Option<&Definition> {
        self.definitions.get(id.0)
    }

    /// Find the arena index registered for a name or alias.
    pub fn lookup(&self, name: &QualifiedName) -> Option<DefinitionId> {
        self.names.get(name).copied()
    }

    /// Get a definition by name or alias.
    pub fn get(&self, name: &QualifiedName) -> Option<&Definition> {
        self.lookup(name).and_then(|id| self.definition(id))
    }

    /// All definitions in registration order.
    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    /// All top-level schemas in the order they were added.
    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    /// Bind a top-level schema for encoding, decoding and emission.
    pub fn schema(&self, index: usize) -> Option<BoundSchema<'_>> {
        self.schemas.get(index).map(|s| self.bind(&s.root))
    }

    /// Bind any field of this namespace.
    pub fn bind<'a>(&'a self, root: &'a Field) -> BoundSchema<'a> {
        BoundSchema {
            namespace: self,
            root,
        }
    }
}

fn link_field(
    field: &mut Field,
    names: &HashMap<QualifiedName, DefinitionId>,
    linked: &mut usize,
) -> Result<(), SchemaError> {
    match &mut field.field_type {
        FieldType::Array(item) | FieldType::Map(item) => link_field(item, names, linked),
        FieldType::Union(branches) => {
            for branch in branches {
                link_field(branch, names, linked)?;
            }
            Ok(())
        }
        FieldType::Reference(reference) => {
            let id = names
                .get(&reference.target)
                .copied()
                .ok_or_else(|| SchemaError::UnknownType(reference.target.clone()))?;
            reference.resolved = Some(id);
            *linked += 1;
            Ok(())
        }
        _ => Ok(()),
    }
}

/// A field together with the namespace its references point into.
#[derive(Debug, Clone, Copy)]
pub struct BoundSchema<'a> {
    namespace: &'a Namespace,
    root: &'a Field,
}

impl<'a> BoundSchema<'a> {
    /// The namespace the schema belongs to.
    pub fn namespace(&self) -> &'a Namespace {
        self.namespace
    }

    /// The root field.
    pub fn root(&self) -> &'a Field {
        self.root
    }

    /// Encode a value into a fresh buffer.
    pub fn encode(&self, value: &AvroValue) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::new();
        self.encode_into(value, &mut out)?;
        Ok(out)
    }

    /// Append the encoding of a value to `out`.
    pub fn encode_into(&self, value: &AvroValue, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        encode_value(self.namespace, self.root, value, out)
    }

    /// Decode one value, advancing `data` past it.
    pub fn decode(&self, data: &mut &[u8]) -> Result<AvroValue, DecodeError> {
        decode_value(self.namespace, self.root, data)
    }

    /// The schema as a JSON value, each named type expanded once.
    pub fn to_json_value(&self) -> Value {
        self.namespace.emit(self.root, &mut Default::default())
    }

    /// The schema as compact JSON text.
    pub fn to_json(&self) -> String {
        self.to_json_value().to_string()
    }
}
