//! Avro schema model: named definitions and field types.
//!
//! Named types (records, enums and fixed) are [`Definition`]s owned by a
//! [`Namespace`](super::Namespace). Everything else is a [`Field`], a typed
//! slot that may nest arrays, maps and unions and that points at definitions
//! through [`Reference`]s. References hold an index into the namespace's
//! arena, never the definition itself, so recursive records are fine.

use serde_json::{Map, Value};

use super::QualifiedName;

/// Index of a definition in its namespace's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefinitionId(pub(crate) usize);

impl DefinitionId {
    /// Position of the definition in [`Namespace::definitions`](super::Namespace::definitions).
    pub fn index(self) -> usize {
        self.0
    }
}

/// A named Avro type.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    /// The qualified name of the type.
    pub name: QualifiedName,
    /// Alternative names, each registered alongside the primary name.
    pub aliases: Vec<QualifiedName>,
    /// Every attribute of the schema object, kept for round-tripping.
    pub metadata: Map<String, Value>,
    /// The variant-specific part.
    pub kind: DefinitionKind,
}

/// The three kinds of named type.
#[derive(Debug, Clone, PartialEq)]
pub enum DefinitionKind {
    /// Record with ordered fields.
    Record(RecordDefinition),
    /// Enumeration.
    Enum(EnumDefinition),
    /// Fixed-size byte array.
    Fixed(FixedDefinition),
}

/// Body of a record definition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordDefinition {
    /// Fields in declaration order, which is also the wire order.
    pub fields: Vec<Field>,
    /// Optional schema version attribute.
    pub version: Option<i64>,
}

/// Body of an enum definition.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDefinition {
    /// Symbols; a symbol's position is its encoded value.
    pub symbols: Vec<String>,
}

impl EnumDefinition {
    /// Get the index of a symbol.
    pub fn symbol_index(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }
}

/// Body of a fixed definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDefinition {
    /// Exact size of every value in bytes.
    pub size: usize,
}

impl Definition {
    /// Create a record definition.
    pub fn record(name: QualifiedName, fields: Vec<Field>) -> Self {
        Self::new(
            name,
            DefinitionKind::Record(RecordDefinition {
                fields,
                version: None,
            }),
        )
    }

    /// Create an enum definition.
    pub fn enumeration(name: QualifiedName, symbols: Vec<String>) -> Self {
        Self::new(name, DefinitionKind::Enum(EnumDefinition { symbols }))
    }

    /// Create a fixed definition.
    pub fn fixed(name: QualifiedName, size: usize) -> Self {
        Self::new(name, DefinitionKind::Fixed(FixedDefinition { size }))
    }

    fn new(name: QualifiedName, kind: DefinitionKind) -> Self {
        Self {
            name,
            aliases: Vec::new(),
            metadata: Map::new(),
            kind,
        }
    }

    /// Set the aliases.
    pub fn with_aliases(mut self, aliases: Vec<QualifiedName>) -> Self {
        self.aliases = aliases;
        self
    }

    /// Set the metadata attributes.
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// The Avro type keyword of this definition.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            DefinitionKind::Record(_) => "record",
            DefinitionKind::Enum(_) => "enum",
            DefinitionKind::Fixed(_) => "fixed",
        }
    }

    /// The record body, if this is a record.
    pub fn as_record(&self) -> Option<&RecordDefinition> {
        match &self.kind {
            DefinitionKind::Record(r) => Some(r),
            _ => None,
        }
    }

    /// The primary name followed by every alias.
    pub fn all_names(&self) -> impl Iterator<Item = &QualifiedName> {
        std::iter::once(&self.name).chain(self.aliases.iter())
    }
}

/// A typed value slot: a record field, an array item, a map value or a
/// union branch.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field name, empty for anonymous nested slots.
    pub name: String,
    /// Default value, already checked against primitive types.
    pub default: Option<Value>,
    /// The type of the slot.
    pub field_type: FieldType,
    /// Other attributes of a record field (`doc`, `order`, `aliases`, ...).
    pub metadata: Map<String, Value>,
}

impl Field {
    /// Create a field without a default.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            default: None,
            field_type,
            metadata: Map::new(),
        }
    }

    /// Create an anonymous field (array items, map values, union branches).
    pub fn anonymous(field_type: FieldType) -> Self {
        Self::new("", field_type)
    }

    /// Set the default value.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Whether the schema declared a default for this field.
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// The type of a [`Field`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// Null type - no value.
    Null,
    /// Boolean type.
    Boolean,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit IEEE 754 floating-point.
    Float,
    /// 64-bit IEEE 754 floating-point.
    Double,
    /// Sequence of bytes.
    Bytes,
    /// Unicode string.
    String,
    /// Array of items of a single type.
    Array(Box<Field>),
    /// Map with string keys and values of a single type.
    Map(Box<Field>),
    /// Union of branches, encoded by branch index.
    Union(Vec<Field>),
    /// Use of a named definition.
    Reference(Reference),
}

impl FieldType {
    /// Map a primitive keyword to its type.
    pub fn primitive(keyword: &str) -> Option<Self> {
        match keyword {
            "null" => Some(FieldType::Null),
            "boolean" => Some(FieldType::Boolean),
            "int" => Some(FieldType::Int),
            "long" => Some(FieldType::Long),
            "float" => Some(FieldType::Float),
            "double" => Some(FieldType::Double),
            "bytes" => Some(FieldType::Bytes),
            "string" => Some(FieldType::String),
            _ => None,
        }
    }

    /// Check if this is a primitive type.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            FieldType::Null
                | FieldType::Boolean
                | FieldType::Int
                | FieldType::Long
                | FieldType::Float
                | FieldType::Double
                | FieldType::Bytes
                | FieldType::String
        )
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            FieldType::Null => "null".to_string(),
            FieldType::Boolean => "boolean".to_string(),
            FieldType::Int => "int".to_string(),
            FieldType::Long => "long".to_string(),
            FieldType::Float => "float".to_string(),
            FieldType::Double => "double".to_string(),
            FieldType::Bytes => "bytes".to_string(),
            FieldType::String => "string".to_string(),
            FieldType::Array(_) => "array".to_string(),
            FieldType::Map(_) => "map".to_string(),
            FieldType::Union(branches) => format!("union of {}", branches.len()),
            FieldType::Reference(r) => r.target.to_string(),
        }
    }

    /// For a `[null, T]` union, get `T`.
    pub fn nullable_inner(&self) -> Option<&Field> {
        match self {
            FieldType::Union(branches) if branches.len() == 2 => {
                match (&branches[0].field_type, &branches[1].field_type) {
                    (FieldType::Null, FieldType::Null) => None,
                    (FieldType::Null, _) => Some(&branches[1]),
                    (_, FieldType::Null) => Some(&branches[0]),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// A by-name use of a definition.
///
/// Starts unresolved; [`Namespace::resolve_references`](super::Namespace::resolve_references)
/// links it to the definition's arena index.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    /// The name being referred to.
    pub target: QualifiedName,
    pub(crate) resolved: Option<DefinitionId>,
}

impl Reference {
    /// Create an unresolved reference.
    pub fn new(target: QualifiedName) -> Self {
        Self {
            target,
            resolved: None,
        }
    }

    /// The linked definition, once resolved.
    pub fn definition_id(&self) -> Option<DefinitionId> {
        self.resolved
    }

    /// Whether this reference has been linked.
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }
}
