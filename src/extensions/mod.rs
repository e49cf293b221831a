//! Record extensions configured through schema attributes.
//!
//! Two extra attributes on record schemas are understood:
//! - `uuid_keys`: field paths whose values derive a deterministic identifier
//! - `metric_tags`: field paths whose values tag the per-record counter
//!
//! Paths are dot-separated and may descend into nested record fields. All
//! paths are checked against the schema once, when the [`RecordExtensions`]
//! table is built from a resolved namespace.

mod identifier;
mod metrics;

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::binary::AvroValue;
use crate::error::ExtensionError;
use crate::schema::{Definition, DefinitionId, Field, FieldType, Namespace, QualifiedName};

pub use identifier::IdentifierConfig;
pub use metrics::{NoopSink, StatsSink};

use identifier::is_identifier_type;

/// Record attribute listing the identifier key paths.
pub const UUID_KEYS_ATTRIBUTE: &str = "uuid_keys";

/// Record attribute listing the metric tag paths.
pub const METRIC_TAGS_ATTRIBUTE: &str = "metric_tags";

/// A validated dot-separated field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath {
    key: String,
    segments: Vec<String>,
}

impl KeyPath {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            segments: key.split('.').map(str::to_string).collect(),
        }
    }

    /// The path as written in the schema.
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Field names from the record down to the leaf.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

/// Extensions of one record type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPlan {
    identifier_keys: Vec<KeyPath>,
    metric_tags: Vec<KeyPath>,
}

impl RecordPlan {
    /// Paths feeding the identifier, in order.
    pub fn identifier_keys(&self) -> &[KeyPath] {
        &self.identifier_keys
    }

    /// Paths used as metric tags, in order.
    pub fn metric_tags(&self) -> &[KeyPath] {
        &self.metric_tags
    }
}

/// Identifier and metric configuration for every record of a namespace.
///
/// # Example
/// ```
/// use contrail::binary::AvroValue;
/// use contrail::extensions::RecordExtensions;
/// use contrail::schema::{Namespace, QualifiedName};
///
/// let namespace = Namespace::from_schema(r#"{
///     "type": "record", "name": "Host", "namespace": "net",
///     "uuid_keys": ["address"],
///     "fields": [{"name": "address", "type": "string"}]
/// }"#).unwrap();
/// let extensions = RecordExtensions::from_namespace(&namespace).unwrap();
///
/// let host = AvroValue::Record(vec![("address".into(), AvroValue::String("10.0.0.1".into()))]);
/// let id = extensions.identifier(&QualifiedName::new("net", "Host"), &host).unwrap();
/// assert_eq!(id.len(), 36);
/// ```
#[derive(Debug, Clone)]
pub struct RecordExtensions {
    plans: HashMap<QualifiedName, RecordPlan>,
    config: IdentifierConfig,
}

impl RecordExtensions {
    /// Build the table with the default identifier configuration.
    ///
    /// # Errors
    /// See [`with_config`](Self::with_config).
    pub fn from_namespace(namespace: &Namespace) -> Result<Self, ExtensionError> {
        Self::with_config(namespace, IdentifierConfig::default())
    }

    /// Build the table for every record in a resolved namespace.
    ///
    /// # Errors
    /// - `ExtensionError::InvalidAttribute` if an attribute is not an array of strings
    /// - `ExtensionError::InvalidKey` if a path names no usable field; the
    ///   error lists the valid paths
    pub fn with_config(namespace: &Namespace, config: IdentifierConfig) -> Result<Self, ExtensionError> {
        let mut plans = HashMap::new();

        for (index, definition) in namespace.definitions().iter().enumerate() {
            let Some(record) = definition.as_record() else {
                continue;
            };
            let id = DefinitionId(index);

            let identifier_keys = resolve_keys(
                namespace,
                id,
                definition,
                &record.fields,
                UUID_KEYS_ATTRIBUTE,
                "uuid",
                is_identifier_type,
            )?;
            let metric_tags = resolve_keys(
                namespace,
                id,
                definition,
                &record.fields,
                METRIC_TAGS_ATTRIBUTE,
                "metric tag",
                |_, _| true,
            )?;

            if !identifier_keys.is_empty() || !metric_tags.is_empty() {
                debug!(
                    record = %definition.name,
                    identifier_keys = identifier_keys.len(),
                    metric_tags = metric_tags.len(),
                    "Resolved record extensions"
                );
            }

            plans.insert(
                definition.name.clone(),
                RecordPlan {
                    identifier_keys,
                    metric_tags,
                },
            );
        }

        Ok(Self { plans, config })
    }

    /// The identifier configuration in use.
    pub fn config(&self) -> &IdentifierConfig {
        &self.config
    }

    /// The extensions of a record, if it is known.
    pub fn plan(&self, record: &QualifiedName) -> Option<&RecordPlan> {
        self.plans.get(record)
    }

    /// The text an identifier is derived from: every key value rendered and
    /// joined with the field separator.
    pub fn identifier_source(&self, record: &QualifiedName, value: &AvroValue) -> Result<String, ExtensionError> {
        let plan = self.known(record)?;
        let mut source = String::new();

        for (i, key) in plan.identifier_keys.iter().enumerate() {
            if i > 0 {
                source.push(self.config.field_separator);
            }
            let leaf = lookup(record, value, key)?;
            self.config
                .render(leaf, &mut source)
                .map_err(|kind| ExtensionError::ValueMismatch {
                    record: record.clone(),
                    message: format!("key '{}' holds a {} value", key.as_str(), kind),
                })?;
        }

        Ok(source)
    }

    /// Derive the deterministic identifier of a record value, as a
    /// lowercase hyphenated UUID.
    ///
    /// # Errors
    /// - `ExtensionError::UnknownRecord` if no record has that name
    /// - `ExtensionError::ValueMismatch` if the value lacks a key field
    pub fn identifier(&self, record: &QualifiedName, value: &AvroValue) -> Result<String, ExtensionError> {
        let source = self.identifier_source(record, value)?;
        Ok(self.config.hash(&source).hyphenated().to_string())
    }

    /// Count one occurrence of the record, tagged with its configured fields.
    pub fn send_stats<S: StatsSink + ?Sized>(
        &self,
        sink: &S,
        record: &QualifiedName,
        value: &AvroValue,
    ) -> Result<(), ExtensionError> {
        let plan = self.known(record)?;
        let tags = plan
            .metric_tags
            .iter()
            .map(|tag| {
                lookup(record, value, tag).map(|leaf| (tag.as_str().to_string(), leaf.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        sink.count(&record.to_string(), 1, &tags);
        Ok(())
    }

    fn known(&self, record: &QualifiedName) -> Result<&RecordPlan, ExtensionError> {
        self.plans
            .get(record)
            .ok_or_else(|| ExtensionError::UnknownRecord(record.clone()))
    }
}

/// Read a string-list attribute and check each path against the record.
fn resolve_keys(
    namespace: &Namespace,
    id: DefinitionId,
    definition: &Definition,
    fields: &[Field],
    attribute: &'static str,
    purpose: &'static str,
    accept: fn(&Namespace, &FieldType) -> bool,
) -> Result<Vec<KeyPath>, ExtensionError> {
    let keys = match definition.metadata.get(attribute) {
        None => return Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().ok_or_else(|| ExtensionError::InvalidAttribute {
                    record: definition.name.clone(),
                    attribute,
                    message: format!("expected a string, found {}", item),
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(ExtensionError::InvalidAttribute {
                record: definition.name.clone(),
                attribute,
                message: format!("expected an array of strings, found {}", other),
            })
        }
    };

    let mut valid = Vec::new();
    collect_paths(namespace, fields, "", &mut vec![id], accept, &mut valid);

    keys.into_iter()
        .map(|key| {
            if valid.iter().any(|v| v == key) {
                Ok(KeyPath::new(key))
            } else {
                Err(ExtensionError::InvalidKey {
                    record: definition.name.clone(),
                    purpose,
                    key: key.to_string(),
                    valid: valid.join(", "),
                })
            }
        })
        .collect()
}

/// List every accepted field path, descending into nested records. Records
/// already on the current path are not entered again.
fn collect_paths(
    namespace: &Namespace,
    fields: &[Field],
    prefix: &str,
    visiting: &mut Vec<DefinitionId>,
    accept: fn(&Namespace, &FieldType) -> bool,
    out: &mut Vec<String>,
) {
    for field in fields {
        let path = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{}.{}", prefix, field.name)
        };

        if accept(namespace, &field.field_type) {
            out.push(path.clone());
        }

        let FieldType::Reference(reference) = &field.field_type else {
            continue;
        };
        let Some(id) = reference.definition_id() else {
            continue;
        };
        if visiting.contains(&id) {
            continue;
        }
        if let Some(nested) = namespace.definition(id).and_then(Definition::as_record) {
            visiting.push(id);
            collect_paths(namespace, &nested.fields, &path, visiting, accept, out);
            visiting.pop();
        }
    }
}

fn lookup<'v>(record: &QualifiedName, value: &'v AvroValue, key: &KeyPath) -> Result<&'v AvroValue, ExtensionError> {
    key.segments.iter().try_fold(value.unwrap_union(), |current, segment| {
        current
            .field(segment)
            .map(AvroValue::unwrap_union)
            .ok_or_else(|| ExtensionError::ValueMismatch {
                record: record.clone(),
                message: format!("missing field '{}' for key '{}'", segment, key.as_str()),
            })
    })
}
