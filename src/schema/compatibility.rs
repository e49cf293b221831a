//! Schema-registry compatibility check.
//!
//! A local schema names its registry entry through top-level `subject` and
//! `version` attributes. The check fetches that entry and compares the two
//! schemas as parsed JSON, so whitespace and key order do not matter and
//! numbers compare by value.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::RegistryError;

/// Source of registered schemas.
///
/// Implementations own the connection to the registry; this crate only
/// asks for schema text.
pub trait SchemaRegistry {
    /// Fetch the schema text registered for `subject` at `version`.
    fn schema_by_subject(&self, subject: &str, version: i64) -> Result<String, RegistryError>;
}

/// Compare a local schema with its registered counterpart.
///
/// # Arguments
/// * `registry` - Where to look up the remote schema
/// * `local_schema` - Local schema text carrying `subject` and `version`
///
/// # Errors
/// * [`RegistryError::LocalSchema`] if the local text is not JSON or lacks
///   `subject`/`version`
/// * [`RegistryError::RemoteSchema`] if the registry answer is not JSON
/// * [`RegistryError::Incompatible`] if the two schemas differ
/// * any error returned by the registry itself
pub fn check_registry_compatibility<R>(
    registry: &R,
    local_schema: &str,
) -> Result<(), RegistryError>
where
    R: SchemaRegistry + ?Sized,
{
    let local: Value =
        serde_json::from_str(local_schema).map_err(|e| RegistryError::LocalSchema(e.to_string()))?;

    let subject = local
        .get("subject")
        .and_then(Value::as_str)
        .ok_or_else(|| RegistryError::LocalSchema("missing string attribute 'subject'".into()))?;
    let version = local
        .get("version")
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
        .ok_or_else(|| RegistryError::LocalSchema("missing numeric attribute 'version'".into()))?;

    let remote_text = registry.schema_by_subject(subject, version)?;
    let remote: Value =
        serde_json::from_str(&remote_text).map_err(|e| RegistryError::RemoteSchema(e.to_string()))?;

    if !same_json(&local, &remote) {
        warn!(subject, version, "Local schema differs from registry");
        return Err(RegistryError::Incompatible {
            subject: subject.to_string(),
            version,
        });
    }

    debug!(subject, version, "Schema matches registry");
    Ok(())
}

/// Structural JSON equality where numbers compare by value, so `2` and
/// `2.0` are the same.
fn same_json(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| same_json(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, x)| y.get(key).map_or(false, |y| same_json(x, y)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FixedRegistry(HashMap<(String, i64), String>);

    impl SchemaRegistry for FixedRegistry {
        fn schema_by_subject(&self, subject: &str, version: i64) -> Result<String, RegistryError> {
            self.0
                .get(&(subject.to_string(), version))
                .cloned()
                .ok_or_else(|| RegistryError::Lookup {
                    subject: subject.to_string(),
                    version,
                    message: "not found".into(),
                })
        }
    }

    const LOCAL: &str = r#"{"type": "record", "name": "Event", "subject": "events", "version": 2,
        "fields": [{"name": "id", "type": "long"}]}"#;

    fn registry_with(text: &str) -> FixedRegistry {
        let mut entries = HashMap::new();
        entries.insert(("events".to_string(), 2), text.to_string());
        FixedRegistry(entries)
    }

    #[test]
    fn test_matching_schema_with_different_layout() {
        let registry = registry_with(
            r#"{"fields":[{"type":"long","name":"id"}],"version":2,"subject":"events","name":"Event","type":"record"}"#,
        );
        check_registry_compatibility(&registry, LOCAL).unwrap();
    }

    #[test]
    fn test_mismatch_is_incompatible() {
        let registry = registry_with(
            r#"{"type": "record", "name": "Event", "subject": "events", "version": 2,
                "fields": [{"name": "id", "type": "int"}]}"#,
        );
        let err = check_registry_compatibility(&registry, LOCAL).unwrap_err();
        assert!(matches!(err, RegistryError::Incompatible { version: 2, .. }));
    }

    #[test]
    fn test_numbers_compare_by_value() {
        let registry = registry_with(
            r#"{"type": "record", "name": "Event", "subject": "events", "version": 2.0,
                "fields": [{"name": "id", "type": "long"}]}"#,
        );
        check_registry_compatibility(&registry, LOCAL).unwrap();

        assert!(same_json(&serde_json::json!([1, {"size": 16}]), &serde_json::json!([1.0, {"size": 16.0}])));
        assert!(!same_json(&serde_json::json!({"size": 16}), &serde_json::json!({"size": 16.5})));
        assert!(!same_json(&serde_json::json!({"a": 1}), &serde_json::json!({"a": 1, "b": 2})));
    }

    #[test]
    fn test_lookup_failure_propagates() {
        let registry = FixedRegistry(HashMap::new());
        let err = check_registry_compatibility(&registry, LOCAL).unwrap_err();
        assert!(matches!(err, RegistryError::Lookup { .. }));
    }

    #[test]
    fn test_remote_not_json() {
        let registry = registry_with("<html>");
        let err = check_registry_compatibility(&registry, LOCAL).unwrap_err();
        assert!(matches!(err, RegistryError::RemoteSchema(_)));
    }

    #[test]
    fn test_local_without_subject() {
        let registry = FixedRegistry(HashMap::new());
        let err = check_registry_compatibility(&registry, r#"{"type": "string", "version": 1}"#)
            .unwrap_err();
        assert!(matches!(err, RegistryError::LocalSchema(_)));
    }
}
