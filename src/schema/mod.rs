//! Avro schema model, decoding and name resolution.
//!
//! Schemas are decoded into [`Field`]s and named [`Definition`]s held by a
//! [`Namespace`]. Once every schema of a unit of work has been added,
//! [`Namespace::resolve_references`] links the type graph and
//! [`BoundSchema`] drives encoding, decoding and JSON emission.

mod compatibility;
mod emit;
mod name;
mod namespace;
mod parser;
mod types;

pub use compatibility::{check_registry_compatibility, SchemaRegistry};
pub use name::QualifiedName;
pub use namespace::{BoundSchema, Namespace, Schema};
pub use parser::SchemaParser;
pub use types::*;
