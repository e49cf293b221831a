//! Schema-driven Avro binary encoding
//!
//! This library decodes Avro JSON schemas into a linked type graph, encodes
//! and decodes values in the Avro binary format, and reads and writes Avro
//! Object Container Files with null, deflate or snappy blocks.
//!
//! # Example
//! ```
//! use contrail::{AvroValue, Namespace};
//!
//! let namespace = Namespace::from_schema(r#"["null", "string"]"#).unwrap();
//! let schema = namespace.schema(0).unwrap();
//!
//! let value = AvroValue::Union(1, Box::new(AvroValue::String("x".into())));
//! let bytes = schema.encode(&value).unwrap();
//! assert_eq!(bytes, [0x02, 0x02, b'x']);
//! assert_eq!(schema.decode(&mut bytes.as_slice()).unwrap(), value);
//! ```

pub mod binary;
pub mod codec;
pub mod container;
pub mod error;
pub mod extensions;
pub mod schema;

// Re-export main types
pub use binary::{decode_value, encode_value, json_to_avro_value, AvroValue};
pub use codec::Codec;
pub use container::{ContainerHeader, ContainerReader, ContainerWriter, WriterConfig};
pub use error::{
    CodecError, DecodeError, EncodeError, ExtensionError, ReaderError, RegistryError, SchemaError,
    WriterError,
};
pub use extensions::{IdentifierConfig, RecordExtensions, StatsSink};
pub use schema::{
    check_registry_compatibility, BoundSchema, Definition, DefinitionId, DefinitionKind, Field,
    FieldType, Namespace, QualifiedName, Reference, SchemaRegistry,
};
