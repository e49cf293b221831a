//! Error types for schema resolution, binary coding and container files

use std::io;
use thiserror::Error;

use crate::schema::QualifiedName;

/// Errors that can occur while decoding schemas and linking a namespace
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Schema text is not valid JSON
    #[error("Parse error: {0}")]
    ParseError(String),
    /// A required attribute is missing
    #[error("Missing required key '{key}' in {context}")]
    MissingKey { key: &'static str, context: String },
    /// An attribute has the wrong JSON kind
    #[error("Key '{key}' in {context} must be {expected}, found {found}")]
    WrongValueType {
        key: &'static str,
        context: String,
        expected: &'static str,
        found: String,
    },
    /// The `type` attribute names nothing we can decode
    #[error("Unknown type name '{0}'")]
    UnknownTypeName(String),
    /// A default value does not match the field type
    #[error("Invalid default for field '{field}': expected {expected}, found {found}")]
    InvalidDefault {
        field: String,
        expected: &'static str,
        found: String,
    },
    /// Invalid schema format
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    /// The name or an alias of a definition is already registered
    #[error("Conflicting definitions for {0}")]
    Conflict(QualifiedName),
    /// A reference names a type that was never defined
    #[error("Unknown type {0}")]
    UnknownType(QualifiedName),
}

impl SchemaError {
    pub(crate) fn wrong_type(
        key: &'static str,
        context: impl Into<String>,
        expected: &'static str,
        found: &serde_json::Value,
    ) -> Self {
        SchemaError::WrongValueType {
            key,
            context: context.into(),
            expected,
            found: found.to_string(),
        }
    }
}

/// Errors that can occur during codec operations
#[derive(Debug, Error)]
pub enum CodecError {
    /// Unsupported codec
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),
    /// Compression error
    #[error("Compression error: {0}")]
    CompressionError(String),
    /// Decompression error
    #[error("Decompression error: {0}")]
    DecompressionError(String),
}

/// Errors that can occur during decoding
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Invalid Avro data
    #[error("Invalid data: {0}")]
    InvalidData(String),
    /// Unexpected end of data
    #[error("Unexpected end of file")]
    UnexpectedEof,
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Invalid varint encoding
    #[error("Invalid varint encoding")]
    InvalidVarint,
    /// String is not valid UTF-8
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    /// Schema still contains an unlinked reference
    #[error("Unresolved reference to {0}")]
    UnresolvedReference(QualifiedName),
}

/// Errors that can occur while encoding a value
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The value does not fit the field type
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: &'static str,
    },
    /// The value has the right shape but an invalid content
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    /// A record value lacks a field that has no default
    #[error("Missing field '{field}' for record {record}")]
    MissingField {
        record: QualifiedName,
        field: String,
    },
    /// Schema still contains an unlinked reference
    #[error("Unresolved reference to {0}")]
    UnresolvedReference(QualifiedName),
}

/// Top-level container reader error type
#[derive(Debug, Error)]
pub enum ReaderError {
    /// IO error from the underlying stream
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Parse error at specific offset
    #[error("Parse error at offset {offset}: {message}")]
    Parse { offset: u64, message: String },

    /// Schema error
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Decode error in block/record
    #[error("Decode error in block {block_index}, record {record_index}: {source}")]
    Decode {
        block_index: usize,
        record_index: usize,
        #[source]
        source: DecodeError,
    },

    /// Codec error
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Invalid magic bytes
    #[error("Invalid magic bytes: expected 'Obj\\x01', found {0:?}")]
    InvalidMagic([u8; 4]),

    /// Invalid sync marker
    #[error("Invalid sync marker at block {block_index}, offset {offset}")]
    InvalidSyncMarker { block_index: usize, offset: u64 },
}

/// Errors that can occur while writing a container file
#[derive(Debug, Error)]
pub enum WriterError {
    /// IO error from the underlying stream
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Invalid writer configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Codec error
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Record could not be encoded
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),
}

/// Errors raised by the schema-registry compatibility check
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The local schema could not be read
    #[error("Failed to read local schema: {0}")]
    LocalSchema(String),

    /// The registry lookup failed
    #[error("Failed to retrieve schema {subject} v{version} from registry: {message}")]
    Lookup {
        subject: String,
        version: i64,
        message: String,
    },

    /// The registry returned something that is not JSON
    #[error("Failed to parse schema from registry: {0}")]
    RemoteSchema(String),

    /// Local and remote schemas differ
    #[error("Incompatible schemas for {subject} v{version}")]
    Incompatible { subject: String, version: i64 },
}

/// Errors raised while configuring or applying record extensions
#[derive(Debug, Error)]
pub enum ExtensionError {
    /// A configured key does not name a usable field
    #[error("Can't use '{key}' as a {purpose} key for {record}; valid keys are {valid}")]
    InvalidKey {
        record: QualifiedName,
        purpose: &'static str,
        key: String,
        valid: String,
    },

    /// The extension attribute is malformed
    #[error("Invalid '{attribute}' attribute on {record}: {message}")]
    InvalidAttribute {
        record: QualifiedName,
        attribute: &'static str,
        message: String,
    },

    /// No record of that name was registered
    #[error("Unknown record {0}")]
    UnknownRecord(QualifiedName),

    /// The value handed in does not match the record
    #[error("Record value for {record} does not match its schema: {message}")]
    ValueMismatch {
        record: QualifiedName,
        message: String,
    },
}
