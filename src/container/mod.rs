//! Avro Object Container Files
//!
//! A container file is a header (magic, metadata, sync marker) followed by
//! blocks of encoded records, each block compressed with the header's codec
//! and terminated by the sync marker.

mod block;
mod header;
mod reader;
mod stream;
mod writer;

pub use block::{AvroBlock, DecompressedBlock};
pub use header::{ContainerHeader, AVRO_MAGIC, CODEC_KEY, RESERVED_PREFIX, SCHEMA_KEY, SYNC_MARKER_SIZE};
pub use reader::ContainerReader;
pub use writer::{ContainerWriter, WriterConfig};
