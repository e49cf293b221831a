//! Object Container File header
//!
//! The header is:
//! - Magic bytes ("Obj\x01")
//! - Metadata map of string keys to byte values (schema, codec, user entries)
//! - 16-byte sync marker

use std::collections::HashMap;
use std::io::Read;

use crate::binary::encode_long;
use crate::codec::Codec;
use crate::error::ReaderError;

use super::stream::OffsetReader;

/// The Avro magic bytes that identify an Object Container File.
/// Format: "Obj" followed by version byte (0x01)
pub const AVRO_MAGIC: [u8; 4] = [b'O', b'b', b'j', 0x01];

/// Size of the sync marker in bytes
pub const SYNC_MARKER_SIZE: usize = 16;

/// Metadata key holding the writer schema.
pub const SCHEMA_KEY: &str = "avro.schema";

/// Metadata key holding the codec name.
pub const CODEC_KEY: &str = "avro.codec";

/// Prefix reserved for Avro's own metadata keys.
pub const RESERVED_PREFIX: &str = "avro.";

/// Parsed container file header.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerHeader {
    /// Metadata key-value pairs from the header
    pub metadata: HashMap<String, Vec<u8>>,
    /// 16-byte sync marker repeated after every block
    pub sync_marker: [u8; SYNC_MARKER_SIZE],
    /// Compression codec from metadata (null when absent)
    pub codec: Codec,
    /// Total size of the header in bytes (offset where blocks begin)
    pub header_size: u64,
}

impl ContainerHeader {
    /// The embedded writer schema text.
    ///
    /// # Errors
    /// `ReaderError::Parse` if the entry is missing or not UTF-8.
    pub fn schema_text(&self) -> Result<&str, ReaderError> {
        let raw = self.metadata.get(SCHEMA_KEY).ok_or_else(|| ReaderError::Parse {
            offset: 0,
            message: format!("Missing required '{}' metadata", SCHEMA_KEY),
        })?;
        std::str::from_utf8(raw).map_err(|e| ReaderError::Parse {
            offset: 0,
            message: format!("'{}' is not valid UTF-8: {}", SCHEMA_KEY, e),
        })
    }

    /// A metadata value as text, if present and UTF-8.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(|v| std::str::from_utf8(v).ok())
    }

    /// Read and validate a header from the start of a stream.
    pub(crate) fn read_from<R: Read>(reader: &mut OffsetReader<R>) -> Result<Self, ReaderError> {
        let magic = reader.read_array::<4>("magic bytes")?;
        if magic != AVRO_MAGIC {
            return Err(ReaderError::InvalidMagic(magic));
        }

        let metadata = read_metadata(reader)?;
        let sync_marker = reader.read_array::<SYNC_MARKER_SIZE>("sync marker")?;

        let codec = match metadata.get(CODEC_KEY) {
            None => Codec::Null,
            Some(raw) => {
                let name = std::str::from_utf8(raw).map_err(|e| ReaderError::Parse {
                    offset: 0,
                    message: format!("'{}' is not valid UTF-8: {}", CODEC_KEY, e),
                })?;
                Codec::from_name(name)?
            }
        };

        Ok(Self {
            metadata,
            sync_marker,
            codec,
            header_size: reader.offset(),
        })
    }
}

/// Read the metadata map.
///
/// Encoded like any Avro map of bytes: blocks of a count (negative when a
/// byte size follows) and key/value pairs, ended by a zero count.
fn read_metadata<R: Read>(
    reader: &mut OffsetReader<R>,
) -> Result<HashMap<String, Vec<u8>>, ReaderError> {
    let mut metadata = HashMap::new();

    loop {
        let count = reader.require_long("metadata block count")?;
        if count == 0 {
            return Ok(metadata);
        }
        if count < 0 {
            let _block_size = reader.require_long("metadata block size")?;
        }

        for _ in 0..count.unsigned_abs() {
            let key_len = reader.require_length("metadata key length")?;
            let key_offset = reader.offset();
            let key = String::from_utf8(reader.read_vec(key_len, "metadata key")?).map_err(
                |e| ReaderError::Parse {
                    offset: key_offset,
                    message: format!("Metadata key is not valid UTF-8: {}", e),
                },
            )?;
            let value_len = reader.require_length("metadata value length")?;
            let value = reader.read_vec(value_len, "metadata value")?;
            metadata.insert(key, value);
        }
    }
}

/// Append an encoded header to `out`.
///
/// Entries are written in the order given, as a single map block.
pub(crate) fn write_header(
    entries: &[(&str, &[u8])],
    sync_marker: &[u8; SYNC_MARKER_SIZE],
    out: &mut Vec<u8>,
) {
    out.extend_from_slice(&AVRO_MAGIC);
    if !entries.is_empty() {
        encode_long(entries.len() as i64, out);
        for (key, value) in entries {
            encode_long(key.len() as i64, out);
            out.extend_from_slice(key.as_bytes());
            encode_long(value.len() as i64, out);
            out.extend_from_slice(value);
        }
    }
    encode_long(0, out);
    out.extend_from_slice(sync_marker);
}
