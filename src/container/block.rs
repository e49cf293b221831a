//! Container data blocks
//!
//! A block is:
//! - Record count (long)
//! - Payload size in bytes (long)
//! - Codec payload
//! - 16-byte sync marker, equal to the header's

use std::io::Read;

use bytes::Bytes;
use tracing::debug;

use crate::binary::encode_long;
use crate::codec::Codec;
use crate::error::ReaderError;

use super::header::SYNC_MARKER_SIZE;
use super::stream::OffsetReader;

/// A single data block as stored in the file.
#[derive(Debug, Clone)]
pub struct AvroBlock {
    /// Number of records in this block
    pub record_count: i64,
    /// The codec payload
    pub data: Bytes,
    /// Position of this block in the file (for error reporting)
    pub file_offset: u64,
    /// Sequential block number (0-indexed)
    pub block_index: usize,
}

/// A decompressed block ready for record decoding.
#[derive(Debug, Clone)]
pub struct DecompressedBlock {
    /// Number of records in this block
    pub record_count: i64,
    /// The concatenated encoded records
    pub data: Bytes,
    /// Sequential block number (for error reporting)
    pub block_index: usize,
}

impl AvroBlock {
    /// Read the next block, validating its trailing sync marker.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly where a block would
    /// start.
    ///
    /// # Errors
    /// - `ReaderError::Parse` if the block structure is invalid or truncated
    /// - `ReaderError::InvalidSyncMarker` if the sync marker doesn't match
    pub(crate) fn read_from<R: Read>(
        reader: &mut OffsetReader<R>,
        expected_sync: &[u8; SYNC_MARKER_SIZE],
        block_index: usize,
    ) -> Result<Option<Self>, ReaderError> {
        let file_offset = reader.offset();

        let record_count = match reader.read_long("block record count")? {
            None => return Ok(None),
            Some(count) if count < 0 => {
                return Err(ReaderError::Parse {
                    offset: file_offset,
                    message: format!("Invalid negative record count: {}", count),
                })
            }
            Some(count) => count,
        };

        let size = reader.require_length("block payload size")?;
        let data = Bytes::from(reader.read_vec(size, "block payload")?);

        let sync_offset = reader.offset();
        let sync_marker = reader.read_array::<SYNC_MARKER_SIZE>("block sync marker")?;
        if &sync_marker != expected_sync {
            return Err(ReaderError::InvalidSyncMarker {
                block_index,
                offset: sync_offset,
            });
        }

        debug!(
            block_index,
            record_count,
            payload_size = size,
            file_offset,
            "Read block"
        );

        Ok(Some(Self {
            record_count,
            data,
            file_offset,
            block_index,
        }))
    }

    /// Check if this block is empty (contains no records).
    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    /// Undo the codec, producing the record bytes.
    pub fn decompress(&self, codec: Codec) -> Result<DecompressedBlock, ReaderError> {
        let data = match codec {
            Codec::Null => self.data.clone(),
            other => Bytes::from(other.decompress(&self.data)?),
        };
        Ok(DecompressedBlock {
            record_count: self.record_count,
            data,
            block_index: self.block_index,
        })
    }
}

impl DecompressedBlock {
    /// Check if this block is empty.
    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }
}

/// Append an encoded block to `out`.
pub(crate) fn write_block(
    record_count: usize,
    payload: &[u8],
    sync_marker: &[u8; SYNC_MARKER_SIZE],
    out: &mut Vec<u8>,
) {
    encode_long(record_count as i64, out);
    encode_long(payload.len() as i64, out);
    out.extend_from_slice(payload);
    out.extend_from_slice(sync_marker);
}
