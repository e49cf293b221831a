//! Container file reader
//!
//! Reads the header, links the embedded writer schema, then yields records
//! block by block. Every block's sync marker is checked against the header.

use std::io::Read;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::binary::{decode_value, AvroValue};
use crate::error::ReaderError;
use crate::schema::{BoundSchema, Field, Namespace};

use super::block::{AvroBlock, DecompressedBlock};
use super::header::ContainerHeader;
use super::stream::OffsetReader;

/// Records still to be decoded from the current block.
#[derive(Debug)]
struct BlockCursor {
    data: Bytes,
    position: usize,
    remaining: i64,
    record_index: usize,
    block_index: usize,
}

impl From<DecompressedBlock> for BlockCursor {
    fn from(block: DecompressedBlock) -> Self {
        Self {
            data: block.data,
            position: 0,
            remaining: block.record_count,
            record_index: 0,
            block_index: block.block_index,
        }
    }
}

/// Streaming reader over an Object Container File.
///
/// Iterating yields one decoded record at a time. After a block-level error
/// (I/O, bad sync marker, codec failure) the reader is finished; after a
/// record decode error the rest of that block is dropped and reading
/// continues with the next block.
pub struct ContainerReader<R: Read> {
    reader: OffsetReader<R>,
    header: ContainerHeader,
    namespace: Namespace,
    root: Field,
    block_index: usize,
    current: Option<BlockCursor>,
    finished: bool,
}

impl<R: Read> ContainerReader<R> {
    /// Read the header and link the embedded schema.
    ///
    /// # Errors
    /// - `ReaderError::InvalidMagic` if the stream is not a container file
    /// - `ReaderError::Parse` if the header is truncated or lacks a schema
    /// - `ReaderError::Schema` if the embedded schema does not decode or link
    /// - `ReaderError::Codec` for an unknown codec
    pub fn new(source: R) -> Result<Self, ReaderError> {
        let mut reader = OffsetReader::new(source);
        let header = ContainerHeader::read_from(&mut reader)?;
        let namespace = Namespace::from_schema(header.schema_text()?)?;
        let root = namespace
            .schemas()
            .first()
            .map(|schema| schema.root().clone())
            .ok_or_else(|| ReaderError::Parse {
                offset: 0,
                message: "Header schema produced no root type".to_string(),
            })?;

        debug!(
            codec = %header.codec,
            header_size = header.header_size,
            definitions = namespace.definitions().len(),
            "Opened container reader"
        );

        Ok(Self {
            reader,
            header,
            namespace,
            root,
            block_index: 0,
            current: None,
            finished: false,
        })
    }

    /// The parsed header.
    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    /// The writer schema embedded in the header.
    pub fn schema(&self) -> BoundSchema<'_> {
        self.namespace.bind(&self.root)
    }

    /// The namespace holding the writer schema's named types.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Read and decompress the next block.
    ///
    /// Records of the current block not yet returned by the iterator are
    /// discarded. Returns `Ok(None)` at the end of the stream.
    pub fn next_block(&mut self) -> Result<Option<DecompressedBlock>, ReaderError> {
        self.current = None;
        if self.finished {
            return Ok(None);
        }

        let result = AvroBlock::read_from(&mut self.reader, &self.header.sync_marker, self.block_index)
            .and_then(|block| block.map(|b| b.decompress(self.header.codec)).transpose());

        match result {
            Ok(Some(block)) => {
                self.block_index += 1;
                Ok(Some(block))
            }
            Ok(None) => {
                self.finished = true;
                Ok(None)
            }
            Err(e) => {
                self.finished = true;
                Err(e)
            }
        }
    }

    /// Return the underlying stream.
    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}

impl<R: Read> Iterator for ContainerReader<R> {
    type Item = Result<AvroValue, ReaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(cursor) = &mut self.current {
                if cursor.remaining > 0 {
                    let mut data = &cursor.data[cursor.position..];
                    let available = data.len();
                    match decode_value(&self.namespace, &self.root, &mut data) {
                        Ok(value) => {
                            cursor.position += available - data.len();
                            cursor.remaining -= 1;
                            cursor.record_index += 1;
                            return Some(Ok(value));
                        }
                        Err(source) => {
                            let err = ReaderError::Decode {
                                block_index: cursor.block_index,
                                record_index: cursor.record_index,
                                source,
                            };
                            self.current = None;
                            return Some(Err(err));
                        }
                    }
                }

                if cursor.position < cursor.data.len() {
                    warn!(
                        block_index = cursor.block_index,
                        trailing_bytes = cursor.data.len() - cursor.position,
                        "Block has bytes after its last record"
                    );
                }
            }

            match self.next_block() {
                Ok(Some(block)) => self.current = Some(BlockCursor::from(block)),
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
