//! Container file writer
//!
//! Records are encoded into an in-memory block buffer; once the pending
//! count reaches the configured threshold the block is compressed and
//! written out followed by the sync marker. Flushing is explicit: dropping
//! a writer with pending records loses them.

use std::collections::BTreeMap;
use std::io::Write;

use tracing::debug;
use uuid::Uuid;

use crate::binary::AvroValue;
use crate::codec::Codec;
use crate::error::WriterError;
use crate::schema::BoundSchema;

use super::block::write_block;
use super::header::{write_header, CODEC_KEY, RESERVED_PREFIX, SCHEMA_KEY, SYNC_MARKER_SIZE};

/// Configuration for [`ContainerWriter`].
#[derive(Debug, Clone, PartialEq)]
pub struct WriterConfig {
    /// Block compression codec (default: null).
    pub codec: Codec,
    /// Pending record count that triggers a block flush (default: 100).
    pub records_per_block: usize,
    /// Extra header metadata. Keys must not use the `avro.` prefix.
    pub metadata: BTreeMap<String, Vec<u8>>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            codec: Codec::Null,
            records_per_block: 100,
            metadata: BTreeMap::new(),
        }
    }
}

impl WriterConfig {
    /// Create a new WriterConfig with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the block codec.
    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Set the block flush threshold.
    pub fn with_records_per_block(mut self, records_per_block: usize) -> Self {
        self.records_per_block = records_per_block;
        self
    }

    /// Add a user metadata entry to the header.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Check the configuration.
    ///
    /// # Errors
    /// `WriterError::Configuration` if `records_per_block` is zero or a
    /// metadata key is reserved.
    pub fn validate(&self) -> Result<(), WriterError> {
        if self.records_per_block == 0 {
            return Err(WriterError::Configuration(
                "records_per_block must be at least 1".to_string(),
            ));
        }
        if let Some(key) = self
            .metadata
            .keys()
            .find(|key| key.starts_with(RESERVED_PREFIX))
        {
            return Err(WriterError::Configuration(format!(
                "Metadata key '{}' uses the reserved '{}' prefix",
                key, RESERVED_PREFIX
            )));
        }
        Ok(())
    }
}

/// Writes an Object Container File for one schema.
///
/// # Example
/// ```
/// use contrail::binary::AvroValue;
/// use contrail::container::{ContainerReader, ContainerWriter, WriterConfig};
/// use contrail::schema::Namespace;
///
/// let namespace = Namespace::from_schema(r#""long""#).unwrap();
/// let schema = namespace.schema(0).unwrap();
///
/// let mut writer = ContainerWriter::new(Vec::new(), schema, WriterConfig::default()).unwrap();
/// writer.write_record(&AvroValue::Long(42)).unwrap();
/// writer.flush().unwrap();
/// let bytes = writer.into_inner();
///
/// let values: Vec<_> = ContainerReader::new(bytes.as_slice())
///     .unwrap()
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(values, vec![AvroValue::Long(42)]);
/// ```
pub struct ContainerWriter<'a, W: Write> {
    sink: W,
    schema: BoundSchema<'a>,
    codec: Codec,
    records_per_block: usize,
    sync_marker: [u8; SYNC_MARKER_SIZE],
    block: Vec<u8>,
    pending: usize,
    blocks_written: usize,
}

impl<'a, W: Write> ContainerWriter<'a, W> {
    /// Validate the configuration and write the header.
    ///
    /// # Arguments
    /// * `sink` - Destination stream
    /// * `schema` - Schema every record is encoded with; embedded in the header
    /// * `config` - Codec, block threshold and extra metadata
    ///
    /// # Errors
    /// `WriterError::Configuration` for an invalid config, `WriterError::Io`
    /// if the header cannot be written.
    pub fn new(mut sink: W, schema: BoundSchema<'a>, config: WriterConfig) -> Result<Self, WriterError> {
        config.validate()?;

        let sync_marker = Uuid::new_v4().into_bytes();
        let schema_text = schema.to_json();

        let mut entries: Vec<(&str, &[u8])> = vec![
            (SCHEMA_KEY, schema_text.as_bytes()),
            (CODEC_KEY, config.codec.name().as_bytes()),
        ];
        entries.extend(
            config
                .metadata
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_slice())),
        );

        let mut header = Vec::new();
        write_header(&entries, &sync_marker, &mut header);
        sink.write_all(&header)?;

        debug!(
            codec = %config.codec,
            records_per_block = config.records_per_block,
            header_size = header.len(),
            "Opened container writer"
        );

        Ok(Self {
            sink,
            schema,
            codec: config.codec,
            records_per_block: config.records_per_block,
            sync_marker,
            block: Vec::new(),
            pending: 0,
            blocks_written: 0,
        })
    }

    /// Encode a record into the current block.
    ///
    /// Flushes the block once the pending count reaches the threshold. A
    /// record that fails to encode leaves the block untouched.
    pub fn write_record(&mut self, value: &AvroValue) -> Result<(), WriterError> {
        let mark = self.block.len();
        if let Err(e) = self.schema.encode_into(value, &mut self.block) {
            self.block.truncate(mark);
            return Err(e.into());
        }
        self.pending += 1;

        if self.pending >= self.records_per_block {
            self.flush()?;
        }
        Ok(())
    }

    /// Write all records in order.
    pub fn extend<'v, I>(&mut self, values: I) -> Result<(), WriterError>
    where
        I: IntoIterator<Item = &'v AvroValue>,
    {
        for value in values {
            self.write_record(value)?;
        }
        Ok(())
    }

    /// Write the pending records as one block and flush the sink.
    ///
    /// Does nothing when no records are pending.
    pub fn flush(&mut self) -> Result<(), WriterError> {
        if self.pending == 0 {
            return Ok(());
        }

        let payload = self.codec.compress(&self.block)?;
        let mut out = Vec::with_capacity(payload.len() + SYNC_MARKER_SIZE + 20);
        write_block(self.pending, &payload, &self.sync_marker, &mut out);
        self.sink.write_all(&out)?;
        self.sink.flush()?;

        debug!(
            block_index = self.blocks_written,
            records = self.pending,
            raw_size = self.block.len(),
            payload_size = payload.len(),
            codec = %self.codec,
            "Flushed block"
        );

        self.blocks_written += 1;
        self.pending = 0;
        self.block.clear();
        Ok(())
    }

    /// The sync marker written after the header and every block.
    pub fn sync_marker(&self) -> &[u8; SYNC_MARKER_SIZE] {
        &self.sync_marker
    }

    /// Records encoded but not yet written out.
    pub fn pending_records(&self) -> usize {
        self.pending
    }

    /// Blocks written so far.
    pub fn blocks_written(&self) -> usize {
        self.blocks_written
    }

    /// The codec used for blocks.
    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Borrow the sink.
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Return the sink. Pending records are discarded; call
    /// [`flush`](Self::flush) first.
    pub fn into_inner(self) -> W {
        self.sink
    }
}
