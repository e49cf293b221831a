//! Compression codec support for Avro blocks
//!
//! Avro container files compress each block payload independently. This
//! module provides the codec abstraction with both directions: the writer
//! compresses, the reader decompresses.

use crate::error::CodecError;

#[cfg(feature = "snappy")]
use snap::raw::{Decoder as SnappyDecoder, Encoder as SnappyEncoder};

#[cfg(feature = "deflate")]
use flate2::{read::DeflateDecoder, write::DeflateEncoder, Compression};

#[cfg(feature = "deflate")]
use std::io::{Read, Write};

/// Size of the CRC32 trailer after a snappy payload.
#[cfg(feature = "snappy")]
const CRC_SIZE: usize = 4;

/// Compression codec used within Avro blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Codec {
    /// No compression (passthrough)
    #[default]
    Null,
    /// Raw DEFLATE compression (RFC 1951)
    Deflate,
    /// Snappy compression with Avro framing (4-byte CRC suffix)
    Snappy,
}

impl Codec {
    /// Parse a codec from its name string as found in Avro metadata.
    ///
    /// # Examples
    /// ```
    /// use contrail::codec::Codec;
    ///
    /// let codec = Codec::from_name("deflate").unwrap();
    /// assert_eq!(codec, Codec::Deflate);
    ///
    /// let err = Codec::from_name("lz4").unwrap_err();
    /// assert!(err.to_string().contains("lz4"));
    /// ```
    pub fn from_name(name: &str) -> Result<Self, CodecError> {
        match name {
            "null" => Ok(Codec::Null),
            "deflate" => Ok(Codec::Deflate),
            "snappy" => Ok(Codec::Snappy),
            unknown => Err(CodecError::UnsupportedCodec(format!(
                "Unknown codec '{}'. Supported codecs: null, deflate, snappy",
                unknown
            ))),
        }
    }

    /// Get the canonical name of this codec.
    ///
    /// This returns the name as it appears in the `avro.codec` metadata entry.
    pub fn name(&self) -> &'static str {
        match self {
            Codec::Null => "null",
            Codec::Deflate => "deflate",
            Codec::Snappy => "snappy",
        }
    }

    /// Turn the concatenated record bytes of a block into its payload.
    ///
    /// # Errors
    /// `CodecError::UnsupportedCodec` if the codec's feature is disabled,
    /// `CodecError::CompressionError` if the compressor fails.
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        match self {
            Codec::Null => Ok(data.to_vec()),
            #[cfg(feature = "snappy")]
            Codec::Snappy => compress_snappy(data),
            #[cfg(not(feature = "snappy"))]
            Codec::Snappy => Err(CodecError::UnsupportedCodec(
                "Snappy codec not enabled. Enable the 'snappy' feature.".to_string(),
            )),
            #[cfg(feature = "deflate")]
            Codec::Deflate => compress_deflate(data),
            #[cfg(not(feature = "deflate"))]
            Codec::Deflate => Err(CodecError::UnsupportedCodec(
                "Deflate codec not enabled. Enable the 'deflate' feature.".to_string(),
            )),
        }
    }

    /// Recover the record bytes from a block payload.
    ///
    /// For the null codec, this is a passthrough that returns a copy of the input.
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        match self {
            Codec::Null => Ok(data.to_vec()),
            #[cfg(feature = "snappy")]
            Codec::Snappy => decompress_snappy(data),
            #[cfg(not(feature = "snappy"))]
            Codec::Snappy => Err(CodecError::UnsupportedCodec(
                "Snappy codec not enabled. Enable the 'snappy' feature.".to_string(),
            )),
            #[cfg(feature = "deflate")]
            Codec::Deflate => decompress_deflate(data),
            #[cfg(not(feature = "deflate"))]
            Codec::Deflate => Err(CodecError::UnsupportedCodec(
                "Deflate codec not enabled. Enable the 'deflate' feature.".to_string(),
            )),
        }
    }
}

/// Compress with snappy and append the Avro CRC trailer.
///
/// Format: [snappy_compressed_data][4-byte big-endian CRC32 of the input]
#[cfg(feature = "snappy")]
fn compress_snappy(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut compressed = SnappyEncoder::new()
        .compress_vec(data)
        .map_err(|e| CodecError::CompressionError(format!("Snappy compression failed: {}", e)))?;
    compressed.extend_from_slice(&crc32fast::hash(data).to_be_bytes());
    Ok(compressed)
}

/// Decompress snappy data with Avro framing.
///
/// The trailing CRC32 (IEEE polynomial, not Castagnoli) of the uncompressed
/// data is validated after decompression.
#[cfg(feature = "snappy")]
fn decompress_snappy(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    if data.len() < CRC_SIZE {
        return Err(CodecError::DecompressionError(
            "Snappy data too short: missing CRC checksum".to_string(),
        ));
    }

    let (compressed_data, crc_bytes) = data.split_at(data.len() - CRC_SIZE);
    let expected_crc = u32::from_be_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);

    let decompressed = if compressed_data.is_empty() {
        Vec::new()
    } else {
        SnappyDecoder::new()
            .decompress_vec(compressed_data)
            .map_err(|e| {
                CodecError::DecompressionError(format!("Snappy decompression failed: {}", e))
            })?
    };

    let actual_crc = crc32fast::hash(&decompressed);
    if actual_crc != expected_crc {
        return Err(CodecError::DecompressionError(format!(
            "Snappy CRC32 checksum mismatch: expected 0x{:08X}, got 0x{:08X}",
            expected_crc, actual_crc
        )));
    }

    Ok(decompressed)
}

/// Compress with raw DEFLATE (no zlib or gzip wrapper).
#[cfg(feature = "deflate")]
fn compress_deflate(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let failed = |e: std::io::Error| {
        CodecError::CompressionError(format!("Deflate compression failed: {}", e))
    };

    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(failed)?;
    encoder.finish().map_err(failed)
}

/// Decompress raw DEFLATE data.
#[cfg(feature = "deflate")]
fn decompress_deflate(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let mut decompressed = Vec::new();
    DeflateDecoder::new(data)
        .read_to_end(&mut decompressed)
        .map_err(|e| {
            CodecError::DecompressionError(format!("Deflate decompression failed: {}", e))
        })?;

    Ok(decompressed)
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_name_roundtrip() {
        for codec in [Codec::Null, Codec::Deflate, Codec::Snappy] {
            assert_eq!(Codec::from_name(codec.name()).unwrap(), codec);
            assert_eq!(codec.to_string(), codec.name());
        }
    }

    #[test]
    fn test_from_name_unknown() {
        let msg = Codec::from_name("zstandard").unwrap_err().to_string();
        assert!(msg.contains("zstandard"), "Error should mention the codec name");
        assert!(msg.contains("null"), "Error should list supported codecs");
    }

    #[test]
    fn test_default_is_null() {
        assert_eq!(Codec::default(), Codec::Null);
    }

    #[test]
    fn test_null_is_passthrough() {
        let data = b"hello world";
        assert_eq!(Codec::Null.compress(data).unwrap(), data);
        assert_eq!(Codec::Null.decompress(data).unwrap(), data);
    }

    #[cfg(feature = "snappy")]
    mod snappy_tests {
        use super::*;

        #[test]
        fn test_snappy_trailer_is_crc_of_input() {
            let data = b"the quick brown fox jumps over the lazy dog".repeat(4);
            let payload = Codec::Snappy.compress(&data).unwrap();

            let (_, trailer) = payload.split_at(payload.len() - 4);
            assert_eq!(trailer, crc32fast::hash(&data).to_be_bytes());
            assert_eq!(Codec::Snappy.decompress(&payload).unwrap(), data);
        }

        #[test]
        fn test_snappy_empty_block() {
            let payload = Codec::Snappy.compress(&[]).unwrap();
            assert!(Codec::Snappy.decompress(&payload).unwrap().is_empty());
        }

        #[test]
        fn test_snappy_crc_mismatch() {
            let mut payload = Codec::Snappy.compress(b"some record bytes").unwrap();
            let last = payload.len() - 1;
            payload[last] ^= 0xFF;
            let err = Codec::Snappy.decompress(&payload).unwrap_err();
            assert!(err.to_string().contains("checksum mismatch"));
        }

        #[test]
        fn test_snappy_too_short() {
            assert!(Codec::Snappy.decompress(&[0x00, 0x01]).is_err());
        }
    }

    #[cfg(feature = "deflate")]
    mod deflate_tests {
        use super::*;

        #[test]
        fn test_deflate_roundtrip() {
            let data = vec![7u8; 4096];
            let payload = Codec::Deflate.compress(&data).unwrap();
            assert!(payload.len() < data.len());
            assert_eq!(Codec::Deflate.decompress(&payload).unwrap(), data);
        }

        #[test]
        fn test_deflate_is_raw() {
            // A zlib stream would start with 0x78.
            let payload = Codec::Deflate.compress(b"abcabcabc").unwrap();
            assert_ne!(payload[0], 0x78);
        }

        #[test]
        fn test_deflate_garbage() {
            assert!(Codec::Deflate.decompress(&[0xFF, 0xFF, 0xFF, 0xFF]).is_err());
        }
    }
}
