//! Variable-length integer encoding and decoding.
//!
//! Avro uses the same varint encoding as Protocol Buffers:
//! - Each byte has 7 bits of data and 1 continuation bit (MSB)
//! - The continuation bit indicates if more bytes follow
//! - Bytes are in little-endian order
//!
//! Signed integers are zigzag encoded first, so small magnitudes stay short:
//! - 0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, 2 -> 4, ...
//! - Encoding formula: (n << 1) ^ (n >> (width - 1))
//! - Decoding formula: (n >> 1) ^ -(n & 1)

use std::io::{self, Read};

use crate::error::DecodeError;

// ============================================================================
// Decoding Functions
// ============================================================================

/// Decode an unsigned variable-length integer.
///
/// # Arguments
/// * `data` - The input byte slice (cursor is advanced past the varint)
///
/// # Errors
/// - `DecodeError::UnexpectedEof` if the input is truncated
/// - `DecodeError::InvalidVarint` if the varint exceeds 10 bytes
#[inline]
pub fn decode_varint(data: &mut &[u8]) -> Result<u64, DecodeError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    loop {
        let (&byte, rest) = data.split_first().ok_or(DecodeError::UnexpectedEof)?;
        *data = rest;

        result |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }

        shift += 7;
        // Max 10 bytes for 64-bit varint
        if shift >= 64 {
            return Err(DecodeError::InvalidVarint);
        }
    }
}

/// Decode a zigzag-encoded signed integer.
///
/// # Errors
/// Same as [`decode_varint`].
#[inline]
pub fn decode_zigzag(data: &mut &[u8]) -> Result<i64, DecodeError> {
    let unsigned = decode_varint(data)?;
    Ok(((unsigned >> 1) as i64) ^ (-((unsigned & 1) as i64)))
}

/// Read an unsigned varint from a stream.
///
/// Returns `Ok(None)` if the stream ends before the first byte, which lets
/// callers tell a clean end of input from a truncated varint.
pub fn read_varint<R: Read + ?Sized>(reader: &mut R) -> Result<Option<u64>, DecodeError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    let mut byte = [0u8; 1];

    loop {
        match reader.read_exact(&mut byte) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return if shift == 0 {
                    Ok(None)
                } else {
                    Err(DecodeError::UnexpectedEof)
                };
            }
            Err(e) => return Err(e.into()),
        }

        result |= ((byte[0] & 0x7F) as u64) << shift;
        if byte[0] & 0x80 == 0 {
            return Ok(Some(result));
        }

        shift += 7;
        if shift >= 64 {
            return Err(DecodeError::InvalidVarint);
        }
    }
}

/// Read a zigzag-encoded signed integer from a stream.
///
/// Returns `Ok(None)` on a clean end of stream.
pub fn read_zigzag<R: Read + ?Sized>(reader: &mut R) -> Result<Option<i64>, DecodeError> {
    Ok(read_varint(reader)?.map(|u| ((u >> 1) as i64) ^ (-((u & 1) as i64))))
}

// ============================================================================
// Encoding Functions
// ============================================================================

/// Append an unsigned integer as a variable-length integer.
#[inline]
pub fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Append an Avro `long` (64-bit zigzag varint).
#[inline]
pub fn encode_long(value: i64, out: &mut Vec<u8>) {
    encode_varint(((value << 1) ^ (value >> 63)) as u64, out);
}

/// Append an Avro `int` (32-bit zigzag varint).
#[inline]
pub fn encode_int(value: i32, out: &mut Vec<u8>) {
    encode_varint(((value << 1) ^ (value >> 31)) as u32 as u64, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_bytes(value: i64) -> Vec<u8> {
        let mut out = Vec::new();
        encode_long(value, &mut out);
        out
    }

    fn int_bytes(value: i32) -> Vec<u8> {
        let mut out = Vec::new();
        encode_int(value, &mut out);
        out
    }

    // ========================================================================
    // decode_varint tests
    // ========================================================================

    #[test]
    fn test_decode_varint_single_byte() {
        let mut cursor: &[u8] = &[0x00];
        assert_eq!(decode_varint(&mut cursor).unwrap(), 0);
        assert!(cursor.is_empty());

        let mut cursor: &[u8] = &[0x7F];
        assert_eq!(decode_varint(&mut cursor).unwrap(), 127);
    }

    #[test]
    fn test_decode_varint_multi_byte() {
        let mut cursor: &[u8] = &[0x80, 0x01];
        assert_eq!(decode_varint(&mut cursor).unwrap(), 128);
        assert!(cursor.is_empty());

        let mut cursor: &[u8] = &[0xAC, 0x02];
        assert_eq!(decode_varint(&mut cursor).unwrap(), 300);

        let mut cursor: &[u8] = &[0x80, 0x80, 0x01];
        assert_eq!(decode_varint(&mut cursor).unwrap(), 16384);
    }

    #[test]
    fn test_decode_varint_eof() {
        let mut cursor: &[u8] = &[];
        assert!(matches!(
            decode_varint(&mut cursor),
            Err(DecodeError::UnexpectedEof)
        ));

        // Continuation bit set but no more bytes
        let mut cursor: &[u8] = &[0x80];
        assert!(matches!(
            decode_varint(&mut cursor),
            Err(DecodeError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_decode_varint_too_long() {
        let mut cursor: &[u8] = &[0xFF; 11];
        assert!(matches!(
            decode_varint(&mut cursor),
            Err(DecodeError::InvalidVarint)
        ));
    }

    #[test]
    fn test_decode_zigzag() {
        for (bytes, expected) in [
            (&[0x00u8][..], 0i64),
            (&[0x01][..], -1),
            (&[0x02][..], 1),
            (&[0x03][..], -2),
            (&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F][..], i32::MIN as i64),
        ] {
            let mut cursor = bytes;
            assert_eq!(decode_zigzag(&mut cursor).unwrap(), expected);
            assert!(cursor.is_empty());
        }
    }

    // ========================================================================
    // Stream reading tests
    // ========================================================================

    #[test]
    fn test_read_varint_clean_eof() {
        let mut stream: &[u8] = &[];
        assert_eq!(read_varint(&mut stream).unwrap(), None);
    }

    #[test]
    fn test_read_varint_truncated() {
        let mut stream: &[u8] = &[0x80];
        assert!(matches!(
            read_varint(&mut stream),
            Err(DecodeError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_read_zigzag() {
        let mut stream: &[u8] = &[0x03, 0xAC, 0x02];
        assert_eq!(read_zigzag(&mut stream).unwrap(), Some(-2));
        assert_eq!(read_zigzag(&mut stream).unwrap(), Some(150));
        assert_eq!(read_zigzag(&mut stream).unwrap(), None);
    }

    // ========================================================================
    // Encoding tests
    // ========================================================================

    #[test]
    fn test_encode_varint() {
        for (value, expected) in [
            (0u64, vec![0x00]),
            (1, vec![0x01]),
            (127, vec![0x7F]),
            (128, vec![0x80, 0x01]),
            (300, vec![0xAC, 0x02]),
        ] {
            let mut out = Vec::new();
            encode_varint(value, &mut out);
            assert_eq!(out, expected);
        }
    }

    #[test]
    fn test_encode_long() {
        assert_eq!(long_bytes(0), vec![0x00]);
        assert_eq!(long_bytes(-1), vec![0x01]);
        assert_eq!(long_bytes(1), vec![0x02]);
        assert_eq!(long_bytes(-2), vec![0x03]);
        assert_eq!(long_bytes(2), vec![0x04]);
    }

    #[test]
    fn test_encode_int_min() {
        assert_eq!(int_bytes(i32::MIN), vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
        assert_eq!(int_bytes(i32::MAX), vec![0xFE, 0xFF, 0xFF, 0xFF, 0x0F]);
        assert_eq!(int_bytes(i32::MIN), long_bytes(i32::MIN as i64));
    }

    // ========================================================================
    // Round-trip tests
    // ========================================================================

    #[test]
    fn test_zigzag_roundtrip() {
        for value in [0i64, 1, -1, 2, -2, 127, -128, i64::MAX, i64::MIN] {
            let encoded = long_bytes(value);
            let mut cursor = &encoded[..];
            assert_eq!(decode_zigzag(&mut cursor).unwrap(), value);
            assert!(cursor.is_empty());
        }
    }
}
