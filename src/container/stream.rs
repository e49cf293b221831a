//! Byte-offset tracking over a `Read` stream.

use std::io::{self, Read};

use crate::binary::varint::read_zigzag;
use crate::error::ReaderError;

/// Wraps a reader and counts the bytes consumed, for error reporting.
#[derive(Debug)]
pub(crate) struct OffsetReader<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> OffsetReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// Bytes consumed so far.
    pub(crate) fn offset(&self) -> u64 {
        self.offset
    }

    pub(crate) fn into_inner(self) -> R {
        self.inner
    }

    /// Read a long; `Ok(None)` at a clean end of stream.
    pub(crate) fn read_long(&mut self, what: &str) -> Result<Option<i64>, ReaderError> {
        let start = self.offset;
        read_zigzag(self).map_err(|e| ReaderError::Parse {
            offset: start,
            message: format!("Failed to decode {}: {}", what, e),
        })
    }

    /// Read a long that must be present.
    pub(crate) fn require_long(&mut self, what: &str) -> Result<i64, ReaderError> {
        let start = self.offset;
        self.read_long(what)?.ok_or_else(|| ReaderError::Parse {
            offset: start,
            message: format!("Unexpected end of file reading {}", what),
        })
    }

    /// Read a non-negative length.
    pub(crate) fn require_length(&mut self, what: &str) -> Result<usize, ReaderError> {
        let start = self.offset;
        let len = self.require_long(what)?;
        usize::try_from(len).map_err(|_| ReaderError::Parse {
            offset: start,
            message: format!("Invalid negative {}: {}", what, len),
        })
    }

    /// Read exactly `len` bytes without trusting `len` for preallocation.
    pub(crate) fn read_vec(&mut self, len: usize, what: &str) -> Result<Vec<u8>, ReaderError> {
        let start = self.offset;
        let mut buf = Vec::new();
        self.by_ref().take(len as u64).read_to_end(&mut buf)?;
        if buf.len() != len {
            return Err(ReaderError::Parse {
                offset: start,
                message: format!(
                    "Unexpected end of file reading {}: need {} bytes, have {}",
                    what,
                    len,
                    buf.len()
                ),
            });
        }
        Ok(buf)
    }

    /// Read a fixed-size array.
    pub(crate) fn read_array<const N: usize>(&mut self, what: &str) -> Result<[u8; N], ReaderError> {
        let start = self.offset;
        let mut buf = [0u8; N];
        self.read_exact(&mut buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                ReaderError::Parse {
                    offset: start,
                    message: format!("Unexpected end of file reading {}", what),
                }
            } else {
                ReaderError::Io(e)
            }
        })?;
        Ok(buf)
    }
}

impl<R: Read> Read for OffsetReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.offset += n as u64;
        Ok(n)
    }
}
