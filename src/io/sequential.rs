//! Forward-only reads with an internal cursor.

use std::io::{self, Read};

use bytes::Bytes;

use super::ByteOrder;
use crate::charset::Charset;
use crate::error::ReaderError;
use crate::metadata::StringValue;

/// Cursor-based reads over a byte source.
///
/// Reads that run out of data fail with [`ReaderError::EndOfData`], which
/// is distinct from the random-access bounds error.
pub trait SequentialReader {
    fn byte_order(&self) -> ByteOrder;

    fn set_byte_order(&mut self, order: ByteOrder);

    /// Bytes consumed so far.
    fn position(&self) -> u64;

    /// Remaining bytes, when the source knows its length.
    fn available(&self) -> Option<u64>;

    /// Fill `buf` completely or fail.
    fn read_exact_into(&mut self, buf: &mut [u8]) -> Result<(), ReaderError>;

    /// Advance by `n` bytes, failing when fewer remain.
    fn skip(&mut self, n: u64) -> Result<(), ReaderError>;

    /// Advance by `n` bytes if possible. Never fails; returns whether the
    /// full distance was skipped.
    fn try_skip(&mut self, n: u64) -> bool;

    fn get_bytes(&mut self, count: usize) -> Result<Bytes, ReaderError> {
        let mut buf = vec![0u8; count];
        self.read_exact_into(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    fn get_u8(&mut self) -> Result<u8, ReaderError> {
        let mut buf = [0u8; 1];
        self.read_exact_into(&mut buf)?;
        Ok(buf[0])
    }

    fn get_i8(&mut self) -> Result<i8, ReaderError> {
        Ok(self.get_u8()? as i8)
    }

    fn get_u16(&mut self) -> Result<u16, ReaderError> {
        let mut buf = [0u8; 2];
        self.read_exact_into(&mut buf)?;
        Ok(self.byte_order().read_u16(&buf))
    }

    fn get_i16(&mut self) -> Result<i16, ReaderError> {
        Ok(self.get_u16()? as i16)
    }

    fn get_u32(&mut self) -> Result<u32, ReaderError> {
        let mut buf = [0u8; 4];
        self.read_exact_into(&mut buf)?;
        Ok(self.byte_order().read_u32(&buf))
    }

    fn get_i32(&mut self) -> Result<i32, ReaderError> {
        Ok(self.get_u32()? as i32)
    }

    fn get_u64(&mut self) -> Result<u64, ReaderError> {
        let mut buf = [0u8; 8];
        self.read_exact_into(&mut buf)?;
        Ok(self.byte_order().read_u64(&buf))
    }

    fn get_i64(&mut self) -> Result<i64, ReaderError> {
        Ok(self.get_u64()? as i64)
    }

    fn get_f32(&mut self) -> Result<f32, ReaderError> {
        Ok(f32::from_bits(self.get_u32()?))
    }

    fn get_f64(&mut self) -> Result<f64, ReaderError> {
        Ok(f64::from_bits(self.get_u64()?))
    }

    fn get_string(&mut self, count: usize, charset: Charset) -> Result<String, ReaderError> {
        Ok(charset.decode(&self.get_bytes(count)?))
    }

    fn get_string_value(
        &mut self,
        count: usize,
        charset: Option<Charset>,
    ) -> Result<StringValue, ReaderError> {
        Ok(StringValue::new(self.get_bytes(count)?.to_vec(), charset))
    }

    /// Bytes up to a zero byte or `max_len`, whichever comes first. A zero
    /// terminator, when found, is consumed but not returned.
    fn get_null_terminated_bytes(&mut self, max_len: usize) -> Result<Vec<u8>, ReaderError> {
        let mut out = Vec::new();
        while out.len() < max_len {
            match self.get_u8()? {
                0 => break,
                b => out.push(b),
            }
        }
        Ok(out)
    }

    fn get_null_terminated_string(
        &mut self,
        max_len: usize,
        charset: Charset,
    ) -> Result<String, ReaderError> {
        Ok(charset.decode(&self.get_null_terminated_bytes(max_len)?))
    }

    fn get_null_terminated_string_value(
        &mut self,
        max_len: usize,
        charset: Option<Charset>,
    ) -> Result<StringValue, ReaderError> {
        Ok(StringValue::new(
            self.get_null_terminated_bytes(max_len)?,
            charset,
        ))
    }
}

// =============================================================================
// SequentialByteArrayReader
// =============================================================================

/// Sequential reader over an in-memory buffer.
#[derive(Debug, Clone)]
pub struct SequentialByteArrayReader {
    data: Bytes,
    index: usize,
    byte_order: ByteOrder,
}

impl SequentialByteArrayReader {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            index: 0,
            byte_order: ByteOrder::BigEndian,
        }
    }

    pub fn with_byte_order(data: impl Into<Bytes>, byte_order: ByteOrder) -> Self {
        Self {
            byte_order,
            ..Self::new(data)
        }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.index
    }

    fn end_of_data(&self, requested: u64) -> ReaderError {
        ReaderError::EndOfData {
            requested,
            available: self.remaining() as u64,
        }
    }
}

impl SequentialReader for SequentialByteArrayReader {
    fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    fn set_byte_order(&mut self, order: ByteOrder) {
        self.byte_order = order;
    }

    fn position(&self) -> u64 {
        self.index as u64
    }

    fn available(&self) -> Option<u64> {
        Some(self.remaining() as u64)
    }

    fn read_exact_into(&mut self, buf: &mut [u8]) -> Result<(), ReaderError> {
        if buf.len() > self.remaining() {
            return Err(self.end_of_data(buf.len() as u64));
        }
        buf.copy_from_slice(&self.data[self.index..self.index + buf.len()]);
        self.index += buf.len();
        Ok(())
    }

    fn skip(&mut self, n: u64) -> Result<(), ReaderError> {
        if n > self.remaining() as u64 {
            return Err(self.end_of_data(n));
        }
        self.index += n as usize;
        Ok(())
    }

    fn try_skip(&mut self, n: u64) -> bool {
        self.skip(n).is_ok()
    }

    /// Zero-copy: the returned bytes share the reader's buffer.
    fn get_bytes(&mut self, count: usize) -> Result<Bytes, ReaderError> {
        if count > self.remaining() {
            return Err(self.end_of_data(count as u64));
        }
        let out = self.data.slice(self.index..self.index + count);
        self.index += count;
        Ok(out)
    }
}

// =============================================================================
// StreamReader
// =============================================================================

/// Sequential reader over any [`Read`] implementation.
///
/// Streams cannot rewind, so a failed `try_skip` leaves the cursor at the
/// end of whatever data was available.
pub struct StreamReader<R> {
    inner: R,
    position: u64,
    byte_order: ByteOrder,
}

impl<R: Read> StreamReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            position: 0,
            byte_order: ByteOrder::BigEndian,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Read up to `n` bytes into `sink`, returning how many were read.
    fn pump(&mut self, n: u64, sink: &mut impl io::Write) -> Result<u64, ReaderError> {
        let copied = io::copy(&mut (&mut self.inner).take(n), sink)
            .map_err(|e| ReaderError::Io(e.to_string()))?;
        self.position += copied;
        Ok(copied)
    }
}

impl<R: Read> SequentialReader for StreamReader<R> {
    fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    fn set_byte_order(&mut self, order: ByteOrder) {
        self.byte_order = order;
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn available(&self) -> Option<u64> {
        None
    }

    fn read_exact_into(&mut self, buf: &mut [u8]) -> Result<(), ReaderError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => {
                    self.position += filled as u64;
                    return Err(ReaderError::EndOfData {
                        requested: buf.len() as u64,
                        available: filled as u64,
                    });
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(ReaderError::Io(e.to_string())),
            }
        }
        self.position += filled as u64;
        Ok(())
    }

    fn skip(&mut self, n: u64) -> Result<(), ReaderError> {
        let skipped = self.pump(n, &mut io::sink())?;
        if skipped < n {
            return Err(ReaderError::EndOfData {
                requested: n,
                available: skipped,
            });
        }
        Ok(())
    }

    fn try_skip(&mut self, n: u64) -> bool {
        matches!(self.pump(n, &mut io::sink()), Ok(skipped) if skipped == n)
    }
}
