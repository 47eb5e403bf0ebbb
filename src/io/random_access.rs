//! Random-access reads by absolute index.

use bytes::Bytes;

use super::ByteOrder;
use crate::charset::Charset;
use crate::error::ReaderError;
use crate::metadata::StringValue;

/// Bounds-checked reads at arbitrary indexes of a byte source.
///
/// Implementors only provide byte-order state, the source length, and
/// [`RandomAccessReader::bytes_at`]; every typed getter is built on those.
/// Indexes are signed so that a negative offset computed from corrupt data
/// is reported as such rather than wrapping.
pub trait RandomAccessReader {
    fn byte_order(&self) -> ByteOrder;

    fn set_byte_order(&mut self, order: ByteOrder);

    /// Number of readable bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow `count` bytes starting at `index`, after validation.
    fn bytes_at(&self, index: i64, count: u64) -> Result<&[u8], ReaderError>;

    /// Whether `count` bytes starting at `index` are all readable.
    fn is_valid_index(&self, index: i64, count: u64) -> bool {
        validate_index(index, count, self.len()).is_ok()
    }

    fn get_u8(&self, index: i64) -> Result<u8, ReaderError> {
        Ok(self.bytes_at(index, 1)?[0])
    }

    fn get_i8(&self, index: i64) -> Result<i8, ReaderError> {
        Ok(self.get_u8(index)? as i8)
    }

    fn get_u16(&self, index: i64) -> Result<u16, ReaderError> {
        let order = self.byte_order();
        Ok(order.read_u16(self.bytes_at(index, 2)?))
    }

    fn get_i16(&self, index: i64) -> Result<i16, ReaderError> {
        Ok(self.get_u16(index)? as i16)
    }

    fn get_u32(&self, index: i64) -> Result<u32, ReaderError> {
        let order = self.byte_order();
        Ok(order.read_u32(self.bytes_at(index, 4)?))
    }

    fn get_i32(&self, index: i64) -> Result<i32, ReaderError> {
        Ok(self.get_u32(index)? as i32)
    }

    fn get_u64(&self, index: i64) -> Result<u64, ReaderError> {
        let order = self.byte_order();
        Ok(order.read_u64(self.bytes_at(index, 8)?))
    }

    fn get_i64(&self, index: i64) -> Result<i64, ReaderError> {
        Ok(self.get_u64(index)? as i64)
    }

    fn get_f32(&self, index: i64) -> Result<f32, ReaderError> {
        Ok(f32::from_bits(self.get_u32(index)?))
    }

    fn get_f64(&self, index: i64) -> Result<f64, ReaderError> {
        Ok(f64::from_bits(self.get_u64(index)?))
    }

    /// Signed 15.16 fixed-point number, as used by ICC XYZ values.
    fn get_s15_fixed16(&self, index: i64) -> Result<f32, ReaderError> {
        Ok(self.get_i32(index)? as f32 / 65536.0)
    }

    fn get_bytes(&self, index: i64, count: u64) -> Result<Vec<u8>, ReaderError> {
        Ok(self.bytes_at(index, count)?.to_vec())
    }

    /// Exactly `count` bytes decoded as text, embedded zeros included.
    fn get_string(&self, index: i64, count: u64, charset: Charset) -> Result<String, ReaderError> {
        Ok(charset.decode(self.bytes_at(index, count)?))
    }

    /// Bytes up to the first zero or `max_len`, whichever comes first.
    ///
    /// A `max_len` reaching past the end of the data is clamped to the
    /// available bytes; the start index itself must still be valid.
    fn get_null_terminated_bytes(&self, index: i64, max_len: u64) -> Result<Vec<u8>, ReaderError> {
        let available = if index >= 0 {
            self.len().saturating_sub(index as u64)
        } else {
            0
        };
        let count = max_len.min(available);
        validate_index(index, count.max(1).min(max_len), self.len())?;

        let bytes = self.bytes_at(index, count)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(bytes[..end].to_vec())
    }

    fn get_null_terminated_string(
        &self,
        index: i64,
        max_len: u64,
        charset: Charset,
    ) -> Result<String, ReaderError> {
        Ok(charset.decode(&self.get_null_terminated_bytes(index, max_len)?))
    }

    fn get_null_terminated_string_value(
        &self,
        index: i64,
        max_len: u64,
        charset: Option<Charset>,
    ) -> Result<StringValue, ReaderError> {
        Ok(StringValue::new(
            self.get_null_terminated_bytes(index, max_len)?,
            charset,
        ))
    }
}

/// Check that `count` bytes starting at `index` fit within `len` bytes.
fn validate_index(index: i64, count: u64, len: u64) -> Result<(), ReaderError> {
    if index < 0 {
        return Err(ReaderError::NegativeIndex(index));
    }
    let end = (index as u64)
        .checked_add(count)
        .filter(|end| *end <= i64::MAX as u64)
        .ok_or(ReaderError::Overflow { index, count })?;
    if end > len {
        return Err(ReaderError::BufferBounds {
            index,
            count: count as i64,
            max_index: len as i64 - 1,
        });
    }
    Ok(())
}

// =============================================================================
// ByteArrayReader
// =============================================================================

/// Random-access reader over an in-memory buffer.
///
/// Cloning is cheap; the underlying [`Bytes`] is reference counted. A base
/// offset shifts index zero forward, which is how makernotes whose offsets
/// are relative to their own start are read.
#[derive(Debug, Clone)]
pub struct ByteArrayReader {
    data: Bytes,
    base_offset: usize,
    byte_order: ByteOrder,
}

impl ByteArrayReader {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            base_offset: 0,
            byte_order: ByteOrder::BigEndian,
        }
    }

    pub fn with_byte_order(data: impl Into<Bytes>, byte_order: ByteOrder) -> Self {
        Self {
            byte_order,
            ..Self::new(data)
        }
    }

    /// A reader whose index zero sits `shift` bytes further into the same
    /// buffer. Byte order is carried over.
    pub fn shifted(&self, shift: usize) -> Self {
        Self {
            data: self.data.clone(),
            base_offset: self.base_offset.saturating_add(shift).min(self.data.len()),
            byte_order: self.byte_order,
        }
    }

    /// Absolute position in the underlying buffer of a relative index.
    #[inline]
    pub fn to_unshifted_offset(&self, index: i64) -> i64 {
        index + self.base_offset as i64
    }

    /// Cheap handle on a validated range of the buffer.
    pub fn slice(&self, index: i64, count: u64) -> Result<Bytes, ReaderError> {
        validate_index(index, count, self.len())?;
        let start = self.base_offset + index as usize;
        Ok(self.data.slice(start..start + count as usize))
    }
}

impl RandomAccessReader for ByteArrayReader {
    fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    fn set_byte_order(&mut self, order: ByteOrder) {
        self.byte_order = order;
    }

    fn len(&self) -> u64 {
        (self.data.len() - self.base_offset) as u64
    }

    fn bytes_at(&self, index: i64, count: u64) -> Result<&[u8], ReaderError> {
        validate_index(index, count, self.len())?;
        let start = self.base_offset + index as usize;
        Ok(&self.data[start..start + count as usize])
    }
}
