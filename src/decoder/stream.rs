//! All IO functionality needed for TIFF decoding

use std::borrow::Cow;

use crate::error::{TiffError, TiffFormatError, TiffResult, UsageError};
use crate::source::ByteSource;
use crate::tags::ByteOrder;

/// The result of a bit read: the value and the position right after the consumed bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitRead {
    pub value: u32,
    pub next_byte_offset: u64,
    /// Always in `0..8`.
    pub next_bit_offset: u32,
}

/// Assemble up to four bytes, given in file order, into an unsigned integer.
pub(crate) fn unsigned(bytes: &[u8], byte_order: ByteOrder) -> u32 {
    let fold = |value: u32, &byte: &u8| (value << 8) | u32::from(byte);

    match byte_order {
        ByteOrder::BigEndian => bytes.iter().fold(0, fold),
        ByteOrder::LittleEndian => bytes.iter().rev().fold(0, fold),
    }
}

/// Reader that is aware of the byte order.
///
/// Every read addresses the source directly by offset, there is no implicit position. The cursor
/// only borrows the source so any number of them may read the same file concurrently.
pub struct ByteCursor<'a, S: ?Sized> {
    source: &'a S,
    byte_order: ByteOrder,
}

impl<S: ?Sized> Clone for ByteCursor<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: ?Sized> Copy for ByteCursor<'_, S> {}

impl<S: ?Sized> std::fmt::Debug for ByteCursor<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteCursor")
            .field("byte_order", &self.byte_order)
            .finish_non_exhaustive()
    }
}

impl<'a, S: ByteSource + ?Sized> ByteCursor<'a, S> {
    /// Wraps a source
    pub fn new(source: &'a S, byte_order: ByteOrder) -> Self {
        ByteCursor { source, byte_order }
    }

    /// Byte order that should be adhered to
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Length of the underlying file.
    pub fn len(&self) -> u64 {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Fetch `len` raw bytes at `offset`, in file order.
    pub fn bytes(&self, offset: u64, len: u64) -> TiffResult<Cow<'a, [u8]>> {
        let file_len = self.source.len();
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= file_len)
            .ok_or(TiffFormatError::OffsetOutOfBounds {
                start: offset,
                end: offset.saturating_add(len),
                len: file_len,
            })?;

        self.source
            .byte_range(offset..end)
            .ok_or(TiffError::DataUnavailable { start: offset, end })
    }

    /// Read an unsigned integer of `count` bytes, `1 <= count <= 4`, at `offset`.
    pub fn read_bytes(&self, count: u32, offset: u64) -> TiffResult<u32> {
        if !(1..=4).contains(&count) {
            return Err(UsageError::InvalidByteCount(count).into());
        }

        let bytes = self.bytes(offset, count.into())?;
        Ok(unsigned(&bytes, self.byte_order))
    }

    /// Reads a TIFF byte value
    #[inline]
    pub fn read_u8(&self, offset: u64) -> TiffResult<u8> {
        Ok(self.bytes(offset, 1)?[0])
    }

    /// Reads a TIFF short value
    #[inline]
    pub fn read_u16(&self, offset: u64) -> TiffResult<u16> {
        self.read_bytes(2, offset).map(|v| v as u16)
    }

    /// Reads a TIFF long value
    #[inline]
    pub fn read_u32(&self, offset: u64) -> TiffResult<u32> {
        self.read_bytes(4, offset)
    }

    /// Read `num_bits` bits, `1 <= num_bits <= 32`, starting `bit_offset` bits into the byte at
    /// `byte_offset`.
    ///
    /// Bits are taken most significant first regardless of the byte order. A `bit_offset` of 8 or
    /// more is carried into the byte offset.
    pub fn read_bits(&self, num_bits: u32, byte_offset: u64, bit_offset: u32) -> TiffResult<BitRead> {
        if !(1..=32).contains(&num_bits) {
            return Err(UsageError::InvalidBitCount(num_bits).into());
        }

        let byte_offset = byte_offset
            .checked_add(u64::from(bit_offset / 8))
            .ok_or(TiffError::IntSizeError)?;
        let bit_offset = bit_offset % 8;

        let total_bits = bit_offset + num_bits;
        let num_bytes = total_bits.div_ceil(8);
        let bytes = self.bytes(byte_offset, num_bytes.into())?;

        // At most 5 bytes: 7 bits of offset plus 32 bits of value.
        let raw = bytes
            .iter()
            .fold(0u64, |raw, &byte| (raw << 8) | u64::from(byte));
        let shift = num_bytes * 8 - total_bits;
        let mask = (1u64 << num_bits) - 1;

        Ok(BitRead {
            value: ((raw >> shift) & mask) as u32,
            next_byte_offset: byte_offset + u64::from(total_bits / 8),
            next_bit_offset: total_bits % 8,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::source::ChunkedSource;

    #[test]
    fn read_bytes_honors_byte_order() {
        let data: &[u8] = &[0x12, 0x34, 0x56, 0x78];

        let big = ByteCursor::new(data, ByteOrder::BigEndian);
        assert_eq!(big.read_bytes(2, 0).unwrap(), 0x1234);
        assert_eq!(big.read_bytes(3, 1).unwrap(), 0x345678);
        assert_eq!(big.read_u32(0).unwrap(), 0x12345678);

        let little = ByteCursor::new(data, ByteOrder::LittleEndian);
        assert_eq!(little.read_bytes(2, 0).unwrap(), 0x3412);
        assert_eq!(little.read_bytes(3, 1).unwrap(), 0x785634);
        assert_eq!(little.read_u32(0).unwrap(), 0x78563412);
        assert_eq!(little.read_u8(3).unwrap(), 0x78);
    }

    #[test]
    fn byte_counts_are_validated_before_reading() {
        let data: &[u8] = &[];
        let cursor = ByteCursor::new(data, ByteOrder::BigEndian);

        for count in [0, 5] {
            match cursor.read_bytes(count, 0) {
                Err(TiffError::UsageError(UsageError::InvalidByteCount(n))) => assert_eq!(n, count),
                other => panic!("unexpected result {other:?}"),
            }
        }
    }

    #[test]
    fn bit_counts_are_validated_before_reading() {
        let data: &[u8] = &[0xff; 8];
        let cursor = ByteCursor::new(data, ByteOrder::BigEndian);

        assert!(matches!(
            cursor.read_bits(0, 0, 0),
            Err(TiffError::UsageError(UsageError::InvalidBitCount(0)))
        ));
        assert!(matches!(
            cursor.read_bits(33, 0, 0),
            Err(TiffError::UsageError(UsageError::InvalidBitCount(33)))
        ));
    }

    #[test]
    fn bits_span_byte_boundaries() {
        // 0b1010_1011, 0b1100_1101
        let data: &[u8] = &[0xAB, 0xCD];
        let cursor = ByteCursor::new(data, ByteOrder::LittleEndian);

        let read = cursor.read_bits(3, 0, 6).unwrap();
        assert_eq!(read.value, 0b111);
        assert_eq!(read.next_byte_offset, 1);
        assert_eq!(read.next_bit_offset, 1);

        let read = cursor.read_bits(4, read.next_byte_offset, read.next_bit_offset).unwrap();
        assert_eq!(read.value, 0b1001);
        assert_eq!(read.next_byte_offset, 1);
        assert_eq!(read.next_bit_offset, 5);
    }

    #[test]
    fn bits_carry_large_bit_offsets() {
        let data: &[u8] = &[0x00, 0xF0];
        let cursor = ByteCursor::new(data, ByteOrder::BigEndian);

        let read = cursor.read_bits(4, 0, 8).unwrap();
        assert_eq!(read.value, 0xF);
        assert_eq!((read.next_byte_offset, read.next_bit_offset), (1, 4));
    }

    #[test]
    fn full_width_bit_reads() {
        let data: &[u8] = &[0x0F, 0xFF, 0xFF, 0xFF, 0xF0];
        let cursor = ByteCursor::new(data, ByteOrder::BigEndian);

        let read = cursor.read_bits(32, 0, 4).unwrap();
        assert_eq!(read.value, u32::MAX);
        assert_eq!((read.next_byte_offset, read.next_bit_offset), (4, 4));
    }

    #[test]
    fn out_of_bounds_is_a_format_error() {
        let data: &[u8] = &[1, 2, 3];
        let cursor = ByteCursor::new(data, ByteOrder::BigEndian);

        assert!(matches!(
            cursor.read_u32(0),
            Err(TiffError::FormatError(TiffFormatError::OffsetOutOfBounds {
                start: 0,
                end: 4,
                len: 3
            }))
        ));
        assert!(cursor.bytes(u64::MAX, 2).is_err());
    }

    #[test]
    fn unloaded_bytes_are_retryable() {
        let mut source = ChunkedSource::with_chunk_size(8, 4);
        source.supply(0, &[1, 2, 3, 4]);

        let cursor = ByteCursor::new(&source, ByteOrder::BigEndian);
        assert_eq!(cursor.read_u16(0).unwrap(), 0x0102);

        let err = cursor.read_u16(3).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.missing_range(), Some(3..5));
    }
}
