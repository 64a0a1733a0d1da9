use super::{DecodedStrip, DecompressionAlgorithm, StripGeometry};
use crate::{
    decoder::stream::{unsigned, ByteCursor},
    error::TiffResult,
    tags::{ByteOrder, CompressionMethod},
};

/// Samples stored as they are, rows padded to whole bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Uncompressed;

impl DecompressionAlgorithm for Uncompressed {
    const COMPRESSION_METHOD: CompressionMethod = CompressionMethod::None;

    fn decode_strip(
        &self,
        data: &[u8],
        byte_order: ByteOrder,
        geometry: &StripGeometry<'_>,
    ) -> TiffResult<DecodedStrip> {
        let cursor = ByteCursor::new(data, byte_order);
        let available_bits = data.len() as u64 * 8;
        let pixel_bits: u64 = geometry
            .samples
            .iter()
            .map(|sample| u64::from(sample.bits()))
            .sum();

        let capacity = usize::try_from(geometry.pixel_count())?
            .saturating_mul(geometry.samples.len())
            .min(data.len().saturating_mul(8));
        let mut samples = Vec::with_capacity(capacity);
        let mut row_start = 0u64;

        'rows: for _ in 0..geometry.rows {
            let (mut byte, mut bit) = (row_start, 0u32);

            for _ in 0..geometry.width {
                // A pixel cut off by the end of the strip is dropped.
                if byte * 8 + u64::from(bit) + pixel_bits > available_bits {
                    break 'rows;
                }

                for sample in geometry.samples {
                    match sample.bytes() {
                        Some(count) if bit == 0 => {
                            samples.push(cursor.read_bytes(count.into(), byte)?);
                            byte += u64::from(count);
                        }
                        whole_bytes => {
                            let read = cursor.read_bits(sample.bits().into(), byte, bit)?;
                            // Bits come most significant first, a whole-byte sample still
                            // follows the byte order.
                            let value = match whole_bytes {
                                Some(count) => {
                                    let be = read.value.to_be_bytes();
                                    unsigned(&be[4 - usize::from(count)..], byte_order)
                                }
                                None => read.value,
                            };
                            samples.push(value);
                            byte = read.next_byte_offset;
                            bit = read.next_bit_offset;
                        }
                    }
                }
            }

            // The next row starts on a byte boundary.
            row_start = if bit == 0 { byte } else { byte + 1 };
        }

        Ok(DecodedStrip::new(geometry.samples.len(), samples))
    }
}
