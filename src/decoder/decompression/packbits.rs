use super::{DecodedStrip, DecompressionAlgorithm, StripGeometry};
use crate::{
    decoder::stream::unsigned,
    error::{TiffResult, TiffUnsupportedError},
    tags::{ByteOrder, CompressionMethod},
};

/// Decompressor for the PackBits run-length scheme.
///
/// Only byte-aligned samples can be stored this way, runs are counted in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackBits;

impl DecompressionAlgorithm for PackBits {
    const COMPRESSION_METHOD: CompressionMethod = CompressionMethod::PackBits;

    fn decode_strip(
        &self,
        data: &[u8],
        byte_order: ByteOrder,
        geometry: &StripGeometry<'_>,
    ) -> TiffResult<DecodedStrip> {
        let widths = geometry
            .samples
            .iter()
            .map(|sample| sample.bytes().map(usize::from))
            .collect::<Option<Vec<usize>>>()
            .ok_or_else(|| {
                TiffUnsupportedError::SampleLayout(
                    geometry.samples.iter().map(|sample| sample.bits()).collect(),
                )
            })?;

        let pixel_len: usize = widths.iter().sum();
        let wanted = usize::try_from(geometry.pixel_count())?.saturating_mul(pixel_len);

        let bytes: Vec<u8> = PackBitsReader::new(data).take(wanted).collect();

        let mut samples = Vec::with_capacity(bytes.len() / pixel_len.max(1) * widths.len());
        for pixel in bytes.chunks_exact(pixel_len) {
            let mut rest = pixel;
            for &width in &widths {
                let (sample, tail) = rest.split_at(width);
                samples.push(unsigned(sample, byte_order));
                rest = tail;
            }
        }

        Ok(DecodedStrip::new(widths.len(), samples))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    /// Expecting a control byte.
    Header,
    /// Copying this many more bytes verbatim.
    Literal(usize),
    /// Emitting `byte` this many more times.
    Repeat { byte: u8, remaining: usize },
}

/// Expands PackBits runs into the bytes they encode.
///
/// A control byte `n` in `0..=127` is followed by `n + 1` literal bytes, a control byte in
/// `-127..=-1` by a single byte repeated `-n + 1` times. The control byte `-128` is skipped.
/// Iteration ends with the input, a run cut short by the end of the input is truncated.
#[derive(Debug, Clone)]
pub struct PackBitsReader<'a> {
    input: &'a [u8],
    position: usize,
    state: RunState,
}

impl<'a> PackBitsReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        PackBitsReader {
            input,
            position: 0,
            state: RunState::Header,
        }
    }

    fn next_input(&mut self) -> Option<u8> {
        let byte = *self.input.get(self.position)?;
        self.position += 1;
        Some(byte)
    }
}

impl Iterator for PackBitsReader<'_> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        loop {
            match self.state {
                RunState::Header => {
                    let control = self.next_input()? as i8;
                    self.state = match control {
                        0..=127 => RunState::Literal(control as usize + 1),
                        -128 => RunState::Header,
                        _ => RunState::Repeat {
                            byte: self.next_input()?,
                            remaining: usize::from(control.unsigned_abs()) + 1,
                        },
                    };
                }
                RunState::Literal(0) | RunState::Repeat { remaining: 0, .. } => {
                    self.state = RunState::Header;
                }
                RunState::Literal(remaining) => {
                    let byte = self.next_input()?;
                    self.state = RunState::Literal(remaining - 1);
                    return Some(byte);
                }
                RunState::Repeat { byte, remaining } => {
                    self.state = RunState::Repeat {
                        byte,
                        remaining: remaining - 1,
                    };
                    return Some(byte);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::image::SampleProperty;
    use crate::TiffError;

    fn expand(input: &[u8]) -> Vec<u8> {
        PackBitsReader::new(input).collect()
    }

    #[test]
    fn literal_then_repeat() {
        assert_eq!(expand(&[2, b'A', b'B', b'C', 0xFF, b'X']), b"ABCXX");
        assert_eq!(expand(&[2, b'A', b'B', b'C', 0xFE, b'X']), b"ABCXXX");
    }

    #[test]
    fn no_op_header_consumes_one_byte() {
        assert_eq!(expand(&[0x80, 0, b'Z']), b"Z");
        assert_eq!(expand(&[0x80, 0x80, 0x81, 7]), [7; 128]);
    }

    #[test]
    fn truncated_runs_end_early() {
        assert_eq!(expand(&[4, 1, 2]), [1, 2]);
        assert_eq!(expand(&[0xFD]), Vec::<u8>::new());
    }

    #[test]
    fn tiff_spec_sample() {
        let input = [
            0xFE, 0xAA, 0x02, 0x80, 0x00, 0x2A, 0xFD, 0xAA, 0x03, 0x80, 0x00, 0x2A, 0x22, 0xF7,
            0xAA,
        ];
        let expected = [
            0xAA, 0xAA, 0xAA, 0x80, 0x00, 0x2A, 0xAA, 0xAA, 0xAA, 0xAA, 0x80, 0x00, 0x2A, 0x22,
            0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
        ];
        assert_eq!(expand(&input), expected);
    }

    #[test]
    fn samples_are_assembled_in_byte_order() {
        let layout = [SampleProperty::new(16)];
        let geometry = StripGeometry {
            samples: &layout,
            width: 2,
            rows: 1,
        };
        // Literal 0x0102 followed by a repeat of 0x07.
        let data = [1, 0x01, 0x02, 0xFF, 0x07];

        let strip = PackBits
            .decode_strip(&data, ByteOrder::BigEndian, &geometry)
            .unwrap();
        let values: Vec<u32> = strip.pixels().map(|p| p[0]).collect();
        assert_eq!(values, [0x0102, 0x0707]);

        let strip = PackBits
            .decode_strip(&data, ByteOrder::LittleEndian, &geometry)
            .unwrap();
        let values: Vec<u32> = strip.pixels().map(|p| p[0]).collect();
        assert_eq!(values, [0x0201, 0x0707]);
    }

    #[test]
    fn surplus_bytes_are_ignored() {
        let layout = [SampleProperty::new(8)];
        let geometry = StripGeometry {
            samples: &layout,
            width: 2,
            rows: 1,
        };

        let strip = PackBits
            .decode_strip(&[0xF9, 0x11], ByteOrder::BigEndian, &geometry)
            .unwrap();
        assert_eq!(strip.pixel_count(), 2);
    }

    #[test]
    fn sub_byte_samples_are_unsupported() {
        let layout = [SampleProperty::new(4)];
        let geometry = StripGeometry {
            samples: &layout,
            width: 2,
            rows: 1,
        };

        match PackBits.decode_strip(&[0, 0xAB], ByteOrder::BigEndian, &geometry) {
            Err(TiffError::UnsupportedError(TiffUnsupportedError::SampleLayout(bits))) => {
                assert_eq!(bits, [4])
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
