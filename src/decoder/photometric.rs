//! Mapping of sample tuples to RGBA pixels.

use super::image::SampleProperty;
use crate::directory::FieldTable;
use crate::error::{TiffFormatError, TiffResult, TiffUnsupportedError, UsageError};
use crate::tags::{ExtraSamples, PhotometricInterpretation, Tag};

/// Scale `sample` from a depth of `bits` to `0..=255`, rounding to the nearest value.
///
/// Samples above the largest value of their depth saturate at 255.
pub fn scale_to_byte(sample: u32, bits: u8) -> TiffResult<u8> {
    if bits == 0 {
        return Err(UsageError::ZeroBitDepth.into());
    }

    let max = (1u64 << bits.min(32)) - 1;
    // `max` is odd, so a result is never exactly halfway between two bytes.
    let scaled = (u64::from(sample) * 255 + max / 2) / max;
    Ok(scaled.min(255) as u8)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ColorModel {
    /// Minimum is black, or white when inverted.
    Gray { invert: bool },
    Rgb,
    /// The three thirds of the color map, each `size` entries long.
    Palette { color_map: Vec<u16>, size: usize },
}

impl ColorModel {
    fn primary_samples(&self) -> usize {
        match self {
            ColorModel::Rgb => 3,
            ColorModel::Gray { .. } | ColorModel::Palette { .. } => 1,
        }
    }
}

/// Resolves the sample tuples of one image into RGBA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotometricResolver {
    model: ColorModel,
    bits: Vec<u8>,
    /// Index of the sample holding alpha, if any.
    alpha: Option<usize>,
}

impl PhotometricResolver {
    /// Build the resolver for an interpretation mode and sample layout.
    ///
    /// `extra_samples` are the `ExtraSamples` values describing the samples that follow the
    /// primary ones. `color_map` is required for palette images.
    pub fn new(
        photometric: u16,
        samples: &[SampleProperty],
        extra_samples: &[u16],
        color_map: Option<Vec<u16>>,
    ) -> TiffResult<Self> {
        let bits: Vec<u8> = samples.iter().map(SampleProperty::bits).collect();

        let model = match PhotometricInterpretation::from_u16(photometric) {
            Some(PhotometricInterpretation::WhiteIsZero) => ColorModel::Gray { invert: true },
            Some(PhotometricInterpretation::BlackIsZero) => ColorModel::Gray { invert: false },
            Some(PhotometricInterpretation::RGB) => ColorModel::Rgb,
            Some(PhotometricInterpretation::RGBPalette) => {
                let color_map =
                    color_map.ok_or(TiffFormatError::RequiredTagNotFound(Tag::ColorMap))?;
                let index_bits = bits.first().copied().unwrap_or(0);
                let size = 1u64 << index_bits;

                if color_map.len() as u64 != 3 * size {
                    return Err(TiffFormatError::ColorMapLengthMismatch {
                        expected: 3 * size,
                        actual: color_map.len(),
                    }
                    .into());
                }

                ColorModel::Palette {
                    size: color_map.len() / 3,
                    color_map,
                }
            }
            _ => return Err(TiffUnsupportedError::PhotometricInterpretation(photometric).into()),
        };

        let primary = model.primary_samples();
        if samples.len() < primary {
            return Err(TiffUnsupportedError::SampleLayout(bits).into());
        }

        let alpha = extra_samples
            .iter()
            .position(|&kind| ExtraSamples::from_u16(kind).is_some_and(|kind| kind.is_alpha()))
            .map(|k| primary + k)
            .filter(|&index| index < samples.len());

        Ok(PhotometricResolver { model, bits, alpha })
    }

    /// Build the resolver from the fields of a directory.
    pub fn from_table(table: &FieldTable, samples: &[SampleProperty]) -> TiffResult<Self> {
        let photometric = table.require_u32(Tag::PhotometricInterpretation)?;
        let photometric = u16::try_from(photometric)
            .map_err(|_| TiffFormatError::InvalidTagValueType(Tag::PhotometricInterpretation))?;
        let extra_samples = table.find_u16_vec(Tag::ExtraSamples)?.unwrap_or_default();
        let color_map = table.find_u16_vec(Tag::ColorMap)?;

        PhotometricResolver::new(photometric, samples, &extra_samples, color_map)
    }

    /// Resolve one pixel. `pixel` holds one value per sample.
    pub fn resolve(&self, pixel: &[u32]) -> TiffResult<[u8; 4]> {
        let [r, g, b] = match &self.model {
            ColorModel::Gray { invert } => {
                let bits = self.bits[0];
                let sample = if *invert {
                    max_value(bits).saturating_sub(pixel[0])
                } else {
                    pixel[0]
                };
                let gray = scale_to_byte(sample, bits)?;
                [gray, gray, gray]
            }
            ColorModel::Rgb => [
                scale_to_byte(pixel[0], self.bits[0])?,
                scale_to_byte(pixel[1], self.bits[1])?,
                scale_to_byte(pixel[2], self.bits[2])?,
            ],
            ColorModel::Palette { color_map, size } => {
                let index = pixel[0] as usize;
                if index >= *size {
                    return Err(TiffFormatError::ColorMapIndexOutOfRange(pixel[0]).into());
                }
                [
                    scale_to_byte(color_map[index].into(), 16)?,
                    scale_to_byte(color_map[size + index].into(), 16)?,
                    scale_to_byte(color_map[2 * size + index].into(), 16)?,
                ]
            }
        };

        let a = match self.alpha {
            Some(index) => scale_to_byte(pixel[index], self.bits[index])?,
            None => u8::MAX,
        };

        Ok([r, g, b, a])
    }
}

fn max_value(bits: u8) -> u32 {
    ((1u64 << bits.min(32)) - 1) as u32
}
