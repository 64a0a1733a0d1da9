use super::decompression::{Decompressor, StripGeometry};
use super::Limits;
use crate::directory::FieldTable;
use crate::tags::{CompressionMethod, Tag};
use crate::{TiffError, TiffFormatError, TiffResult, TiffUnsupportedError};

/// The storage width of one sample of a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleProperty {
    bits: u8,
}

impl SampleProperty {
    pub fn new(bits: u8) -> Self {
        SampleProperty { bits }
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn is_byte_aligned(&self) -> bool {
        self.bits % 8 == 0
    }

    /// Width in bytes, for byte-aligned samples only.
    pub fn bytes(&self) -> Option<u8> {
        self.is_byte_aligned().then_some(self.bits / 8)
    }
}

/// Computed values of a stripped image, validated before any pixel is read.
#[derive(Debug)]
pub(crate) struct ImageLayout {
    pub width: u32,
    pub height: u32,
    pub samples: Vec<SampleProperty>,
    pub decompressor: Decompressor,
    pub rows_per_strip: u32,
    pub strip_offsets: Vec<u64>,
    pub strip_byte_counts: Vec<u64>,
}

impl ImageLayout {
    pub fn from_table(table: &FieldTable, file_len: u64, limits: &Limits) -> TiffResult<Self> {
        let width = table.require_u32(Tag::ImageWidth)?;
        let height = table.require_u32(Tag::ImageLength)?;
        if width == 0 || height == 0 {
            return Err(TiffFormatError::InvalidDimensions(width, height).into());
        }

        let buffer_len = u64::from(width) * u64::from(height) * 4;
        if buffer_len > limits.decoding_buffer_size as u64 {
            return Err(TiffError::LimitsExceeded);
        }

        match table.find_u32(Tag::PlanarConfiguration)? {
            None | Some(1) => {}
            Some(other) => {
                let id = u16::try_from(other).unwrap_or(u16::MAX);
                return Err(TiffUnsupportedError::PlanarConfiguration(id).into());
            }
        }

        let samples = sample_properties(table)?;

        let method = match table.find_u32(Tag::Compression)? {
            None => CompressionMethod::None,
            Some(id) => u16::try_from(id)
                .map(CompressionMethod::from_u16_exhaustive)
                .map_err(|_| TiffFormatError::InvalidTagValueType(Tag::Compression))?,
        };
        let decompressor = Decompressor::for_method(method)?;

        let rows_per_strip = match table.find_u32(Tag::RowsPerStrip)? {
            None => height,
            Some(0) => return Err(TiffFormatError::InvalidTagValueType(Tag::RowsPerStrip).into()),
            Some(rows) => rows.min(height),
        };

        let strip_offsets: Vec<u64> = table
            .require_u32_vec(Tag::StripOffsets)?
            .into_iter()
            .map(u64::from)
            .collect();
        if strip_offsets.is_empty() {
            return Err(TiffFormatError::RequiredTagEmpty(Tag::StripOffsets).into());
        }

        let strip_byte_counts = match table.find_u32_vec(Tag::StripByteCounts)? {
            Some(counts) => counts.into_iter().map(u64::from).collect(),
            None if strip_offsets.len() == 1 => {
                let bits_per_pixel: u64 = samples.iter().map(|s| u64::from(s.bits())).sum();
                let row_len = (u64::from(width) * bits_per_pixel).div_ceil(8);
                let inferred = (row_len * u64::from(height))
                    .min(file_len.saturating_sub(strip_offsets[0]));
                tracing::warn!(inferred, "StripByteCounts missing, inferred from image size");
                vec![inferred]
            }
            None => {
                return Err(TiffFormatError::RequiredTagNotFound(Tag::StripByteCounts).into())
            }
        };

        let layout = ImageLayout {
            width,
            height,
            samples,
            decompressor,
            rows_per_strip,
            strip_offsets,
            strip_byte_counts,
        };

        if layout.strip_offsets.len() > layout.strip_count() {
            tracing::warn!(
                offsets = layout.strip_offsets.len(),
                strips = layout.strip_count(),
                "ignoring surplus strip offsets"
            );
        }

        Ok(layout)
    }

    /// Number of strips needed to cover the image height.
    pub fn strip_count(&self) -> usize {
        self.height.div_ceil(self.rows_per_strip) as usize
    }

    /// Rows held by strip `strip`. Only the last strip may be shorter than `rows_per_strip`.
    pub fn rows_in_strip(&self, strip: usize) -> u32 {
        let first_row = strip as u64 * u64::from(self.rows_per_strip);
        let remaining = u64::from(self.height).saturating_sub(first_row);
        remaining.min(u64::from(self.rows_per_strip)) as u32
    }

    /// The image row at which strip `strip` begins.
    pub fn first_row(&self, strip: usize) -> u64 {
        strip as u64 * u64::from(self.rows_per_strip)
    }

    pub fn geometry(&self, strip: usize) -> StripGeometry<'_> {
        StripGeometry {
            samples: &self.samples,
            width: self.width,
            rows: self.rows_in_strip(strip),
        }
    }

    /// Byte range of strip `strip`, if both its offset and byte count are present.
    pub fn strip_range(&self, strip: usize) -> Option<(u64, u64)> {
        let offset = *self.strip_offsets.get(strip)?;
        let count = *self.strip_byte_counts.get(strip)?;
        Some((offset, count))
    }
}

fn sample_properties(table: &FieldTable) -> TiffResult<Vec<SampleProperty>> {
    let samples_per_pixel = match table.find_u32(Tag::SamplesPerPixel)? {
        None => 1,
        Some(0) => {
            return Err(TiffFormatError::InvalidTagValueType(Tag::SamplesPerPixel).into());
        }
        Some(n) => usize::try_from(n)?,
    };

    let bits = match table.find_u32_vec(Tag::BitsPerSample)? {
        None => vec![1; samples_per_pixel],
        Some(bits) if bits.len() == samples_per_pixel => bits,
        Some(bits) if bits.len() == 1 => vec![bits[0]; samples_per_pixel],
        Some(_) => return Err(TiffFormatError::InvalidTagValueType(Tag::BitsPerSample).into()),
    };

    if bits.iter().any(|&b| b == 0 || b > 32) {
        let layout = bits.iter().map(|&b| b.min(u32::from(u8::MAX)) as u8).collect();
        return Err(TiffUnsupportedError::SampleLayout(layout).into());
    }

    Ok(bits.into_iter().map(|b| SampleProperty::new(b as u8)).collect())
}

/// A decoded image: its dimensions, RGBA pixels and the fields of its directory.
#[derive(Debug, Clone, PartialEq)]
pub struct TiffImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
    fields: FieldTable,
}

impl TiffImage {
    pub(crate) fn new(width: u32, height: u32, data: Vec<u8>, fields: FieldTable) -> Self {
        debug_assert_eq!(data.len() as u64, u64::from(width) * u64::from(height) * 4);
        TiffImage {
            width,
            height,
            data,
            fields,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the `(width, height)` of the image.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Interleaved RGBA bytes, row by row, four bytes per pixel.
    pub fn rgba(&self) -> &[u8] {
        &self.data
    }

    pub fn into_rgba(self) -> Vec<u8> {
        self.data
    }

    /// The fields of the directory this image was decoded from.
    pub fn fields(&self) -> &FieldTable {
        &self.fields
    }

    /// The RGBA value at column `x` of row `y`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let index = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.data.get(index..index + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::ifd::{FieldEntry, Value};
    use crate::tags::{IfdPointer, Type};

    fn table(fields: &[(Tag, u32)]) -> FieldTable {
        let mut table = FieldTable::new(IfdPointer(8));
        for &(tag, value) in fields {
            table.insert(tag, FieldEntry::new(Type::LONG, vec![Value::Unsigned(value)]));
        }
        table
    }

    #[test]
    fn strips_cover_the_image_height() {
        let table = table(&[
            (Tag::ImageWidth, 4),
            (Tag::ImageLength, 10),
            (Tag::RowsPerStrip, 4),
            (Tag::StripOffsets, 100),
            (Tag::StripByteCounts, 16),
        ]);
        let layout = ImageLayout::from_table(&table, 1000, &Limits::default()).unwrap();

        assert_eq!(layout.strip_count(), 3);
        assert_eq!(
            (0..3).map(|s| layout.rows_in_strip(s)).collect::<Vec<_>>(),
            [4, 4, 2]
        );
        assert_eq!(layout.first_row(2), 8);
        assert_eq!(layout.strip_range(0), Some((100, 16)));
        assert_eq!(layout.strip_range(1), None);
    }

    #[test]
    fn defaults_and_clamping() {
        let table = table(&[
            (Tag::ImageWidth, 9),
            (Tag::ImageLength, 3),
            (Tag::RowsPerStrip, u32::MAX),
            (Tag::StripOffsets, 8),
        ]);
        let layout = ImageLayout::from_table(&table, 1000, &Limits::default()).unwrap();

        assert_eq!(layout.samples, [SampleProperty::new(1)]);
        assert_eq!(layout.rows_per_strip, 3);
        assert_eq!(layout.strip_count(), 1);
        // Two bytes per padded row of nine bits.
        assert_eq!(layout.strip_byte_counts, [6]);
        assert_eq!(layout.decompressor.method(), CompressionMethod::None);
    }

    #[test]
    fn inferred_byte_count_stops_at_the_end_of_the_file() {
        let table = table(&[
            (Tag::ImageWidth, 100),
            (Tag::ImageLength, 100),
            (Tag::BitsPerSample, 8),
            (Tag::StripOffsets, 8),
        ]);
        let layout = ImageLayout::from_table(&table, 108, &Limits::default()).unwrap();
        assert_eq!(layout.strip_byte_counts, [100]);
    }

    #[test]
    fn byte_counts_are_required_for_several_strips() {
        let mut table = table(&[(Tag::ImageWidth, 1), (Tag::ImageLength, 2), (Tag::RowsPerStrip, 1)]);
        table.insert(
            Tag::StripOffsets,
            FieldEntry::new(Type::LONG, vec![Value::Unsigned(8), Value::Unsigned(9)]),
        );

        assert!(matches!(
            ImageLayout::from_table(&table, 100, &Limits::default()),
            Err(TiffError::FormatError(TiffFormatError::RequiredTagNotFound(
                Tag::StripByteCounts
            )))
        ));
    }

    #[test]
    fn unsupported_layouts() {
        let planar = table(&[
            (Tag::ImageWidth, 1),
            (Tag::ImageLength, 1),
            (Tag::PlanarConfiguration, 2),
            (Tag::StripOffsets, 8),
        ]);
        assert!(matches!(
            ImageLayout::from_table(&planar, 100, &Limits::default()),
            Err(TiffError::UnsupportedError(TiffUnsupportedError::PlanarConfiguration(2)))
        ));

        let wide = table(&[
            (Tag::ImageWidth, 1),
            (Tag::ImageLength, 1),
            (Tag::BitsPerSample, 64),
            (Tag::StripOffsets, 8),
        ]);
        assert!(matches!(
            ImageLayout::from_table(&wide, 100, &Limits::default()),
            Err(TiffError::UnsupportedError(TiffUnsupportedError::SampleLayout(_)))
        ));

        let lzw = table(&[
            (Tag::ImageWidth, 1),
            (Tag::ImageLength, 1),
            (Tag::Compression, 5),
            (Tag::StripOffsets, 8),
        ]);
        assert!(matches!(
            ImageLayout::from_table(&lzw, 100, &Limits::default()),
            Err(TiffError::UnsupportedError(TiffUnsupportedError::Compression(
                CompressionMethod::LZW
            )))
        ));
    }

    #[test]
    fn output_buffer_is_limited() {
        let table = table(&[
            (Tag::ImageWidth, 1024),
            (Tag::ImageLength, 1024),
            (Tag::StripOffsets, 8),
        ]);
        let limits = Limits {
            decoding_buffer_size: 1024 * 1024,
            ..Limits::default()
        };

        assert!(matches!(
            ImageLayout::from_table(&table, 100, &limits),
            Err(TiffError::LimitsExceeded)
        ));
    }

    #[test]
    fn pixel_lookup() {
        let data = (0..16).collect();
        let image = TiffImage::new(2, 2, data, FieldTable::new(IfdPointer(8)));

        assert_eq!(image.pixel(1, 1), Some([12, 13, 14, 15]));
        assert_eq!(image.pixel(2, 0), None);
        assert_eq!(image.dimensions(), (2, 2));
    }
}
