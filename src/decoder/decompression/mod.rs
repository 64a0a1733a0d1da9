use crate::{
    decoder::image::SampleProperty,
    error::{TiffResult, TiffUnsupportedError},
    tags::{ByteOrder, CompressionMethod},
};

mod packbits;
mod uncompressed;

pub use self::packbits::{PackBits, PackBitsReader};
pub use self::uncompressed::Uncompressed;

/// The shape of the pixels stored in one strip.
#[derive(Debug, Clone, Copy)]
pub struct StripGeometry<'a> {
    /// One entry per sample of a pixel, in storage order.
    pub samples: &'a [SampleProperty],
    pub width: u32,
    /// Rows actually present in this strip.
    pub rows: u32,
}

impl StripGeometry<'_> {
    /// Number of pixels the strip has to provide.
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.rows)
    }
}

/// The pixels recovered from one strip, as a flat run of sample tuples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedStrip {
    samples_per_pixel: usize,
    samples: Vec<u32>,
}

impl DecodedStrip {
    pub fn new(samples_per_pixel: usize, samples: Vec<u32>) -> Self {
        debug_assert!(samples_per_pixel > 0);
        debug_assert_eq!(samples.len() % samples_per_pixel, 0);
        DecodedStrip {
            samples_per_pixel,
            samples,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.samples.len() / self.samples_per_pixel
    }

    /// The sample tuples in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = &[u32]> + '_ {
        self.samples.chunks_exact(self.samples_per_pixel)
    }
}

/// An algorithm that turns the bytes of a strip into pixel samples.
pub trait DecompressionAlgorithm {
    /// The corresponding tag to the algorithm.
    const COMPRESSION_METHOD: CompressionMethod;

    /// Decode at most `geometry.pixel_count()` pixels from `data`.
    ///
    /// Running out of data is not an error here. The caller compares the number of pixels with
    /// what the strip must provide.
    fn decode_strip(
        &self,
        data: &[u8],
        byte_order: ByteOrder,
        geometry: &StripGeometry<'_>,
    ) -> TiffResult<DecodedStrip>;
}

/// The decompression schemes available to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decompressor {
    Uncompressed(Uncompressed),
    PackBits(PackBits),
}

impl Decompressor {
    /// Select the algorithm for a `Compression` tag value.
    ///
    /// CCITT, LZW and JPEG are recognized by [`CompressionMethod`] but have no decoder, so they
    /// are reported as unsupported like any unknown method.
    pub fn for_method(method: CompressionMethod) -> TiffResult<Self> {
        match method {
            CompressionMethod::None => Ok(Decompressor::Uncompressed(Uncompressed)),
            CompressionMethod::PackBits => Ok(Decompressor::PackBits(PackBits)),
            other => Err(TiffUnsupportedError::Compression(other).into()),
        }
    }

    pub fn method(&self) -> CompressionMethod {
        match self {
            Decompressor::Uncompressed(_) => Uncompressed::COMPRESSION_METHOD,
            Decompressor::PackBits(_) => PackBits::COMPRESSION_METHOD,
        }
    }

    pub fn decode_strip(
        &self,
        data: &[u8],
        byte_order: ByteOrder,
        geometry: &StripGeometry<'_>,
    ) -> TiffResult<DecodedStrip> {
        match self {
            Decompressor::Uncompressed(algorithm) => {
                algorithm.decode_strip(data, byte_order, geometry)
            }
            Decompressor::PackBits(algorithm) => algorithm.decode_strip(data, byte_order, geometry),
        }
    }
}
