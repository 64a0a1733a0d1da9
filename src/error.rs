use std::error::Error;
use std::fmt;
use std::io;

use quick_error::quick_error;

use crate::tags::{CompressionMethod, Tag, Type};

quick_error! {
    /// Tiff error kinds.
    #[derive(Debug)]
    pub enum TiffError {
        /// The Image is not formatted properly.
        FormatError(err: TiffFormatError) {
            from()
            display("Format error: {}", err)
            source(err)
        }

        /// The Decoder does not support this image format.
        UnsupportedError(err: TiffUnsupportedError) {
            from()
            display("The Decoder does not support the image format `{}`", err)
            source(err)
        }

        /// The byte source has not loaded `[start, end)` yet.
        ///
        /// This is the only retryable error: the host supplies the range and calls again.
        DataUnavailable { start: u64, end: u64 } {
            display("Bytes {}..{} are not available yet", start, end)
        }

        /// An I/O Error occurred while decoding the image.
        IoError(err: io::Error) {
            from()
            display("{}", err)
            source(err)
        }

        /// The Limits of the Decoder is exceeded.
        LimitsExceeded {
            display("The Decoder limits are exceeded")
        }

        /// An integer conversion to or from a platform size failed.
        IntSizeError {
            display("Platform or format size limits exceeded")
        }

        /// The caller violated the contract of a decoder operation.
        UsageError(err: UsageError) {
            from()
            display("Usage error: {}", err)
            source(err)
        }
    }
}

quick_error! {
    /// The image is not formatted properly.
    ///
    /// This indicates that the encoder producing the image might behave incorrectly or that the
    /// input file has been corrupted.
    #[derive(Debug, Clone, PartialEq, Eq)]
    #[non_exhaustive]
    pub enum TiffFormatError {
        /// The first two bytes are neither `II` nor `MM`. Missing bytes read as zero.
        InvalidByteOrder(marker: u16) {
            display("TIFF signature not found, byte order marker is {:#06x}", marker)
        }
        /// The value following the byte order marker is not 42. A file that ends before the
        /// magic number reports 0.
        InvalidMagic(magic: u16) {
            display("TIFF signature invalid, expected 42 but found {}", magic)
        }
        /// The file ends inside the offset of the first directory.
        TruncatedHeader(len: u64) {
            display("File of {} bytes is too short for a TIFF header", len)
        }
        /// A byte range lies (partially) outside of the file.
        OffsetOutOfBounds { start: u64, end: u64, len: u64 } {
            display("Byte range {}..{} is outside of the file of length {}", start, end, len)
        }
        /// The chain of directories revisits an offset.
        CycleInOffsets(offset: u64) {
            display("File contained a cycle in the list of IFDs at offset {:#x}", offset)
        }
        RequiredTagNotFound(tag: Tag) {
            display("Required tag `{}` not found", tag.name())
        }
        RequiredTagEmpty(tag: Tag) {
            display("Required tag `{}` was empty", tag.name())
        }
        InvalidTagValueType(tag: Tag) {
            display("Tag `{}` did not have the expected value type", tag.name())
        }
        InvalidDimensions(width: u32, height: u32) {
            display("Invalid dimensions: {}x{}", width, height)
        }
        /// A strip yields fewer pixels than the rows it must cover.
        RowCountMismatch { strip: usize, expected: u64, actual: u64 } {
            display("Strip {} holds {} pixels but {} are required", strip, actual, expected)
        }
        /// The color map of a palette image does not hold `3 * 2^bits` entries.
        ColorMapLengthMismatch { expected: u64, actual: usize } {
            display("Color map has {} entries but {} are required", actual, expected)
        }
        /// A palette index points past the color map.
        ColorMapIndexOutOfRange(index: u32) {
            display("Palette index {} is outside of the color map", index)
        }
    }
}

quick_error! {
    /// The Decoder does not support features required by the image.
    ///
    /// This only captures known failures for which the standard either does not require support
    /// or an implementation has been planned but not yet completed.
    #[derive(Debug, Clone, PartialEq, Eq)]
    #[non_exhaustive]
    pub enum TiffUnsupportedError {
        /// Values of this field type can not be decoded, only `DOUBLE` at the moment.
        FieldType(ty: Type) {
            display("Field type {} is not supported", ty.name())
        }
        Compression(method: CompressionMethod) {
            display("Compression method {:?} ({}) is not supported", method, method.to_u16())
        }
        PhotometricInterpretation(id: u16) {
            display("Photometric interpretation {} is not supported", id)
        }
        /// The bit widths of the samples can not be decoded with this configuration.
        SampleLayout(bits_per_sample: Vec<u8>) {
            display("Sample layout with bits per sample {:?} is not supported", bits_per_sample)
        }
        PlanarConfiguration(id: u16) {
            display("Planar configuration {} is not supported", id)
        }
    }
}

quick_error! {
    /// User attempted to use the Decoder in a way that is incompatible with a specific image.
    ///
    /// For example: requesting more bits than fit into the result.
    #[derive(Debug, Clone, PartialEq, Eq)]
    #[non_exhaustive]
    pub enum UsageError {
        /// Bit reads must request between 1 and 32 bits.
        InvalidBitCount(bits: u32) {
            display("Requested {} bits, only 1 to 32 bits can be read at once", bits)
        }
        /// Byte reads must request between 1 and 4 bytes.
        InvalidByteCount(bytes: u32) {
            display("Requested {} bytes, only 1 to 4 bytes can be read at once", bytes)
        }
        /// Scaling a sample with a bit depth of zero.
        ZeroBitDepth {
            display("Samples can not be scaled from a bit depth of zero")
        }
        InvalidDirectoryIndex(index: usize) {
            display("There is no directory with index {}", index)
        }
    }
}

impl TiffError {
    /// Whether calling again after the host supplied more bytes may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TiffError::DataUnavailable { .. })
    }

    /// The byte range that must be supplied before a retry, if this is `DataUnavailable`.
    pub fn missing_range(&self) -> Option<std::ops::Range<u64>> {
        match *self {
            TiffError::DataUnavailable { start, end } => Some(start..end),
            _ => None,
        }
    }
}

impl From<std::num::TryFromIntError> for TiffError {
    fn from(_err: std::num::TryFromIntError) -> TiffError {
        TiffError::IntSizeError
    }
}

/// A directory that could not be parsed or decoded, with its position in the chain.
#[derive(Debug)]
pub struct DirectoryError {
    index: usize,
    error: TiffError,
}

impl DirectoryError {
    pub fn new(index: usize, error: TiffError) -> Self {
        DirectoryError { index, error }
    }

    /// Position of the directory in the chain, starting at 0.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn error(&self) -> &TiffError {
        &self.error
    }

    pub fn into_error(self) -> TiffError {
        self.error
    }
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "Directory {}: {}", self.index, self.error)
    }
}

impl Error for DirectoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

impl From<DirectoryError> for TiffError {
    fn from(err: DirectoryError) -> TiffError {
        err.into_error()
    }
}

/// Result of an image decoding process
pub type TiffResult<T> = Result<T, TiffError>;
