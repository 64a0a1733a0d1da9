//! Decoding of baseline TIFF images into RGBA rasters
//!
//! TIFF (Tagged Image File Format) stores one or more images, each described by an image file
//! directory (IFD) of tagged fields. This crate parses the chain of directories and decodes the
//! stripped, uncompressed or PackBits compressed image of each directory into 8-bit RGBA.
//!
//! ```
//! use tiff_strips::Decoder;
//!
//! # fn main() -> tiff_strips::TiffResult<()> {
//! #[rustfmt::skip]
//! let file: &[u8] = &[
//!     0x49, 0x49, 42, 0, 8, 0, 0, 0,
//!     // ImageWidth, ImageLength, BitsPerSample, PhotometricInterpretation, StripOffsets
//!     5, 0,
//!     0x00, 0x01, 3, 0, 1, 0, 0, 0, 2, 0, 0, 0,
//!     0x01, 0x01, 3, 0, 1, 0, 0, 0, 1, 0, 0, 0,
//!     0x02, 0x01, 3, 0, 1, 0, 0, 0, 8, 0, 0, 0,
//!     0x06, 0x01, 3, 0, 1, 0, 0, 0, 1, 0, 0, 0,
//!     0x11, 0x01, 4, 0, 1, 0, 0, 0, 74, 0, 0, 0,
//!     0, 0, 0, 0,
//!     // pixels
//!     0, 255,
//! ];
//!
//! let decoder = Decoder::new(file)?;
//! let image = decoder.decode(0)?;
//! assert_eq!(image.rgba(), &[0, 0, 0, 255, 255, 255, 255, 255]);
//! # Ok(())
//! # }
//! ```
//!
//! # Related Links
//! * <https://web.archive.org/web/20210108073850/https://www.adobe.io/open/standards/TIFF.html> - The TIFF specification

pub mod decoder;
mod directory;
mod error;
pub mod source;
pub mod tags;

pub use self::decoder::ifd::{FieldEntry, Value};
pub use self::decoder::{Decoder, Limits, ObjectKind, ObjectSink, TiffImage};
pub use self::directory::FieldTable;
pub use self::error::{
    DirectoryError, TiffError, TiffFormatError, TiffResult, TiffUnsupportedError, UsageError,
};
pub use self::source::{ByteSource, ChunkedSource};
