//! The static catalog of tag ids, field types and enumerated tag values.

use std::borrow::Cow;

macro_rules! tags {
    (@label $tag:ident) => { stringify!($tag) };
    (@label $tag:ident $label:literal) => { $label };
    {
        // Permit arbitrary meta items, which include documentation.
        $( #[$enum_attr:meta] )*
        $vis:vis enum $name:ident($ty:tt) $(unknown(#[$unknown_meta:meta] $unknown_doc:ident))* {
            // Each of the `Name = Val,` permitting documentation and a catalog label.
            $($(#[$ident_attr:meta])* $tag:ident $(as $label:literal)? = $val:expr,)*
        }
    } => {
        $( #[$enum_attr] )*
        #[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
        #[non_exhaustive]
        pub enum $name {
            $($(#[$ident_attr])* $tag,)*
            $(
                #[$unknown_meta]
                Unknown($ty),
            )*
        }

        impl $name {
            #[inline(always)]
            const fn __from_inner_type(n: $ty) -> Result<Self, $ty> {
                match n {
                    $( $val => Ok($name::$tag), )*
                    n => Err(n),
                }
            }

            #[inline(always)]
            const fn __to_inner_type(&self) -> $ty {
                match *self {
                    $( $name::$tag => $val, )*
                    $( $name::Unknown($unknown_doc) => { $unknown_doc }, )*
                }
            }

            /// The catalog name of a known value.
            #[inline]
            pub const fn known_name(&self) -> Option<&'static str> {
                match *self {
                    $( $name::$tag => Some(tags!(@label $tag $($label)?)), )*
                    #[allow(unreachable_patterns)]
                    _ => None,
                }
            }
        }

        tags!($name, $ty, $($unknown_doc)*);
    };
    // For u16 tags, provide direct inherent primitive conversion methods.
    ($name:tt, u16, $($unknown_doc:ident)*) => {
        impl $name {
            #[inline(always)]
            pub const fn from_u16(val: u16) -> Option<Self> {
                match Self::__from_inner_type(val) {
                    Ok(v) => Some(v),
                    Err(_) => None,
                }
            }

            $(
            #[inline(always)]
            pub const fn from_u16_exhaustive($unknown_doc: u16) -> Self {
                match Self::__from_inner_type($unknown_doc) {
                    Ok(v) => v,
                    Err(_) => $name::Unknown($unknown_doc),
                }
            }
            )*

            #[inline(always)]
            pub const fn to_u16(&self) -> u16 {
                Self::__to_inner_type(self)
            }
        }
    };
}

// See: http://www.digitizationguidelines.gov/guidelines/TIFF_Metadata_Final.pdf
// See: http://www.digitalpreservation.gov/formats/content/tiff_tags.shtml
tags! {
/// TIFF tags
pub enum Tag(u16) unknown(
    /// A private or extension tag
    unknown
) {
    // Baseline tags:
    Artist = 0x013B,
    BitsPerSample = 0x0102,
    CellLength = 0x0109,
    CellWidth = 0x0108,
    // palette-color images (PhotometricInterpretation 3)
    ColorMap = 0x0140,
    Compression = 0x0103,
    Copyright = 0x8298,
    DateTime = 0x0132,
    ExtraSamples = 0x0152,
    FillOrder = 0x010A,
    FreeByteCounts = 0x0121,
    FreeOffsets = 0x0120,
    GrayResponseCurve = 0x0123,
    GrayResponseUnit = 0x0122,
    HostComputer = 0x013C,
    ImageDescription = 0x010E,
    ImageLength = 0x0101,
    ImageWidth = 0x0100,
    Make = 0x010F,
    MaxSampleValue = 0x0119,
    MinSampleValue = 0x0118,
    Model = 0x0110,
    NewSubfileType = 0x00FE,
    Orientation = 0x0112,
    PhotometricInterpretation = 0x0106,
    PlanarConfiguration = 0x011C,
    ResolutionUnit = 0x0128,
    RowsPerStrip = 0x0116,
    SamplesPerPixel = 0x0115,
    Software = 0x0131,
    StripByteCounts = 0x0117,
    StripOffsets = 0x0111,
    SubfileType = 0x00FF,
    Threshholding = 0x0107,
    XResolution = 0x011A,
    YResolution = 0x011B,
    // Extended tags
    BadFaxLines = 0x0146,
    CleanFaxData = 0x0147,
    ClipPath = 0x0157,
    ConsecutiveBadFaxLines = 0x0148,
    Decode = 0x01B1,
    DefaultImageColor = 0x01B2,
    DocumentName = 0x010D,
    DotRange = 0x0150,
    HalftoneHints = 0x0141,
    Indexed = 0x015A,
    JPEGTables = 0x015B,
    PageName = 0x011D,
    PageNumber = 0x0129,
    Predictor = 0x013D,
    PrimaryChromaticities = 0x013F,
    ReferenceBlackWhite = 0x0214,
    SampleFormat = 0x0153,
    StripRowCounts = 0x022F,
    SubIfds as "SubIFDs" = 0x014A,
    T4Options = 0x0124,
    T6Options = 0x0125,
    TileByteCounts = 0x0145,
    TileLength = 0x0143,
    TileOffsets = 0x0144,
    TileWidth = 0x0142,
    TransferFunction = 0x012D,
    WhitePoint = 0x013E,
    XClipPathUnits = 0x0158,
    XPosition = 0x011E,
    YCbCrCoefficients = 0x0211,
    YCbCrPositioning = 0x0213,
    YCbCrSubSampling = 0x0212,
    YClipPathUnits = 0x0159,
    YPosition = 0x011F,
    // <https://web.archive.org/web/20131111073619/http://www.exif.org/Exif2-1.PDF>
    ApertureValue = 0x9202,
    ColorSpace = 0xA001,
    DateTimeDigitized = 0x9004,
    DateTimeOriginal = 0x9003,
    ExifDirectory as "Exif IFD" = 0x8769,
    ExifVersion = 0x9000,
    ExposureTime = 0x829A,
    FileSource = 0xA300,
    Flash = 0x9209,
    FlashpixVersion = 0xA000,
    FNumber = 0x829D,
    ImageUniqueId as "ImageUniqueID" = 0xA420,
    LightSource = 0x9208,
    MakerNote = 0x927C,
    ShutterSpeedValue = 0x9201,
    UserComment = 0x9286,
    // IPTC
    Iptc as "IPTC" = 0x83BB,
    // <https://www.color.org/technotes/ICC-Technote-ProfileEmbedding.pdf>
    IccProfile as "ICC Profile" = 0x8773,
    Xmp as "XMP" = 0x02BC,
    // GDAL
    GdalMetadata as "GDAL_METADATA" = 0xA480,
    GdalNodata as "GDAL_NODATA" = 0xA481,
    Photoshop = 0x8649,
}
}

impl Tag {
    /// The catalog name, or `Tag0x<hex>` for ids outside of the catalog.
    pub fn name(&self) -> Cow<'static, str> {
        match self.known_name() {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(format!("Tag{:#06x}", self.to_u16())),
        }
    }

    /// Look up a tag by its catalog name or by a synthesized `Tag0x<hex>` name.
    pub fn from_name(name: &str) -> Option<Tag> {
        if let Some(hex) = name.strip_prefix("Tag0x") {
            return u16::from_str_radix(hex, 16)
                .ok()
                .map(Tag::from_u16_exhaustive)
                .filter(|tag| tag.known_name().is_none());
        }

        // The catalog is small, a linear scan over the id space of known tags is sufficient.
        CATALOG_IDS
            .iter()
            .map(|&id| Tag::from_u16_exhaustive(id))
            .find(|tag| tag.known_name() == Some(name))
    }
}

const CATALOG_IDS: &[u16] = &[
    0x013B, 0x0102, 0x0109, 0x0108, 0x0140, 0x0103, 0x8298, 0x0132, 0x0152, 0x010A, 0x0121,
    0x0120, 0x0123, 0x0122, 0x013C, 0x010E, 0x0101, 0x0100, 0x010F, 0x0119, 0x0118, 0x0110,
    0x00FE, 0x0112, 0x0106, 0x011C, 0x0128, 0x0116, 0x0115, 0x0131, 0x0117, 0x0111, 0x00FF,
    0x0107, 0x011A, 0x011B, 0x0146, 0x0147, 0x0157, 0x0148, 0x01B1, 0x01B2, 0x010D, 0x0150,
    0x0141, 0x015A, 0x015B, 0x011D, 0x0129, 0x013D, 0x013F, 0x0214, 0x0153, 0x022F, 0x014A,
    0x0124, 0x0125, 0x0145, 0x0143, 0x0144, 0x0142, 0x012D, 0x013E, 0x0158, 0x011E, 0x0211,
    0x0213, 0x0212, 0x0159, 0x011F, 0x9202, 0xA001, 0x9004, 0x9003, 0x8769, 0x9000, 0x829A,
    0xA300, 0x9209, 0xA000, 0x829D, 0xA420, 0x9208, 0x927C, 0x9201, 0x9286, 0x83BB, 0x8773,
    0x02BC, 0xA480, 0xA481, 0x8649,
];

/// Identifies the offset of an IFD.
///
/// Only 32 bits are used by the classic TIFF files handled here, the value `0` terminates the
/// chain of directories.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct IfdPointer(pub u64);

tags! {
/// The type of an IFD entry (a 2 byte field).
pub enum Type(u16) {
    /// 8-bit unsigned integer
    BYTE = 1,
    /// 8-bit byte that contains a 7-bit ASCII code; the last byte must be zero
    ASCII = 2,
    /// 16-bit unsigned integer
    SHORT = 3,
    /// 32-bit unsigned integer
    LONG = 4,
    /// Fraction stored as two 32-bit unsigned integers
    RATIONAL = 5,
    /// 8-bit signed integer
    SBYTE = 6,
    /// 8-bit byte that may contain anything, depending on the field
    UNDEFINED = 7,
    /// 16-bit signed integer
    SSHORT = 8,
    /// 32-bit signed integer
    SLONG = 9,
    /// Fraction stored as two 32-bit signed integers
    SRATIONAL = 10,
    /// 32-bit IEEE floating point
    FLOAT = 11,
    /// 64-bit IEEE floating point
    DOUBLE = 12,
}
}

impl Type {
    /// Width of a single value of this type in bytes.
    pub const fn byte_len(&self) -> u8 {
        match *self {
            Type::BYTE | Type::SBYTE | Type::ASCII | Type::UNDEFINED => 1,
            Type::SHORT | Type::SSHORT => 2,
            Type::LONG | Type::SLONG | Type::FLOAT => 4,
            Type::DOUBLE | Type::RATIONAL | Type::SRATIONAL => 8,
        }
    }

    /// The catalog name such as `SHORT`.
    pub fn name(&self) -> &'static str {
        // Every type has a label, there is no unknown variant.
        self.known_name().unwrap_or("UNKNOWN")
    }

    pub(crate) fn value_bytes(&self, count: u32) -> u64 {
        u64::from(count) * u64::from(self.byte_len())
    }
}

tags! {
/// See [TIFF compression tags](https://www.awaresystems.be/imaging/tiff/tifftags/compression.html)
/// for reference.
pub enum CompressionMethod(u16) unknown(
    /// A custom compression method
    unknown
) {
    None = 1,
    // CCITT Group 3 1-Dimensional Modified Huffman run-length encoding
    Huffman = 2,
    Fax3 = 3,
    Fax4 = 4,
    LZW = 5,
    // Old-style JPEG (TIFF 6.0)
    JPEG = 6,
    // "Extended JPEG" or "new JPEG" style
    ModernJPEG = 7,
    Deflate = 8,
    OldDeflate = 0x80B2,
    PackBits = 0x8005,
}
}

tags! {
pub enum PhotometricInterpretation(u16) {
    WhiteIsZero = 0,
    BlackIsZero = 1,
    RGB = 2,
    RGBPalette = 3,
    TransparencyMask = 4,
    CMYK = 5,
    YCbCr = 6,
    CIELab = 8,
    IccLab = 9,
    ItuLab = 10,
}
}

tags! {
pub enum PlanarConfiguration(u16) {
    Chunky = 1,
    Planar = 2,
}
}

tags! {
pub enum ExtraSamples(u16) {
    /// There is no specified association between the sample and the image.
    Unspecified = 0,
    /// The sample is associated alpha, i.e. pre-multiplied color.
    AssociatedAlpha = 1,
    /// The sample is unassociated alpha such as a mask. There might be more than one such sample.
    UnassociatedAlpha = 2,
}
}

impl ExtraSamples {
    pub fn is_alpha(&self) -> bool {
        matches!(
            self,
            ExtraSamples::AssociatedAlpha | ExtraSamples::UnassociatedAlpha
        )
    }
}

/// Byte order of the TIFF file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// little endian byte order
    LittleEndian,
    /// big endian byte order
    BigEndian,
}

impl ByteOrder {
    /// Interpret the marker stored in the first two bytes of a file.
    ///
    /// Both valid markers are palindromes so the byte order used to read them does not matter.
    pub const fn from_marker(marker: u16) -> Option<Self> {
        match marker {
            0x4949 => Some(ByteOrder::LittleEndian),
            0x4D4D => Some(ByteOrder::BigEndian),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_names() {
        assert_eq!(Tag::ImageWidth.name(), "ImageWidth");
        assert_eq!(Tag::ExifDirectory.name(), "Exif IFD");
        assert_eq!(Tag::IccProfile.name(), "ICC Profile");
        assert_eq!(Tag::GdalMetadata.name(), "GDAL_METADATA");
        assert_eq!(Tag::from_u16_exhaustive(0x8005).name(), "Tag0x8005");
    }

    #[test]
    fn unknown_tags_are_preserved() {
        let tag = Tag::from_u16_exhaustive(0xC350);
        assert_eq!(tag, Tag::Unknown(0xC350));
        assert_eq!(tag.to_u16(), 0xC350);
        assert_eq!(Tag::from_name(&tag.name()), Some(tag));
    }

    #[test]
    fn catalog_round_trips_by_name() {
        for &id in CATALOG_IDS {
            let tag = Tag::from_u16_exhaustive(id);
            assert!(tag.known_name().is_some(), "{id:#x} missing from the catalog");
            assert_eq!(Tag::from_name(&tag.name()), Some(tag));
        }
    }

    #[test]
    fn field_type_widths() {
        assert_eq!(Type::from_u16(3).map(|t| t.byte_len()), Some(2));
        assert_eq!(Type::RATIONAL.byte_len(), 8);
        assert_eq!(Type::SRATIONAL.name(), "SRATIONAL");
        assert_eq!(Type::from_u16(13), None);
        assert_eq!(Type::from_u16(0), None);
    }

    #[test]
    fn byte_order_markers() {
        assert_eq!(ByteOrder::from_marker(0x4949), Some(ByteOrder::LittleEndian));
        assert_eq!(ByteOrder::from_marker(0x4D4D), Some(ByteOrder::BigEndian));
        assert_eq!(ByteOrder::from_marker(0x4D49), None);
    }
}
