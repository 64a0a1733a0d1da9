use std::borrow::Cow;

use crate::directory::FieldTable;
use crate::error::{DirectoryError, TiffFormatError, TiffResult, UsageError};
use crate::source::ByteSource;
use crate::tags::{ByteOrder, IfdPointer};

use self::ifd::DirectoryChain;
use self::image::ImageLayout;
use self::photometric::PhotometricResolver;
use self::stream::{unsigned, ByteCursor};

mod cycles;
pub mod decompression;
pub mod ifd;
mod image;
pub mod photometric;
pub mod stream;

pub use self::image::{SampleProperty, TiffImage};

/// Decoding limits
#[derive(Clone, Debug)]
pub struct Limits {
    /// The maximum size of the RGBA buffer of one decoded image in bytes, the default is 256MiB.
    pub decoding_buffer_size: usize,
    /// The maximum size of any ifd value in bytes, the default is
    /// 1MiB.
    pub ifd_value_size: usize,
    /// The maximum number of directories followed in the chain, the default is 4096.
    pub max_directories: usize,
    /// The purpose of this is to prevent all the fields of the struct from
    /// being public, as this would make adding new fields a major version
    /// bump.
    _non_exhaustive: (),
}

impl Limits {
    /// A configuration that does not impose any limits.
    ///
    /// This is a good start if the caller only wants to impose selective limits, contrary to the
    /// default limits which allows selectively disabling limits.
    ///
    /// Note that this configuration is likely to crash on excessively large images since,
    /// naturally, the machine running the program does not have infinite memory.
    pub fn unlimited() -> Limits {
        Limits {
            decoding_buffer_size: usize::MAX,
            ifd_value_size: usize::MAX,
            max_directories: usize::MAX,
            _non_exhaustive: (),
        }
    }
}

impl Default for Limits {
    fn default() -> Limits {
        Limits {
            decoding_buffer_size: 256 * 1024 * 1024,
            ifd_value_size: 1024 * 1024,
            max_directories: 4096,
            _non_exhaustive: (),
        }
    }
}

/// The kind of object handed to an [`ObjectSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ObjectKind {
    Image,
}

/// Receives decoded objects, typically a renderer of the host application.
pub trait ObjectSink {
    /// Take ownership of `image`, decoded from the directory at `directory`.
    fn emit_object(&mut self, id: String, directory: usize, kind: ObjectKind, image: TiffImage);
}

impl<F> ObjectSink for F
where
    F: FnMut(String, usize, ObjectKind, TiffImage),
{
    fn emit_object(&mut self, id: String, directory: usize, kind: ObjectKind, image: TiffImage) {
        self(id, directory, kind, image)
    }
}

#[derive(Debug)]
struct Header {
    byte_order: ByteOrder,
    first_ifd: Option<IfdPointer>,
}

/// Byte order marker, magic number and offset of the first directory.
const HEADER_LEN: u64 = 8;

fn read_header<S: ByteSource + ?Sized>(source: &S) -> TiffResult<Header> {
    // A file shorter than a header is reported at the first field it cuts off.
    let present = ByteCursor::new(source, ByteOrder::BigEndian)
        .bytes(0, source.len().min(HEADER_LEN))?;
    let mut header = [0u8; HEADER_LEN as usize];
    header[..present.len()].copy_from_slice(&present);

    // Both markers read the same in either byte order.
    let marker = u16::from_be_bytes([header[0], header[1]]);
    let byte_order = match ByteOrder::from_marker(marker) {
        Some(byte_order) if present.len() >= 2 => byte_order,
        _ => return Err(TiffFormatError::InvalidByteOrder(marker).into()),
    };

    let magic = unsigned(&header[2..4], byte_order) as u16;
    if present.len() < 4 {
        return Err(TiffFormatError::InvalidMagic(0).into());
    }
    if magic != 42 {
        return Err(TiffFormatError::InvalidMagic(magic).into());
    }

    if present.len() < header.len() {
        return Err(TiffFormatError::TruncatedHeader(source.len()).into());
    }

    let first_ifd = match unsigned(&header[4..8], byte_order) {
        0 => None,
        offset => Some(IfdPointer(offset.into())),
    };

    Ok(Header {
        byte_order,
        first_ifd,
    })
}

/// The state of one decode call.
///
/// Nothing in here is shared with other calls, so any number of directories can be decoded at
/// the same time from the same source.
struct DecodeContext<'a, S: ?Sized> {
    cursor: ByteCursor<'a, S>,
    limits: &'a Limits,
}

impl<'a, S: ByteSource + ?Sized> DecodeContext<'a, S> {
    fn new(source: &'a S, byte_order: ByteOrder, limits: &'a Limits) -> Self {
        DecodeContext {
            cursor: ByteCursor::new(source, byte_order),
            limits,
        }
    }

    fn decode(&self, table: &FieldTable) -> TiffResult<TiffImage> {
        // Every unsupported feature is reported before the first strip is read.
        let layout = ImageLayout::from_table(table, self.cursor.len(), self.limits)?;
        let resolver = PhotometricResolver::from_table(table, &layout.samples)?;

        tracing::debug!(
            offset = table.offset().0,
            width = layout.width,
            height = layout.height,
            strips = layout.strip_count(),
            compression = ?layout.decompressor.method(),
            "decoding directory"
        );

        let row_len = usize::try_from(layout.width)? * 4;
        let mut data = vec![0u8; row_len * usize::try_from(layout.height)?];

        for strip in 0..layout.strip_count() {
            let geometry = layout.geometry(strip);
            let expected = geometry.pixel_count();

            let (offset, byte_count) =
                layout
                    .strip_range(strip)
                    .ok_or(TiffFormatError::RowCountMismatch {
                        strip,
                        expected,
                        actual: 0,
                    })?;

            let bytes = self.strip_bytes(strip, offset, byte_count)?;
            let decoded =
                layout
                    .decompressor
                    .decode_strip(&bytes, self.cursor.byte_order(), &geometry)?;

            let actual = decoded.pixel_count() as u64;
            if actual < expected {
                return Err(TiffFormatError::RowCountMismatch {
                    strip,
                    expected,
                    actual,
                }
                .into());
            }

            tracing::trace!(strip, offset, byte_count, rows = geometry.rows, "decoded strip");

            let start = usize::try_from(layout.first_row(strip))? * row_len;
            let end = start + usize::try_from(expected)? * 4;
            for (pixel, out) in decoded.pixels().zip(data[start..end].chunks_exact_mut(4)) {
                out.copy_from_slice(&resolver.resolve(pixel)?);
            }
        }

        Ok(TiffImage::new(
            layout.width,
            layout.height,
            data,
            table.clone(),
        ))
    }

    fn strip_bytes(&self, strip: usize, offset: u64, byte_count: u64) -> TiffResult<Cow<'a, [u8]>> {
        let file_len = self.cursor.len();
        if offset > file_len {
            return Err(TiffFormatError::OffsetOutOfBounds {
                start: offset,
                end: offset.saturating_add(byte_count),
                len: file_len,
            }
            .into());
        }

        let available = file_len - offset;
        let byte_count = if byte_count > available {
            tracing::warn!(strip, byte_count, available, "strip extends past the end of the file");
            available
        } else {
            byte_count
        };

        self.cursor.bytes(offset, byte_count)
    }
}

/// The representation of a TIFF decoder
///
/// Creating a decoder reads the header and the chain of directories. Images are decoded on
/// request, each directory independently of the others.
#[derive(Debug)]
pub struct Decoder<S> {
    source: S,
    byte_order: ByteOrder,
    limits: Limits,
    directories: Vec<FieldTable>,
    chain_error: Option<DirectoryError>,
}

impl<S: ByteSource> Decoder<S> {
    /// Create a new decoder that decodes from `source` with the default limits.
    pub fn new(source: S) -> TiffResult<Decoder<S>> {
        Decoder::with_limits(source, Limits::default())
    }

    /// Create a new decoder with custom limits.
    ///
    /// A directory that can not be parsed ends the chain. The directories before it are kept and
    /// the failure is available from [`Decoder::chain_error`], unless it was the very first
    /// directory in which case it is returned. Unavailable data is always returned so that the
    /// call can be repeated once the bytes were supplied.
    pub fn with_limits(source: S, limits: Limits) -> TiffResult<Decoder<S>> {
        let header = read_header(&source)?;
        let mut directories = Vec::new();
        let mut chain_error = None;

        {
            let cursor = ByteCursor::new(&source, header.byte_order);
            for result in DirectoryChain::new(cursor, header.first_ifd, &limits) {
                match result {
                    Ok(table) => directories.push(table),
                    Err(err) if err.is_retryable() || directories.is_empty() => return Err(err),
                    Err(err) => {
                        tracing::warn!(index = directories.len(), error = %err, "directory chain truncated");
                        chain_error = Some(DirectoryError::new(directories.len(), err));
                    }
                }
            }
        }

        tracing::debug!(
            byte_order = ?header.byte_order,
            directories = directories.len(),
            "read tiff header"
        );

        Ok(Decoder {
            source,
            byte_order: header.byte_order,
            limits,
            directories,
            chain_error,
        })
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Number of directories, i.e. pages, in the file.
    pub fn directory_count(&self) -> usize {
        self.directories.len()
    }

    pub fn directories(&self) -> &[FieldTable] {
        &self.directories
    }

    pub fn directory(&self, index: usize) -> Option<&FieldTable> {
        self.directories.get(index)
    }

    /// The error that ended the chain of directories early, if any.
    pub fn chain_error(&self) -> Option<&DirectoryError> {
        self.chain_error.as_ref()
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Access the source, for example to supply bytes after a `DataUnavailable` error.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Decode the image of the directory at `index`.
    pub fn decode(&self, index: usize) -> TiffResult<TiffImage> {
        let table = self
            .directory(index)
            .ok_or(UsageError::InvalidDirectoryIndex(index))?;

        DecodeContext::new(&self.source, self.byte_order, &self.limits).decode(table)
    }

    /// Decode every directory, in order. Failures are tagged with the index of their directory.
    pub fn decode_all(&self) -> Vec<Result<TiffImage, DirectoryError>> {
        (0..self.directory_count())
            .map(|index| {
                self.decode(index)
                    .map_err(|err| DirectoryError::new(index, err))
            })
            .collect()
    }

    /// Decode the directory at `index` and hand the image to `sink`.
    pub fn emit<K: ObjectSink + ?Sized>(&self, index: usize, sink: &mut K) -> TiffResult<()> {
        let image = self.decode(index)?;
        sink.emit_object(format!("tiff_fd{index}"), index, ObjectKind::Image, image);
        Ok(())
    }
}
