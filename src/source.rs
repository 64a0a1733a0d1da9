//! Random access to the bytes of a file.
//!
//! The decoder never owns the bytes it reads. A [`ByteSource`] hands out sub-ranges on request and
//! may answer that a range is not loaded yet, in which case decoding fails with
//! [`TiffError::DataUnavailable`](crate::TiffError::DataUnavailable) and can be retried once the
//! host supplied the range.

use std::borrow::Cow;
use std::ops::Range;
use std::sync::Arc;

/// A random-access view of a file's bytes.
///
/// Implementations may be shared between threads decoding different directories at the same
/// time, so reading must not require exclusive access.
pub trait ByteSource {
    /// Total length of the file in bytes.
    fn len(&self) -> u64;

    /// Whether the file is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the bytes in `range`, which always lies within `0..self.len()`.
    ///
    /// Returns `None` if the bytes are not available yet.
    fn byte_range(&self, range: Range<u64>) -> Option<Cow<'_, [u8]>>;
}

impl ByteSource for [u8] {
    fn len(&self) -> u64 {
        <[u8]>::len(self) as u64
    }

    fn byte_range(&self, range: Range<u64>) -> Option<Cow<'_, [u8]>> {
        let start = usize::try_from(range.start).ok()?;
        let end = usize::try_from(range.end).ok()?;
        self.get(start..end).map(Cow::Borrowed)
    }
}

impl ByteSource for Vec<u8> {
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    fn byte_range(&self, range: Range<u64>) -> Option<Cow<'_, [u8]>> {
        self.as_slice().byte_range(range)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &S {
    fn len(&self) -> u64 {
        (**self).len()
    }

    fn byte_range(&self, range: Range<u64>) -> Option<Cow<'_, [u8]>> {
        (**self).byte_range(range)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Arc<S> {
    fn len(&self) -> u64 {
        (**self).len()
    }

    fn byte_range(&self, range: Range<u64>) -> Option<Cow<'_, [u8]>> {
        (**self).byte_range(range)
    }
}

/// A file of known length that is loaded in fixed-size chunks.
///
/// This is the decoder-side half of a network loader: the host fetches chunks however it likes and
/// hands them over with [`ChunkedSource::supply`]. Reads touching a chunk that was not supplied yet
/// report the range as unavailable.
#[derive(Debug, Clone)]
pub struct ChunkedSource {
    data: Vec<u8>,
    chunk_size: usize,
    loaded: Vec<bool>,
}

impl ChunkedSource {
    pub const DEFAULT_CHUNK_SIZE: usize = 65536;

    /// An empty source for a file of `length` bytes with the default chunk size.
    pub fn new(length: usize) -> Self {
        Self::with_chunk_size(length, Self::DEFAULT_CHUNK_SIZE)
    }

    /// An empty source with a custom chunk size. A chunk size of zero is treated as one.
    pub fn with_chunk_size(length: usize, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        let chunks = length.div_ceil(chunk_size);

        ChunkedSource {
            data: vec![0; length],
            chunk_size,
            loaded: vec![false; chunks],
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Whether every chunk has been supplied.
    pub fn is_fully_loaded(&self) -> bool {
        self.loaded.iter().all(|&loaded| loaded)
    }

    /// Store bytes received for the file, starting at `begin`.
    ///
    /// Chunks count as loaded once all their bytes are covered by this call. Bytes past the end of
    /// the file are ignored.
    pub fn supply(&mut self, begin: usize, bytes: &[u8]) {
        let begin = begin.min(self.data.len());
        let end = begin.saturating_add(bytes.len()).min(self.data.len());
        self.data[begin..end].copy_from_slice(&bytes[..end - begin]);

        let first_full = begin.div_ceil(self.chunk_size);
        let last_full = if end == self.data.len() {
            self.loaded.len()
        } else {
            end / self.chunk_size
        };

        for chunk in first_full..last_full {
            self.loaded[chunk] = true;
        }

        tracing::trace!(begin, end, "supplied bytes to chunked source");
    }

    /// The chunk-aligned ranges that must be supplied before `range` can be read.
    pub fn missing_ranges(&self, range: Range<u64>) -> Vec<Range<u64>> {
        let mut missing: Vec<Range<u64>> = Vec::new();

        for chunk in self.chunks_of(range) {
            if self.loaded[chunk] {
                continue;
            }

            let start = (chunk * self.chunk_size) as u64;
            let end = (((chunk + 1) * self.chunk_size).min(self.data.len())) as u64;

            match missing.last_mut() {
                Some(last) if last.end == start => last.end = end,
                _ => missing.push(start..end),
            }
        }

        missing
    }

    fn chunks_of(&self, range: Range<u64>) -> Range<usize> {
        if range.start >= range.end {
            return 0..0;
        }

        let start = usize::try_from(range.start).unwrap_or(usize::MAX) / self.chunk_size;
        let end = usize::try_from(range.end - 1).unwrap_or(usize::MAX) / self.chunk_size + 1;
        start.min(self.loaded.len())..end.min(self.loaded.len())
    }
}

impl ByteSource for ChunkedSource {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn byte_range(&self, range: Range<u64>) -> Option<Cow<'_, [u8]>> {
        if !self.chunks_of(range.clone()).all(|chunk| self.loaded[chunk]) {
            return None;
        }

        self.data.as_slice().byte_range(range)
    }
}
