use core::fmt;

use crate::{
    decoder::ifd::FieldEntry,
    tags::{IfdPointer, Tag},
    TiffFormatError, TiffResult,
};

/// The fields of one Image File Directory (IFD).
///
/// A table maps each [`Tag`] to its decoded [`FieldEntry`]. Entries keep the order in which they
/// appear in the file. A tag occurs at most once: a repeated tag replaces the earlier value but
/// keeps its position. Tables are built by the directory parser and never change afterwards.
#[doc(alias = "IFD")]
#[derive(Clone, PartialEq)]
pub struct FieldTable {
    entries: Vec<(Tag, FieldEntry)>,
    offset: IfdPointer,
    next_ifd: Option<IfdPointer>,
}

impl FieldTable {
    pub(crate) fn new(offset: IfdPointer) -> Self {
        FieldTable {
            entries: Vec::new(),
            offset,
            next_ifd: None,
        }
    }

    pub(crate) fn insert(&mut self, tag: Tag, entry: FieldEntry) {
        match self.entries.iter_mut().find(|(known, _)| *known == tag) {
            Some((_, existing)) => *existing = entry,
            None => self.entries.push((tag, entry)),
        }
    }

    pub(crate) fn set_next(&mut self, next: Option<IfdPointer>) {
        self.next_ifd = next;
    }

    /// Retrieve the value associated with a tag.
    pub fn get(&self, tag: Tag) -> Option<&FieldEntry> {
        self.entries
            .iter()
            .find(|(known, _)| *known == tag)
            .map(|(_, entry)| entry)
    }

    /// Retrieve a value by catalog name, e.g. `"ImageWidth"` or `"Tag0xc350"`.
    pub fn get_by_name(&self, name: &str) -> Option<&FieldEntry> {
        Tag::from_name(name).and_then(|tag| self.get(tag))
    }

    /// Check if the directory contains a specified tag.
    pub fn contains(&self, tag: Tag) -> bool {
        self.get(tag).is_some()
    }

    /// Iterate over all known and unknown tags in directory order.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, &FieldEntry)> + '_ {
        self.entries.iter().map(|(tag, entry)| (*tag, entry))
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The position of this directory in the file.
    pub fn offset(&self) -> IfdPointer {
        self.offset
    }

    /// Get the pointer to the next IFD, if it was defined.
    pub fn next(&self) -> Option<IfdPointer> {
        self.next_ifd
    }

    /// Tries to retrieve a tag and convert its first value to `u32`.
    /// Return `Ok(None)` if the tag is not present.
    pub fn find_u32(&self, tag: Tag) -> TiffResult<Option<u32>> {
        match self.get(tag) {
            None => Ok(None),
            Some(entry) => match entry.values().first() {
                None => Err(TiffFormatError::RequiredTagEmpty(tag).into()),
                Some(value) => value
                    .to_u32()
                    .map(Some)
                    .ok_or_else(|| TiffFormatError::InvalidTagValueType(tag).into()),
            },
        }
    }

    /// Tries to retrieve a tag and convert its first value to `u32`.
    /// Returns an error if the tag is not present.
    pub fn require_u32(&self, tag: Tag) -> TiffResult<u32> {
        self.find_u32(tag)?
            .ok_or_else(|| TiffFormatError::RequiredTagNotFound(tag).into())
    }

    /// Tries to retrieve all values of a tag as `u32`.
    pub fn find_u32_vec(&self, tag: Tag) -> TiffResult<Option<Vec<u32>>> {
        self.get(tag)
            .map(|entry| {
                entry
                    .as_u32_vec()
                    .ok_or_else(|| TiffFormatError::InvalidTagValueType(tag).into())
            })
            .transpose()
    }

    pub fn require_u32_vec(&self, tag: Tag) -> TiffResult<Vec<u32>> {
        self.find_u32_vec(tag)?
            .ok_or_else(|| TiffFormatError::RequiredTagNotFound(tag).into())
    }

    pub(crate) fn find_u16_vec(&self, tag: Tag) -> TiffResult<Option<Vec<u16>>> {
        self.find_u32_vec(tag)?
            .map(|values| {
                values
                    .into_iter()
                    .map(|v| {
                        u16::try_from(v).map_err(|_| TiffFormatError::InvalidTagValueType(tag).into())
                    })
                    .collect()
            })
            .transpose()
    }
}

impl fmt::Debug for FieldTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldTable")
            .field(
                "entries",
                &self
                    .entries
                    .iter()
                    .map(|(tag, entry)| (tag.name(), entry))
                    .collect::<Vec<_>>(),
            )
            .field("offset", &self.offset)
            .field("next_ifd", &self.next_ifd)
            .finish()
    }
}
