//! Function for reading TIFF tags

use std::fmt;

use super::cycles::IfdCycles;
use super::stream::{unsigned, ByteCursor};
use super::Limits;
use crate::directory::FieldTable;
use crate::source::ByteSource;
use crate::tags::{ByteOrder, IfdPointer, Tag, Type};
use crate::{TiffError, TiffResult, TiffUnsupportedError};

use self::Value::{
    Ascii, Byte, Float, Rational, SRational, Short, Signed, SignedByte, SignedShort, Undefined,
    Unsigned,
};

/// Size of one directory entry: tag, type, count and the value or offset slot.
const ENTRY_LEN: u64 = 12;

/// A single decoded element of a field.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum Value {
    Byte(u8),
    Short(u16),
    Unsigned(u32),
    SignedByte(i8),
    SignedShort(i16),
    Signed(i32),
    Float(f32),
    /// Numerator and denominator, kept apart.
    Rational(u32, u32),
    SRational(i32, i32),
    Ascii(char),
    Undefined(u8),
}

impl Value {
    /// The field type this value is an element of.
    pub fn field_type(&self) -> Type {
        match self {
            Byte(_) => Type::BYTE,
            Short(_) => Type::SHORT,
            Unsigned(_) => Type::LONG,
            SignedByte(_) => Type::SBYTE,
            SignedShort(_) => Type::SSHORT,
            Signed(_) => Type::SLONG,
            Float(_) => Type::FLOAT,
            Rational(..) => Type::RATIONAL,
            SRational(..) => Type::SRATIONAL,
            Ascii(_) => Type::ASCII,
            Undefined(_) => Type::UNDEFINED,
        }
    }

    /// Convert an integer value to `u32`. Negative and non-integer values give `None`.
    pub fn to_u32(&self) -> Option<u32> {
        match *self {
            Byte(val) => Some(val.into()),
            Short(val) => Some(val.into()),
            Unsigned(val) => Some(val),
            SignedByte(val) => u32::try_from(val).ok(),
            SignedShort(val) => u32::try_from(val).ok(),
            Signed(val) => u32::try_from(val).ok(),
            Float(_) | Rational(..) | SRational(..) | Ascii(_) | Undefined(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Byte(val) | Undefined(val) => write!(f, "{val}"),
            Short(val) => write!(f, "{val}"),
            Unsigned(val) => write!(f, "{val}"),
            SignedByte(val) => write!(f, "{val}"),
            SignedShort(val) => write!(f, "{val}"),
            Signed(val) => write!(f, "{val}"),
            Float(val) => write!(f, "{val}"),
            Rational(num, den) => write!(f, "{num}/{den}"),
            SRational(num, den) => write!(f, "{num}/{den}"),
            Ascii(val) => write!(f, "{val}"),
        }
    }
}

/// The decoded values of one directory entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    ty: Type,
    values: Vec<Value>,
}

impl FieldEntry {
    pub fn new(ty: Type, values: Vec<Value>) -> Self {
        FieldEntry { ty, values }
    }

    /// The type declared by the directory entry.
    pub fn field_type(&self) -> Type {
        self.ty
    }

    /// Number of values, the `count` of the directory entry.
    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// All values as `u32`, or `None` if any of them is not an unsigned integer.
    pub fn as_u32_vec(&self) -> Option<Vec<u32>> {
        self.values.iter().map(Value::to_u32).collect()
    }

    pub fn first_u32(&self) -> Option<u32> {
        self.values.first().and_then(Value::to_u32)
    }

    /// The characters of an `ASCII` field up to the first NUL.
    pub fn as_string(&self) -> Option<String> {
        if self.ty != Type::ASCII {
            return None;
        }

        Some(
            self.values
                .iter()
                .map_while(|value| match *value {
                    Ascii('\0') => None,
                    Ascii(ch) => Some(ch),
                    _ => None,
                })
                .collect(),
        )
    }

    /// Numerator and denominator pairs of a `RATIONAL` field.
    pub fn as_rationals(&self) -> Option<Vec<(u32, u32)>> {
        self.values
            .iter()
            .map(|value| match *value {
                Rational(num, den) => Some((num, den)),
                _ => None,
            })
            .collect()
    }
}

impl<'a, S: ByteSource + ?Sized> ByteCursor<'a, S> {
    /// Decode the `count` values of a field of type `ty`.
    ///
    /// `slot` holds the four value bytes of the entry in file order. Values that fit into it are
    /// stored there directly, otherwise it holds the offset at which the values start.
    pub fn decode_field_values(&self, ty: Type, count: u32, slot: [u8; 4]) -> TiffResult<Vec<Value>> {
        if ty == Type::DOUBLE {
            return Err(TiffUnsupportedError::FieldType(ty).into());
        }

        let len = ty.value_bytes(count);
        if len <= 4 {
            // Inline values occupy the leading bytes of the slot in either byte order.
            let used = usize::try_from(len)?;
            return Ok(parse_values(ty, &slot[..used], self.byte_order()));
        }

        let offset = unsigned(&slot, self.byte_order());
        let bytes = self.bytes(offset.into(), len)?;
        Ok(parse_values(ty, &bytes, self.byte_order()))
    }
}

fn parse_values(ty: Type, bytes: &[u8], byte_order: ByteOrder) -> Vec<Value> {
    let width = usize::from(ty.byte_len());
    let uint = |chunk: &[u8]| unsigned(chunk, byte_order);

    bytes
        .chunks_exact(width)
        .map(|chunk| match ty {
            Type::BYTE => Byte(chunk[0]),
            Type::ASCII => Ascii(char::from(chunk[0])),
            Type::SBYTE => SignedByte(chunk[0] as i8),
            Type::UNDEFINED => Undefined(chunk[0]),
            Type::SHORT => Short(uint(chunk) as u16),
            Type::SSHORT => SignedShort(uint(chunk) as u16 as i16),
            Type::LONG => Unsigned(uint(chunk)),
            Type::SLONG => Signed(uint(chunk) as i32),
            Type::FLOAT => Float(f32::from_bits(uint(chunk))),
            Type::RATIONAL => Rational(uint(&chunk[..4]), uint(&chunk[4..])),
            Type::SRATIONAL => SRational(uint(&chunk[..4]) as i32, uint(&chunk[4..]) as i32),
            Type::DOUBLE => unreachable!("DOUBLE is rejected before reading"),
        })
        .collect()
}

/// Read the directory at `ptr`: the entry count, the entries and the pointer to the next one.
pub(crate) fn read_directory<S: ByteSource + ?Sized>(
    cursor: &ByteCursor<'_, S>,
    ptr: IfdPointer,
    limits: &Limits,
) -> TiffResult<FieldTable> {
    let entry_count = cursor.read_u16(ptr.0)?;
    let entries_start = ptr.0.checked_add(2).ok_or(TiffError::IntSizeError)?;
    let entries_len = u64::from(entry_count) * ENTRY_LEN;

    // The entries and the trailing next pointer are fetched at once.
    let raw = cursor.bytes(entries_start, entries_len + 4)?;
    let (entries, next) = raw.split_at(usize::try_from(entries_len)?);
    let byte_order = cursor.byte_order();

    let mut table = FieldTable::new(ptr);
    for entry in entries.chunks_exact(ENTRY_LEN as usize) {
        let tag = Tag::from_u16_exhaustive(unsigned(&entry[0..2], byte_order) as u16);
        let type_id = unsigned(&entry[2..4], byte_order) as u16;
        let count = unsigned(&entry[4..8], byte_order);
        let slot = [entry[8], entry[9], entry[10], entry[11]];

        let ty = match Type::from_u16(type_id) {
            Some(ty) => ty,
            None => {
                tracing::warn!(tag = %tag.name(), type_id, "skipping entry of unknown field type");
                continue;
            }
        };

        if ty.value_bytes(count) > limits.ifd_value_size as u64 {
            return Err(TiffError::LimitsExceeded);
        }

        let values = cursor.decode_field_values(ty, count, slot)?;
        table.insert(tag, FieldEntry::new(ty, values));
    }

    let next = match unsigned(next, byte_order) {
        0 => None,
        offset => Some(IfdPointer(offset.into())),
    };
    table.set_next(next);

    tracing::debug!(offset = ptr.0, entries = entry_count, "read directory");
    Ok(table)
}

/// Walks the linked list of directories, refusing to visit an offset twice.
///
/// Iteration ends after the last directory or after the first error.
pub(crate) struct DirectoryChain<'a, 'l, S: ?Sized> {
    cursor: ByteCursor<'a, S>,
    limits: &'l Limits,
    next: Option<IfdPointer>,
    cycles: IfdCycles,
    visited: usize,
}

impl<'a, 'l, S: ByteSource + ?Sized> DirectoryChain<'a, 'l, S> {
    pub(crate) fn new(cursor: ByteCursor<'a, S>, first: Option<IfdPointer>, limits: &'l Limits) -> Self {
        DirectoryChain {
            cursor,
            limits,
            next: first,
            cycles: IfdCycles::new(),
            visited: 0,
        }
    }

    fn read_next(&mut self, ptr: IfdPointer) -> TiffResult<FieldTable> {
        if self.visited >= self.limits.max_directories {
            return Err(TiffError::LimitsExceeded);
        }

        self.cycles.visit(ptr)?;
        let table = read_directory(&self.cursor, ptr, self.limits)?;
        self.visited += 1;
        self.next = table.next();
        Ok(table)
    }
}

impl<S: ByteSource + ?Sized> Iterator for DirectoryChain<'_, '_, S> {
    type Item = TiffResult<FieldTable>;

    fn next(&mut self) -> Option<Self::Item> {
        let ptr = self.next.take()?;
        Some(self.read_next(ptr))
    }
}
