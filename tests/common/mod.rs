//! Builds small TIFF files in memory.
#![allow(dead_code)]

use tiff_strips::tags::{ByteOrder, CompressionMethod, Tag};

/// The values of one directory entry.
#[derive(Clone, Debug)]
pub enum Values {
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<(u32, u32)>),
    Ascii(String),
    /// Any type id with pre-encoded bytes.
    Raw { ty: u16, count: u32, bytes: Vec<u8> },
}

impl Values {
    fn type_id(&self) -> u16 {
        match self {
            Values::Short(_) => 3,
            Values::Long(_) => 4,
            Values::Rational(_) => 5,
            Values::Ascii(_) => 2,
            Values::Raw { ty, .. } => *ty,
        }
    }

    fn count(&self) -> u32 {
        match self {
            Values::Short(v) => v.len() as u32,
            Values::Long(v) => v.len() as u32,
            Values::Rational(v) => v.len() as u32,
            Values::Ascii(s) => s.len() as u32 + 1,
            Values::Raw { count, .. } => *count,
        }
    }

    fn encode(&self, byte_order: ByteOrder) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Values::Short(v) => v.iter().for_each(|&x| put_u16(&mut out, x, byte_order)),
            Values::Long(v) => v.iter().for_each(|&x| put_u32(&mut out, x, byte_order)),
            Values::Rational(v) => v.iter().for_each(|&(n, d)| {
                put_u32(&mut out, n, byte_order);
                put_u32(&mut out, d, byte_order);
            }),
            Values::Ascii(s) => {
                out.extend_from_slice(s.as_bytes());
                out.push(0);
            }
            Values::Raw { bytes, .. } => out.extend_from_slice(bytes),
        }
        out
    }
}

pub fn put_u16(out: &mut Vec<u8>, value: u16, byte_order: ByteOrder) {
    match byte_order {
        ByteOrder::LittleEndian => out.extend_from_slice(&value.to_le_bytes()),
        ByteOrder::BigEndian => out.extend_from_slice(&value.to_be_bytes()),
    }
}

pub fn put_u32(out: &mut Vec<u8>, value: u32, byte_order: ByteOrder) {
    match byte_order {
        ByteOrder::LittleEndian => out.extend_from_slice(&value.to_le_bytes()),
        ByteOrder::BigEndian => out.extend_from_slice(&value.to_be_bytes()),
    }
}

fn patch_u32(out: &mut [u8], at: usize, value: u32, byte_order: ByteOrder) {
    let bytes = match byte_order {
        ByteOrder::LittleEndian => value.to_le_bytes(),
        ByteOrder::BigEndian => value.to_be_bytes(),
    };
    out[at..at + 4].copy_from_slice(&bytes);
}

/// One directory: its fields and the strips it points to.
#[derive(Clone, Debug, Default)]
pub struct ImageBuilder {
    fields: Vec<(u16, Values)>,
    strips: Vec<Vec<u8>>,
    omit_byte_counts: bool,
}

impl ImageBuilder {
    pub fn new(width: u32, height: u32) -> Self {
        ImageBuilder::default()
            .long(Tag::ImageWidth, width)
            .long(Tag::ImageLength, height)
    }

    /// A single-strip 8-bit BlackIsZero image.
    pub fn gray8(width: u32, height: u32, pixels: &[u8]) -> Self {
        ImageBuilder::new(width, height)
            .short(Tag::BitsPerSample, 8)
            .short(Tag::PhotometricInterpretation, 1)
            .strip(pixels)
    }

    pub fn field(mut self, tag: Tag, values: Values) -> Self {
        let id = tag.to_u16();
        match self.fields.iter_mut().find(|(known, _)| *known == id) {
            Some((_, existing)) => *existing = values,
            None => self.fields.push((id, values)),
        }
        self
    }

    pub fn short(self, tag: Tag, value: u16) -> Self {
        self.field(tag, Values::Short(vec![value]))
    }

    pub fn shorts(self, tag: Tag, values: &[u16]) -> Self {
        self.field(tag, Values::Short(values.to_vec()))
    }

    pub fn long(self, tag: Tag, value: u32) -> Self {
        self.field(tag, Values::Long(vec![value]))
    }

    pub fn compression(self, method: CompressionMethod) -> Self {
        self.short(Tag::Compression, method.to_u16())
    }

    pub fn strip(mut self, data: &[u8]) -> Self {
        self.strips.push(data.to_vec());
        self
    }

    pub fn without_byte_counts(mut self) -> Self {
        self.omit_byte_counts = true;
        self
    }
}

/// A whole file, one directory per image.
#[derive(Clone, Debug)]
pub struct TiffBuilder {
    byte_order: ByteOrder,
    images: Vec<ImageBuilder>,
    loop_back: bool,
}

impl TiffBuilder {
    pub fn new(byte_order: ByteOrder) -> Self {
        TiffBuilder {
            byte_order,
            images: Vec::new(),
            loop_back: false,
        }
    }

    pub fn image(mut self, image: ImageBuilder) -> Self {
        self.images.push(image);
        self
    }

    /// Point the last directory back at the first one.
    pub fn loop_back(mut self) -> Self {
        self.loop_back = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let bo = self.byte_order;
        let mut out = match bo {
            ByteOrder::LittleEndian => b"II".to_vec(),
            ByteOrder::BigEndian => b"MM".to_vec(),
        };
        put_u16(&mut out, 42, bo);
        put_u32(&mut out, 0, bo);

        let mut next_slot = 4;
        let mut first_ifd = None;

        for image in &self.images {
            let mut fields = image.fields.clone();

            if !image.strips.is_empty() {
                let mut offsets = Vec::new();
                let mut counts = Vec::new();
                for strip in &image.strips {
                    offsets.push(out.len() as u32);
                    counts.push(strip.len() as u32);
                    out.extend_from_slice(strip);
                }

                fields.push((Tag::StripOffsets.to_u16(), Values::Long(offsets)));
                if !image.omit_byte_counts {
                    fields.push((Tag::StripByteCounts.to_u16(), Values::Long(counts)));
                }
            }

            if out.len() % 2 == 1 {
                out.push(0);
            }

            let ifd = out.len();
            patch_u32(&mut out, next_slot, ifd as u32, bo);
            first_ifd.get_or_insert(ifd);

            fields.sort_by_key(|(tag, _)| *tag);
            let values_start = ifd + 2 + 12 * fields.len() + 4;
            let mut values_area = Vec::new();

            put_u16(&mut out, fields.len() as u16, bo);
            for (tag, values) in &fields {
                put_u16(&mut out, *tag, bo);
                put_u16(&mut out, values.type_id(), bo);
                put_u32(&mut out, values.count(), bo);

                let mut bytes = values.encode(bo);
                if bytes.len() <= 4 {
                    bytes.resize(4, 0);
                    out.extend_from_slice(&bytes);
                } else {
                    put_u32(&mut out, (values_start + values_area.len()) as u32, bo);
                    values_area.extend_from_slice(&bytes);
                    if values_area.len() % 2 == 1 {
                        values_area.push(0);
                    }
                }
            }

            next_slot = out.len();
            put_u32(&mut out, 0, bo);
            out.extend_from_slice(&values_area);
        }

        if let (true, Some(first)) = (self.loop_back, first_ifd) {
            patch_u32(&mut out, next_slot, first as u32, bo);
        }

        out
    }
}

/// RGBA bytes of opaque gray pixels.
pub fn opaque_gray(values: &[u8]) -> Vec<u8> {
    values.iter().flat_map(|&v| [v, v, v, 255]).collect()
}
