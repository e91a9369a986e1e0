//! Builders for synthetic test payloads: JPEG streams with hand-laid EXIF
//! directories, and small encoded bitmaps.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

use crate::types::RawImageInput;

const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_GPS_IFD: u16 = 0x8825;

#[derive(Debug, Clone)]
pub(crate) enum Value {
    Short(u16),
    Long(u32),
    Ascii(String),
    Rationals(Vec<(u32, u32)>),
}

#[derive(Debug, Clone)]
pub(crate) struct Entry {
    tag: u16,
    value: Value,
}

impl Entry {
    pub(crate) fn short(tag: u16, value: u16) -> Self {
        Self {
            tag,
            value: Value::Short(value),
        }
    }

    pub(crate) fn long(tag: u16, value: u32) -> Self {
        Self {
            tag,
            value: Value::Long(value),
        }
    }

    pub(crate) fn ascii(tag: u16, value: &str) -> Self {
        Self {
            tag,
            value: Value::Ascii(value.to_string()),
        }
    }

    pub(crate) fn rationals<const N: usize>(tag: u16, values: [(u32, u32); N]) -> Self {
        Self {
            tag,
            value: Value::Rationals(values.to_vec()),
        }
    }
}

/// IFD0 plus optional Exif and GPS sub-directories. Pointer entries for
/// non-empty sub-directories are appended to IFD0 automatically.
#[derive(Debug, Clone, Default)]
pub(crate) struct ExifLayout {
    pub little_endian: bool,
    pub ifd0: Vec<Entry>,
    pub exif: Vec<Entry>,
    pub gps: Vec<Entry>,
}

struct TiffWriter {
    little_endian: bool,
}

impl TiffWriter {
    fn u16(&self, out: &mut Vec<u8>, v: u16) {
        if self.little_endian {
            out.extend_from_slice(&v.to_le_bytes());
        } else {
            out.extend_from_slice(&v.to_be_bytes());
        }
    }

    fn u32(&self, out: &mut Vec<u8>, v: u32) {
        if self.little_endian {
            out.extend_from_slice(&v.to_le_bytes());
        } else {
            out.extend_from_slice(&v.to_be_bytes());
        }
    }

    /// (type code, count, encoded bytes)
    fn encode(&self, value: &Value) -> (u16, u32, Vec<u8>) {
        let mut bytes = Vec::new();
        match value {
            Value::Short(v) => {
                self.u16(&mut bytes, *v);
                (3, 1, bytes)
            }
            Value::Long(v) => {
                self.u32(&mut bytes, *v);
                (4, 1, bytes)
            }
            Value::Ascii(s) => {
                bytes.extend_from_slice(s.as_bytes());
                bytes.push(0);
                (2, bytes.len() as u32, bytes)
            }
            Value::Rationals(values) => {
                for (num, den) in values {
                    self.u32(&mut bytes, *num);
                    self.u32(&mut bytes, *den);
                }
                (5, values.len() as u32, bytes)
            }
        }
    }

    fn ifd(&self, out: &mut Vec<u8>, data: &mut Vec<u8>, data_start: usize, entries: &[Entry]) {
        self.u16(out, entries.len() as u16);
        for entry in entries {
            let (kind, count, mut bytes) = self.encode(&entry.value);
            self.u16(out, entry.tag);
            self.u16(out, kind);
            self.u32(out, count);
            if bytes.len() <= 4 {
                bytes.resize(4, 0);
                out.extend_from_slice(&bytes);
            } else {
                self.u32(out, (data_start + data.len()) as u32);
                data.extend_from_slice(&bytes);
            }
        }
        self.u32(out, 0);
    }
}

fn ifd_len(entries: usize) -> usize {
    2 + entries * 12 + 4
}

/// Lay out a TIFF structure (header, IFD0, Exif IFD, GPS IFD, value area).
pub(crate) fn tiff_bytes(layout: &ExifLayout) -> Vec<u8> {
    let writer = TiffWriter {
        little_endian: layout.little_endian,
    };
    let has_exif = !layout.exif.is_empty();
    let has_gps = !layout.gps.is_empty();

    let ifd0_len = ifd_len(layout.ifd0.len() + has_exif as usize + has_gps as usize);
    let exif_off = 8 + ifd0_len;
    let gps_off = exif_off + if has_exif { ifd_len(layout.exif.len()) } else { 0 };
    let data_off = gps_off + if has_gps { ifd_len(layout.gps.len()) } else { 0 };

    let mut ifd0 = layout.ifd0.clone();
    if has_exif {
        ifd0.push(Entry::long(TAG_EXIF_IFD, exif_off as u32));
    }
    if has_gps {
        ifd0.push(Entry::long(TAG_GPS_IFD, gps_off as u32));
    }

    let mut out = Vec::new();
    if layout.little_endian {
        out.extend_from_slice(b"II");
    } else {
        out.extend_from_slice(b"MM");
    }
    writer.u16(&mut out, 42);
    writer.u32(&mut out, 8);

    let mut data = Vec::new();
    writer.ifd(&mut out, &mut data, data_off, &ifd0);
    if has_exif {
        writer.ifd(&mut out, &mut data, data_off, &layout.exif);
    }
    if has_gps {
        writer.ifd(&mut out, &mut data, data_off, &layout.gps);
    }
    out.extend_from_slice(&data);
    out
}

/// A minimal JPEG stream: SOI, APP1 (Exif), a stub scan, EOI.
///
/// Not decodable as an image; enough for the marker walk.
pub(crate) fn jpeg_with_exif(layout: &ExifLayout) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    out.extend_from_slice(&app1_segment(layout));
    out.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02, 0x12, 0x34, 0xFF, 0xD9]);
    out
}

fn app1_segment(layout: &ExifLayout) -> Vec<u8> {
    let tiff = tiff_bytes(layout);
    let mut out = vec![0xFF, 0xE1];
    out.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out
}

/// A decodable gradient JPEG whose APP1 segment carries an Orientation tag.
pub(crate) fn oriented_jpeg(width: u32, height: u32, orientation: u16) -> Vec<u8> {
    let jpeg = encoded(width, height, ImageFormat::Jpeg);
    let layout = ExifLayout {
        ifd0: vec![Entry::short(0x0112, orientation)],
        ..Default::default()
    };
    let mut out = vec![0xFF, 0xD8];
    out.extend_from_slice(&app1_segment(&layout));
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// A gradient bitmap, so encoders cannot collapse it to nothing.
pub(crate) fn gradient(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x ^ y) & 0xFF) as u8,
        ])
    });
    DynamicImage::ImageRgb8(img)
}

/// Encode a gradient bitmap in the given container format.
pub(crate) fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    gradient(width, height)
        .write_to(&mut buffer, format)
        .expect("encode test image");
    buffer.into_inner()
}

pub(crate) fn png_input(name: &str, width: u32, height: u32) -> RawImageInput {
    RawImageInput::new(
        name,
        Some("image/png".to_string()),
        encoded(width, height, ImageFormat::Png),
    )
}
