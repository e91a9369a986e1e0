//! EXIF metadata extraction from JPEG payloads.
//!
//! Walks the JPEG marker stream to the APP1 segment and reads just enough of
//! the embedded TIFF structure to recover capture time, GPS position and
//! orientation. The pixel data is never decoded.
//!
//! Extraction is best-effort: every read is bounds-checked against the scan
//! window, and a failed read abandons only the directory it belongs to.

use crate::config::MetadataConfig;
use crate::types::{ExtractedMetadata, RawImageInput};

use super::media_type::is_jpeg;

const MARKER_SOI: u16 = 0xFFD8;
const MARKER_APP1: u16 = 0xFFE1;
const MARKER_SOS: u16 = 0xFFDA;
const EXIF_SIGNATURE: &[u8; 6] = b"Exif\0\0";
const BYTE_ORDER_LE: u16 = 0x4949;

const IFD_ENTRY_LEN: usize = 12;

// IFD0
const TAG_ORIENTATION: u16 = 0x0112;
const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_GPS_IFD: u16 = 0x8825;

// Exif sub-IFD
const TAG_DATETIME_ORIGINAL: u16 = 0x9003;
const TAG_DATETIME_DIGITIZED: u16 = 0x9004;

// GPS IFD
const TAG_GPS_LATITUDE_REF: u16 = 0x0001;
const TAG_GPS_LATITUDE: u16 = 0x0002;
const TAG_GPS_LONGITUDE_REF: u16 = 0x0003;
const TAG_GPS_LONGITUDE: u16 = 0x0004;

/// "YYYY:MM:DD HH:MM:SS" plus NUL.
const MAX_DATETIME_COUNT: usize = 20;

/// Extracts capture metadata from image payloads.
pub struct MetadataExtractor {
    scan_bytes: usize,
}

impl MetadataExtractor {
    /// Create a new extractor with the given configuration.
    pub fn new(config: MetadataConfig) -> Self {
        Self {
            scan_bytes: config.scan_bytes,
        }
    }

    /// Extract metadata from an input.
    ///
    /// Non-JPEG inputs, inputs without an EXIF segment and corrupt segments
    /// all yield [`ExtractedMetadata::default`]. This never fails.
    pub fn extract(&self, input: &RawImageInput) -> ExtractedMetadata {
        if !is_jpeg(input.media_type_str()) {
            return ExtractedMetadata::default();
        }

        let window = &input.data[..input.data.len().min(self.scan_bytes)];
        let metadata = Self::extract_from_bytes(window);
        tracing::trace!(
            "EXIF for {}: taken={:?} lat={:?} lon={:?} orientation={}",
            input.file_name,
            metadata.capture_timestamp,
            metadata.latitude,
            metadata.longitude,
            metadata.orientation
        );
        metadata
    }

    /// Extract metadata from a JPEG byte buffer (already limited to the scan window).
    pub fn extract_from_bytes(buf: &[u8]) -> ExtractedMetadata {
        let mut result = ExtractedMetadata::default();

        if read_u16_be(buf, 0) != Some(MARKER_SOI) {
            return result;
        }

        let mut offset = 2usize;
        while offset + 2 < buf.len() {
            let Some(marker) = read_u16_be(buf, offset) else {
                break;
            };
            if marker & 0xFF00 != 0xFF00 || marker == MARKER_SOS {
                break;
            }
            let Some(length) = read_u16_be(buf, offset + 2) else {
                break;
            };

            if marker == MARKER_APP1 {
                parse_app1(buf, offset + 4, &mut result);
            }
            offset += 2 + length as usize;
        }

        result
    }
}

/// Parse an APP1 body starting right after its length field.
fn parse_app1(buf: &[u8], start: usize, result: &mut ExtractedMetadata) {
    if buf.get(start..start + EXIF_SIGNATURE.len()) != Some(&EXIF_SIGNATURE[..]) {
        return;
    }

    let tiff = start + EXIF_SIGNATURE.len();
    let Some(byte_order) = read_u16_be(buf, tiff) else {
        return;
    };
    let view = TiffView {
        buf,
        tiff,
        little_endian: byte_order == BYTE_ORDER_LE,
    };

    if let Some(ifd0) = view.pointer(tiff + 4) {
        parse_primary_ifd(&view, ifd0, result);
    }
}

fn parse_primary_ifd(view: &TiffView<'_>, ifd: usize, result: &mut ExtractedMetadata) {
    for entry in view.entries(ifd) {
        match entry.tag {
            TAG_ORIENTATION => {
                if let Some(value) = view.u16(entry.value_offset()) {
                    result.orientation = value;
                }
            }
            TAG_EXIF_IFD => {
                if let Some(sub) = view.pointer(entry.value_offset()) {
                    parse_exif_ifd(view, sub, result);
                }
            }
            TAG_GPS_IFD => {
                if let Some(gps) = view.pointer(entry.value_offset()) {
                    parse_gps_ifd(view, gps, result);
                }
            }
            _ => {}
        }
    }
}

fn parse_exif_ifd(view: &TiffView<'_>, ifd: usize, result: &mut ExtractedMetadata) {
    for entry in view.entries(ifd) {
        if result.capture_timestamp.is_some() {
            break;
        }
        if matches!(entry.tag, TAG_DATETIME_ORIGINAL | TAG_DATETIME_DIGITIZED) {
            result.capture_timestamp = view
                .ascii(&entry, MAX_DATETIME_COUNT)
                .and_then(|raw| format_exif_datetime(&raw));
        }
    }
}

fn parse_gps_ifd(view: &TiffView<'_>, ifd: usize, result: &mut ExtractedMetadata) {
    let mut lat_ref = b'N';
    let mut lon_ref = b'E';
    let mut lat = None;
    let mut lon = None;

    for entry in view.entries(ifd) {
        match entry.tag {
            TAG_GPS_LATITUDE_REF => {
                if let Some(c) = view.byte(entry.value_offset()) {
                    lat_ref = c;
                }
            }
            TAG_GPS_LONGITUDE_REF => {
                if let Some(c) = view.byte(entry.value_offset()) {
                    lon_ref = c;
                }
            }
            TAG_GPS_LATITUDE => {
                lat = view
                    .pointer(entry.value_offset())
                    .and_then(|offset| view.dms(offset));
            }
            TAG_GPS_LONGITUDE => {
                lon = view
                    .pointer(entry.value_offset())
                    .and_then(|offset| view.dms(offset));
            }
            _ => {}
        }
    }

    if let Some(degrees) = lat {
        result.latitude = Some(if lat_ref == b'S' { -degrees } else { degrees });
    }
    if let Some(degrees) = lon {
        result.longitude = Some(if lon_ref == b'W' { -degrees } else { degrees });
    }
}

/// Reformat "YYYY:MM:DD HH:MM:SS" as "YYYY-MM-DDTHH:MM:SS".
///
/// Values that do not start with a date (cameras write blanks or spaces when
/// the clock is unset) are discarded.
fn format_exif_datetime(raw: &str) -> Option<String> {
    let raw = raw.trim_end_matches(['\0', ' ']);
    let b = raw.as_bytes();
    let digits = |range: std::ops::Range<usize>| b[range].iter().all(u8::is_ascii_digit);
    let date_like =
        b.len() >= 10 && b[4] == b':' && b[7] == b':' && digits(0..4) && digits(5..7) && digits(8..10);
    if !date_like {
        return None;
    }

    let formatted = format!("{}-{}-{}", &raw[0..4], &raw[5..7], &raw[8..]);
    Some(formatted.replacen(' ', "T", 1))
}

fn read_u16_be(buf: &[u8], offset: usize) -> Option<u16> {
    let bytes = buf.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// A bounds-checked view over the TIFF structure inside an APP1 segment.
struct TiffView<'a> {
    buf: &'a [u8],
    /// Absolute offset of the TIFF header; IFD pointers are relative to it
    tiff: usize,
    little_endian: bool,
}

/// One 12-byte directory entry.
struct IfdEntry {
    offset: usize,
    tag: u16,
}

impl IfdEntry {
    /// Position of the 4-byte inline value / pointer field.
    fn value_offset(&self) -> usize {
        self.offset + 8
    }

    fn count_offset(&self) -> usize {
        self.offset + 4
    }
}

impl<'a> TiffView<'a> {
    fn byte(&self, offset: usize) -> Option<u8> {
        self.buf.get(offset).copied()
    }

    fn u16(&self, offset: usize) -> Option<u16> {
        let bytes = self.buf.get(offset..offset.checked_add(2)?)?;
        let bytes = [bytes[0], bytes[1]];
        Some(if self.little_endian {
            u16::from_le_bytes(bytes)
        } else {
            u16::from_be_bytes(bytes)
        })
    }

    fn u32(&self, offset: usize) -> Option<u32> {
        let bytes = self.buf.get(offset..offset.checked_add(4)?)?;
        let bytes = [bytes[0], bytes[1], bytes[2], bytes[3]];
        Some(if self.little_endian {
            u32::from_le_bytes(bytes)
        } else {
            u32::from_be_bytes(bytes)
        })
    }

    /// Resolve a TIFF-relative pointer stored at `offset` to an absolute offset.
    fn pointer(&self, offset: usize) -> Option<usize> {
        let relative = usize::try_from(self.u32(offset)?).ok()?;
        self.tiff.checked_add(relative)
    }

    /// Iterate the entries of the directory at `ifd`, stopping at the buffer end.
    fn entries(&self, ifd: usize) -> impl Iterator<Item = IfdEntry> + '_ {
        let count = self.u16(ifd).unwrap_or(0) as usize;
        let first = ifd.saturating_add(2);
        (0..count)
            .map(move |i| first.saturating_add(i * IFD_ENTRY_LEN))
            .take_while(move |&offset| offset.saturating_add(IFD_ENTRY_LEN) <= self.buf.len())
            .filter_map(move |offset| {
                Some(IfdEntry {
                    offset,
                    tag: self.u16(offset)?,
                })
            })
    }

    /// Read an ASCII value of at most `max_count` bytes (inline when it fits in 4).
    fn ascii(&self, entry: &IfdEntry, max_count: usize) -> Option<String> {
        let count = usize::try_from(self.u32(entry.count_offset())?).ok()?;
        if count == 0 || count > max_count {
            return None;
        }
        let start = if count <= 4 {
            entry.value_offset()
        } else {
            self.pointer(entry.value_offset())?
        };
        let bytes = self.buf.get(start..start.checked_add(count)?)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Some(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// Read one unsigned RATIONAL; a zero denominator reads as 0.
    fn rational(&self, offset: usize) -> Option<f64> {
        let numerator = self.u32(offset)?;
        let denominator = self.u32(offset.checked_add(4)?)?;
        Some(if denominator == 0 {
            0.0
        } else {
            numerator as f64 / denominator as f64
        })
    }

    /// Read degrees/minutes/seconds rationals as decimal degrees.
    fn dms(&self, offset: usize) -> Option<f64> {
        let degrees = self.rational(offset)?;
        let minutes = self.rational(offset.checked_add(8)?)?;
        let seconds = self.rational(offset.checked_add(16)?)?;
        Some(degrees + minutes / 60.0 + seconds / 3600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{jpeg_with_exif, Entry, ExifLayout};

    fn jpeg_input(data: Vec<u8>) -> RawImageInput {
        RawImageInput::new("IMG_0001.jpg", Some("image/jpeg".to_string()), data)
    }

    fn extractor() -> MetadataExtractor {
        MetadataExtractor::new(MetadataConfig::default())
    }

    fn full_layout(little_endian: bool) -> ExifLayout {
        ExifLayout {
            little_endian,
            ifd0: vec![Entry::short(TAG_ORIENTATION, 6)],
            exif: vec![Entry::ascii(TAG_DATETIME_ORIGINAL, "2024:03:15 10:30:00")],
            gps: vec![
                Entry::ascii(TAG_GPS_LATITUDE_REF, "S"),
                Entry::rationals(TAG_GPS_LATITUDE, [(10, 1), (30, 1), (0, 1)]),
                Entry::ascii(TAG_GPS_LONGITUDE_REF, "W"),
                Entry::rationals(TAG_GPS_LONGITUDE, [(122, 1), (15, 1), (1800, 100)]),
            ],
        }
    }

    #[test]
    fn test_extracts_all_fields_little_endian() {
        let meta = extractor().extract(&jpeg_input(jpeg_with_exif(&full_layout(true))));

        assert_eq!(meta.capture_timestamp.as_deref(), Some("2024-03-15T10:30:00"));
        assert_eq!(meta.orientation, 6);
        assert!((meta.latitude.unwrap() - -10.5).abs() < 1e-9);
        assert!((meta.longitude.unwrap() - -122.255).abs() < 1e-9);
    }

    #[test]
    fn test_extracts_all_fields_big_endian() {
        let meta = extractor().extract(&jpeg_input(jpeg_with_exif(&full_layout(false))));

        assert_eq!(meta.capture_timestamp.as_deref(), Some("2024-03-15T10:30:00"));
        assert_eq!(meta.orientation, 6);
        assert!((meta.latitude.unwrap() - -10.5).abs() < 1e-9);
    }

    #[test]
    fn test_north_east_are_positive() {
        let layout = ExifLayout {
            little_endian: true,
            gps: vec![
                Entry::ascii(TAG_GPS_LATITUDE_REF, "N"),
                Entry::rationals(TAG_GPS_LATITUDE, [(51, 1), (30, 1), (36, 1)]),
                Entry::rationals(TAG_GPS_LONGITUDE, [(0, 1), (7, 1), (0, 0)]),
            ],
            ..Default::default()
        };
        let meta = extractor().extract(&jpeg_input(jpeg_with_exif(&layout)));

        assert!((meta.latitude.unwrap() - 51.51).abs() < 1e-9);
        // Missing ref defaults to E; zero denominator reads as 0
        assert!((meta.longitude.unwrap() - 7.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_first_timestamp_found_wins() {
        let layout = ExifLayout {
            little_endian: true,
            exif: vec![
                Entry::ascii(TAG_DATETIME_DIGITIZED, "2023:12:31 23:59:59"),
                Entry::ascii(TAG_DATETIME_ORIGINAL, "2024:01:01 00:00:00"),
            ],
            ..Default::default()
        };
        let meta = extractor().extract(&jpeg_input(jpeg_with_exif(&layout)));
        assert_eq!(meta.capture_timestamp.as_deref(), Some("2023-12-31T23:59:59"));
    }

    #[test]
    fn test_blank_timestamp_falls_through_to_next_tag() {
        let layout = ExifLayout {
            little_endian: false,
            exif: vec![
                Entry::ascii(TAG_DATETIME_ORIGINAL, "    :  :     :  :  "),
                Entry::ascii(TAG_DATETIME_DIGITIZED, "2022:06:01 08:00:00"),
            ],
            ..Default::default()
        };
        let meta = extractor().extract(&jpeg_input(jpeg_with_exif(&layout)));
        assert_eq!(meta.capture_timestamp.as_deref(), Some("2022-06-01T08:00:00"));
    }

    #[test]
    fn test_out_of_range_orientation_kept_as_is() {
        let layout = ExifLayout {
            little_endian: true,
            ifd0: vec![Entry::short(TAG_ORIENTATION, 42)],
            ..Default::default()
        };
        let meta = extractor().extract(&jpeg_input(jpeg_with_exif(&layout)));
        assert_eq!(meta.orientation, 42);
    }

    #[test]
    fn test_non_jpeg_type_returns_defaults() {
        let data = jpeg_with_exif(&full_layout(true));
        for media_type in [Some("image/png"), Some("image/heic"), None] {
            let input = RawImageInput::new("x", media_type.map(String::from), data.clone());
            assert!(extractor().extract(&input).is_default());
            // Deterministic on repeat
            assert!(extractor().extract(&input).is_default());
        }
    }

    #[test]
    fn test_missing_soi_returns_defaults() {
        let mut data = jpeg_with_exif(&full_layout(true));
        data[1] = 0x00;
        assert!(extractor().extract(&jpeg_input(data)).is_default());
    }

    #[test]
    fn test_app0_before_app1_is_skipped() {
        let exif = jpeg_with_exif(&full_layout(true));
        // SOI, then a 16-byte JFIF APP0, then the rest of the original stream
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        data.extend_from_slice(b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0");
        data.extend_from_slice(&exif[2..]);

        let meta = extractor().extract(&jpeg_input(data));
        assert_eq!(meta.orientation, 6);
        assert_eq!(meta.capture_timestamp.as_deref(), Some("2024-03-15T10:30:00"));
    }

    #[test]
    fn test_app1_without_exif_signature_is_ignored() {
        let mut data = jpeg_with_exif(&full_layout(true));
        // Corrupt the "Exif" signature
        data[6] = b'X';
        assert!(extractor().extract(&jpeg_input(data)).is_default());
    }

    #[test]
    fn test_segment_beyond_scan_window_is_ignored() {
        let exif = jpeg_with_exif(&full_layout(true));
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xE2, 0x01, 0x02];
        data.extend(std::iter::repeat(0u8).take(0x0100));
        data.extend_from_slice(&exif[2..]);

        let small = MetadataExtractor::new(MetadataConfig { scan_bytes: 64 });
        assert!(small.extract(&jpeg_input(data.clone())).is_default());
        assert_eq!(extractor().extract(&jpeg_input(data)).orientation, 6);
    }

    #[test]
    fn test_truncated_mid_entry_returns_defaults() {
        let data = jpeg_with_exif(&full_layout(true));
        // SOI(2) + APP1 header(4) + "Exif\0\0"(6) + TIFF header(8) + count(2) + 5 bytes
        let truncated = data[..2 + 4 + 6 + 8 + 2 + 5].to_vec();
        assert!(extractor().extract(&jpeg_input(truncated)).is_default());
    }

    #[test]
    fn test_out_of_bounds_pointer_leaves_field_default() {
        let layout = ExifLayout {
            little_endian: true,
            ifd0: vec![
                Entry::short(TAG_ORIENTATION, 3),
                Entry::long(TAG_GPS_IFD, 0x00FF_FFFF),
                Entry::long(TAG_EXIF_IFD, u32::MAX),
            ],
            ..Default::default()
        };
        let meta = extractor().extract(&jpeg_input(jpeg_with_exif(&layout)));
        assert_eq!(meta.orientation, 3);
        assert!(meta.latitude.is_none());
        assert!(meta.capture_timestamp.is_none());
    }

    #[test]
    fn test_every_truncation_is_safe() {
        let data = jpeg_with_exif(&full_layout(false));
        for len in 0..data.len() {
            let _ = MetadataExtractor::extract_from_bytes(&data[..len]);
        }
        assert_eq!(MetadataExtractor::extract_from_bytes(&data).orientation, 6);
    }

    #[test]
    fn test_format_exif_datetime() {
        assert_eq!(
            format_exif_datetime("2025:01:15 14:30:00").as_deref(),
            Some("2025-01-15T14:30:00")
        );
        assert_eq!(
            format_exif_datetime("2025:01:15 14:30:00\0").as_deref(),
            Some("2025-01-15T14:30:00")
        );
        assert_eq!(format_exif_datetime(""), None);
        assert_eq!(format_exif_datetime("yesterday"), None);
    }
}
