//! Media type helpers: the accepted set, extension lookup, and content sniffing.

use std::path::Path;

/// Canonical output media type for compressed photos.
pub const CANONICAL_MEDIA_TYPE: &str = "image/jpeg";

/// Canonical output file extension.
pub const CANONICAL_EXTENSION: &str = "jpg";

/// Media types accepted even when a host reports them oddly.
pub const ACCEPTED_MEDIA_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/heic",
    "image/heif",
];

/// File extensions recognised when scanning directories.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "heic", "heif"];

/// Whether a declared type denotes JPEG (the only format carrying parsed EXIF).
pub fn is_jpeg(media_type: &str) -> bool {
    media_type.contains("jpeg") || media_type.contains("jpg")
}

/// Map a file extension to its media type.
pub fn from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}

/// Map a media type to the extension used in storage keys.
pub fn extension_for(media_type: &str) -> &'static str {
    match media_type {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/heic" => "heic",
        "image/heif" => "heif",
        _ => CANONICAL_EXTENSION,
    }
}

/// Detect a media type from leading magic bytes.
pub fn sniff(header: &[u8]) -> Option<&'static str> {
    if header.len() < 4 {
        return None;
    }

    // JPEG: FF D8 FF
    if header[0] == 0xFF && header[1] == 0xD8 && header[2] == 0xFF {
        return Some("image/jpeg");
    }

    // PNG: 89 50 4E 47
    if header[0] == 0x89 && header[1] == b'P' && header[2] == b'N' && header[3] == b'G' {
        return Some("image/png");
    }

    // WebP: RIFF....WEBP
    if header.len() >= 12 && &header[0..4] == b"RIFF" && &header[8..12] == b"WEBP" {
        return Some("image/webp");
    }

    // HEIC/HEIF: ftyp box at offset 4, brand at offset 8
    if header.len() >= 12 && &header[4..8] == b"ftyp" {
        return match &header[8..12] {
            b"heic" | b"heix" | b"heim" | b"heis" | b"hevc" | b"hevx" => Some("image/heic"),
            b"mif1" | b"msf1" | b"heif" => Some("image/heif"),
            _ => None,
        };
    }

    None
}
