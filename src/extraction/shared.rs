use crate::config::MimeDetection;
use crate::error::UnpackError;
use crate::types::ArchiveType;
use crate::utils::mime_essence;
use std::path::{Component, Path};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_MAGIC: &[u8] = b"PK\x05\x06";
const SEVEN_ZIP_MAGIC: &[u8] = b"7z\xBC\xAF\x27\x1C";

/// Archive type for a declared MIME type
pub fn archive_type_from_mime(content_type: &str) -> Option<ArchiveType> {
    match mime_essence(content_type).as_str() {
        "application/zip" | "application/x-zip-compressed" => Some(ArchiveType::Zip),
        "application/x-7z-compressed" => Some(ArchiveType::SevenZip),
        _ => None,
    }
}

/// Archive type from the leading magic bytes
pub fn sniff_archive_type(bytes: &[u8]) -> Option<ArchiveType> {
    if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(ZIP_EMPTY_MAGIC) {
        Some(ArchiveType::Zip)
    } else if bytes.starts_with(SEVEN_ZIP_MAGIC) {
        Some(ArchiveType::SevenZip)
    } else {
        None
    }
}

fn is_generic_mime(content_type: &str) -> bool {
    matches!(
        mime_essence(content_type).as_str(),
        "" | "application/octet-stream" | "binary/octet-stream" | "application/x-download"
    )
}

/// Decide which extractor handles a payload
///
/// # Errors
/// [`UnpackError::UnrecognizedFormat`] when the strategy finds no supported type.
pub fn detect_archive_type(
    content_type: Option<&str>,
    bytes: &[u8],
    strategy: MimeDetection,
) -> Result<ArchiveType, UnpackError> {
    let detected = match strategy {
        MimeDetection::Declared => content_type.and_then(archive_type_from_mime),
        MimeDetection::Sniff => sniff_archive_type(bytes),
        MimeDetection::DeclaredThenSniff => match content_type {
            Some(ct) if !is_generic_mime(ct) => archive_type_from_mime(ct),
            _ => sniff_archive_type(bytes),
        },
    };

    detected.ok_or_else(|| UnpackError::UnrecognizedFormat {
        mime_type: content_type.map(str::to_string),
    })
}

/// Whether an archive entry name stays inside the extraction directory
pub(crate) fn is_enclosed(name: &str) -> bool {
    let path = Path::new(name);
    !name.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
