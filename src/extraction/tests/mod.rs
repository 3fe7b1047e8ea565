use crate::config::MimeDetection;
use crate::error::UnpackError;
use crate::extraction::*;
use crate::types::{ArchiveType, Payload, ResourceId};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build an in-memory ZIP archive from (name, content) pairs
fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ::zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options =
        ::zip::write::FileOptions::default().compression_method(::zip::CompressionMethod::Stored);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        std::io::Write::write_all(&mut writer, content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Build a 7z archive from a directory tree using sevenz_rust
fn sevenz_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let src = TempDir::new().unwrap();
    for (name, content) in files {
        let path = src.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }
    let out = TempDir::new().unwrap();
    let archive = out.path().join("test.7z");
    sevenz_rust::compress_to_path(src.path(), &archive).unwrap();
    std::fs::read(archive).unwrap()
}

fn payload(title: &str, content_type: Option<&str>, bytes: Vec<u8>) -> Payload {
    Payload {
        resource_id: "5001".parse::<ResourceId>().unwrap(),
        title: title.to_string(),
        content_type: content_type.map(str::to_string),
        content_length: Some(bytes.len() as u64),
        bytes,
    }
}

fn read(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap()
}

// ---------------------------------------------------------------------------
// Format detection
// ---------------------------------------------------------------------------

#[test]
fn test_archive_type_from_mime() {
    assert_eq!(archive_type_from_mime("application/zip"), Some(ArchiveType::Zip));
    assert_eq!(
        archive_type_from_mime("application/x-zip-compressed"),
        Some(ArchiveType::Zip)
    );
    assert_eq!(
        archive_type_from_mime("Application/X-7z-Compressed; charset=binary"),
        Some(ArchiveType::SevenZip)
    );
    assert_eq!(archive_type_from_mime("application/x-rar-compressed"), None);
    assert_eq!(archive_type_from_mime("text/html"), None);
}

#[test]
fn test_sniff_archive_type() {
    assert_eq!(sniff_archive_type(b"PK\x03\x04rest"), Some(ArchiveType::Zip));
    assert_eq!(
        sniff_archive_type(b"7z\xBC\xAF\x27\x1C\x00\x04"),
        Some(ArchiveType::SevenZip)
    );
    assert_eq!(sniff_archive_type(b"<html>"), None);
    assert_eq!(sniff_archive_type(b""), None);
}

#[test]
fn test_declared_strategy_ignores_magic_bytes() {
    let err = detect_archive_type(
        Some("application/octet-stream"),
        b"PK\x03\x04",
        MimeDetection::Declared,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        UnpackError::UnrecognizedFormat { mime_type: Some(ref m) } if m == "application/octet-stream"
    ));
}

#[test]
fn test_sniff_strategy_ignores_declared_type() {
    let detected = detect_archive_type(
        Some("application/zip"),
        b"7z\xBC\xAF\x27\x1C",
        MimeDetection::Sniff,
    )
    .unwrap();
    assert_eq!(detected, ArchiveType::SevenZip);
}

#[test]
fn test_declared_then_sniff_falls_back_for_generic_types() {
    for ct in [None, Some("application/octet-stream"), Some("binary/octet-stream")] {
        let detected =
            detect_archive_type(ct, b"PK\x03\x04", MimeDetection::DeclaredThenSniff).unwrap();
        assert_eq!(detected, ArchiveType::Zip, "content type {:?}", ct);
    }
}

#[test]
fn test_declared_then_sniff_trusts_specific_types() {
    // A specific but unsupported type is not second-guessed
    let err = detect_archive_type(
        Some("text/html; charset=utf-8"),
        b"PK\x03\x04",
        MimeDetection::DeclaredThenSniff,
    )
    .unwrap_err();
    assert!(matches!(err, UnpackError::UnrecognizedFormat { .. }));
    assert_eq!(
        err.to_string(),
        "unrecognized file type: text/html; charset=utf-8"
    );
}

#[test]
fn test_unrecognized_without_content_type() {
    let err = detect_archive_type(None, b"garbage", MimeDetection::DeclaredThenSniff).unwrap_err();
    assert!(matches!(err, UnpackError::UnrecognizedFormat { mime_type: None }));
}

// ---------------------------------------------------------------------------
// ZIP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_unpack_zip_into_title_directory() {
    let root = TempDir::new().unwrap();
    let bytes = zip_bytes(&[("game.bin", b"binary"), ("docs/readme.txt", b"hello")]);

    let files = unpack(
        payload("Tekken 3 (USA)", Some("application/zip"), bytes),
        root.path(),
        MimeDetection::DeclaredThenSniff,
        |_| {},
    )
    .await
    .unwrap();

    let dest = root.path().join("Tekken 3 (USA)");
    assert_eq!(files, vec![dest.join("game.bin"), dest.join("docs/readme.txt")]);
    assert_eq!(read(&dest.join("game.bin")), b"binary");
    assert_eq!(read(&dest.join("docs/readme.txt")), b"hello");
}

#[tokio::test]
async fn test_unpack_zip_reports_each_entry() {
    let root = TempDir::new().unwrap();
    let bytes = zip_bytes(&[("a.bin", b"a"), ("b.bin", b"b"), ("c.bin", b"c")]);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    unpack(
        payload("Progress", Some("application/zip"), bytes),
        root.path(),
        MimeDetection::Declared,
        move |p| sink.lock().unwrap().push(p),
    )
    .await
    .unwrap();

    let seen = seen.lock().unwrap();
    let indices: Vec<_> = seen.iter().map(|p| (p.name.as_str(), p.index, p.total)).collect();
    assert_eq!(
        indices,
        vec![("a.bin", 1, Some(3)), ("b.bin", 2, Some(3)), ("c.bin", 3, Some(3))]
    );
}

#[tokio::test]
async fn test_unpack_zip_overwrites_existing_files() {
    let root = TempDir::new().unwrap();
    let dest = root.path().join("Overwrite");
    std::fs::create_dir_all(&dest).unwrap();
    std::fs::write(dest.join("game.bin"), b"old content that is longer").unwrap();

    unpack(
        payload("Overwrite", Some("application/zip"), zip_bytes(&[("game.bin", b"new")])),
        root.path(),
        MimeDetection::Declared,
        |_| {},
    )
    .await
    .unwrap();

    assert_eq!(read(&dest.join("game.bin")), b"new");
}

#[tokio::test]
async fn test_unpack_zip_skips_traversal_entries() {
    let root = TempDir::new().unwrap();
    let bytes = zip_bytes(&[("../escape.txt", b"nope"), ("safe.txt", b"ok")]);

    let files = unpack(
        payload("Traversal", Some("application/zip"), bytes),
        root.path(),
        MimeDetection::Declared,
        |_| {},
    )
    .await
    .unwrap();

    assert_eq!(files, vec![root.path().join("Traversal/safe.txt")]);
    assert!(!root.path().join("escape.txt").exists());
}

#[tokio::test]
async fn test_unpack_sniffs_zip_served_as_octet_stream() {
    let root = TempDir::new().unwrap();
    let files = unpack(
        payload(
            "Sniffed",
            Some("application/octet-stream"),
            zip_bytes(&[("x.bin", b"x")]),
        ),
        root.path(),
        MimeDetection::DeclaredThenSniff,
        |_| {},
    )
    .await
    .unwrap();
    assert_eq!(files.len(), 1);
}

#[tokio::test]
async fn test_unpack_corrupt_zip_fails() {
    let root = TempDir::new().unwrap();
    let err = unpack(
        payload("Broken", Some("application/zip"), b"PK\x03\x04 not really".to_vec()),
        root.path(),
        MimeDetection::Declared,
        |_| {},
    )
    .await
    .unwrap_err();

    match err {
        UnpackError::ExtractionFailed { title, .. } => assert_eq!(title, "Broken"),
        other => panic!("expected ExtractionFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unpack_unrecognized_writes_nothing() {
    let root = TempDir::new().unwrap();
    let err = unpack(
        payload("Page", Some("text/html"), b"<html></html>".to_vec()),
        root.path(),
        MimeDetection::DeclaredThenSniff,
        |_| {},
    )
    .await
    .unwrap_err();

    assert!(matches!(err, UnpackError::UnrecognizedFormat { .. }));
    assert!(!root.path().join("Page").exists());
}

// ---------------------------------------------------------------------------
// 7z
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_unpack_7z() {
    let root = TempDir::new().unwrap();
    let bytes = sevenz_bytes(&[("game.iso", b"iso data"), ("extras/manual.txt", b"manual")]);

    let files = unpack(
        payload("Gran Turismo", Some("application/x-7z-compressed"), bytes),
        root.path(),
        MimeDetection::DeclaredThenSniff,
        |_| {},
    )
    .await
    .unwrap();

    let dest = root.path().join("Gran Turismo");
    assert_eq!(files.len(), 2);
    assert!(files.contains(&dest.join("game.iso")));
    assert!(files.contains(&dest.join("extras/manual.txt")));
    assert_eq!(read(&dest.join("game.iso")), b"iso data");
    assert_eq!(read(&dest.join("extras/manual.txt")), b"manual");
}

#[tokio::test]
async fn test_unpack_7z_sniffed_and_reports_progress() {
    let root = TempDir::new().unwrap();
    let bytes = sevenz_bytes(&[("one.bin", b"1"), ("two.bin", b"2")]);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    unpack(
        payload("Sniffed 7z", None, bytes),
        root.path(),
        MimeDetection::Sniff,
        move |p| sink.lock().unwrap().push(p),
    )
    .await
    .unwrap();

    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    assert_eq!(seen.first().map(|p| p.index), Some(1));
    assert!(seen.iter().all(|p| p.total.is_some()));
}

#[tokio::test]
async fn test_unpack_corrupt_7z_fails() {
    let root = TempDir::new().unwrap();
    let mut bytes = b"7z\xBC\xAF\x27\x1C".to_vec();
    bytes.extend_from_slice(&[0u8; 32]);

    let err = unpack(
        payload("Bad 7z", Some("application/x-7z-compressed"), bytes),
        root.path(),
        MimeDetection::Declared,
        |_| {},
    )
    .await
    .unwrap_err();
    assert!(matches!(err, UnpackError::ExtractionFailed { .. }));
}
