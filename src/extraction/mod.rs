//! Archive unpacking
//!
//! A downloaded [`Payload`] is unpacked into `<root>/<title>/`. The format is
//! picked from the payload's Content-Type and/or magic bytes according to
//! [`MimeDetection`]; ZIP and 7z are supported and anything else is an
//! [`UnpackError::UnrecognizedFormat`]. Existing files are overwritten.

mod sevenz;
mod shared;
mod zip;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

// Re-exports
pub use sevenz::SevenZipExtractor;
pub use shared::{archive_type_from_mime, detect_archive_type, sniff_archive_type};
pub use zip::ZipExtractor;

use crate::config::MimeDetection;
use crate::error::UnpackError;
use crate::types::{ArchiveType, Payload};
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::info;

/// Per-entry extraction progress
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryProgress {
    /// Entry name inside the archive
    pub name: String,
    /// 1-based position
    pub index: usize,
    /// Entry count, if known
    pub total: Option<usize>,
}

/// Unpack a payload under `destination_root/<title>`
///
/// Extraction runs on the blocking pool; `progress` is invoked from there
/// once per archive entry.
///
/// # Returns
/// The files written, in archive order.
pub async fn unpack<F>(
    payload: Payload,
    destination_root: &Path,
    detection: MimeDetection,
    mut progress: F,
) -> Result<Vec<PathBuf>, UnpackError>
where
    F: FnMut(EntryProgress) + Send + 'static,
{
    let archive_type = detect_archive_type(
        payload.content_type.as_deref(),
        &payload.bytes,
        detection,
    )?;

    let dest_path = destination_root.join(&payload.title);
    tokio::fs::create_dir_all(&dest_path)
        .await
        .map_err(|source| UnpackError::Io {
            path: dest_path.clone(),
            source,
        })?;

    info!(
        resource_id = %payload.resource_id,
        title = %payload.title,
        ?archive_type,
        ?dest_path,
        "dispatching extraction to appropriate extractor"
    );

    let title = payload.title;
    let bytes = payload.bytes;
    let dest_owned = dest_path.clone();

    spawn_blocking(move || {
        let mut report = |name: &str, index: usize, total: Option<usize>| {
            progress(EntryProgress {
                name: name.to_string(),
                index,
                total,
            })
        };
        match archive_type {
            ArchiveType::Zip => ZipExtractor::extract(bytes, &dest_owned, &title, &mut report),
            ArchiveType::SevenZip => {
                SevenZipExtractor::extract(bytes, &dest_owned, &title, &mut report)
            }
        }
    })
    .await
    .map_err(|e| UnpackError::ExtractionFailed {
        title: dest_path.display().to_string(),
        reason: format!("extraction task panicked: {}", e),
    })?
}
