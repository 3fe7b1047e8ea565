use crate::error::UnpackError;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::shared::is_enclosed;

/// Archive extractor for 7z payloads
pub struct SevenZipExtractor;

impl SevenZipExtractor {
    /// Number of entries in a 7z archive, if its header can be read
    fn entry_count(bytes: &[u8]) -> Option<usize> {
        sevenz_rust::SevenZReader::new(
            Cursor::new(bytes),
            bytes.len() as u64,
            sevenz_rust::Password::empty(),
        )
        .map(|reader| reader.archive().files.len())
        .ok()
    }

    /// Extract an in-memory 7z archive into `dest_path`
    ///
    /// `progress` is called once per entry with its name, 1-based index and
    /// the entry count.
    pub fn extract(
        bytes: Vec<u8>,
        dest_path: &Path,
        title: &str,
        progress: &mut dyn FnMut(&str, usize, Option<usize>),
    ) -> Result<Vec<PathBuf>, UnpackError> {
        debug!(?dest_path, size = bytes.len(), "attempting 7z extraction");

        std::fs::create_dir_all(dest_path).map_err(|source| UnpackError::Io {
            path: dest_path.to_path_buf(),
            source,
        })?;

        let total = Self::entry_count(&bytes);
        let mut index = 0;
        let mut extracted_files = Vec::new();

        sevenz_rust::decompress_with_extract_fn(
            Cursor::new(bytes),
            dest_path,
            |entry, reader, path| {
                index += 1;
                progress(entry.name(), index, total);

                if !is_enclosed(entry.name()) {
                    warn!(entry = entry.name(), "skipping entry with unsafe path");
                    // Drain so the next entry in a solid block starts at the right offset
                    std::io::copy(reader, &mut std::io::sink())?;
                    return Ok(true);
                }

                let keep_going = sevenz_rust::default_entry_extract_fn(entry, reader, path)?;
                if !entry.is_directory() {
                    extracted_files.push(path.clone());
                }
                Ok(keep_going)
            },
        )
        .map_err(|e| UnpackError::ExtractionFailed {
            title: title.to_string(),
            reason: format!("failed to extract 7z archive: {}", e),
        })?;

        Self::validate_extracted_paths(dest_path, &extracted_files)?;

        info!(
            ?dest_path,
            extracted_count = extracted_files.len(),
            "7z extraction successful"
        );
        Ok(extracted_files)
    }

    /// Check that every extracted file resolves inside the destination
    ///
    /// Entry names are already screened; this catches a path that escapes
    /// through a symlink created by an earlier entry.
    fn validate_extracted_paths(
        dest_path: &Path,
        extracted_files: &[PathBuf],
    ) -> Result<(), UnpackError> {
        let canonical_dest = dest_path
            .canonicalize()
            .map_err(|source| UnpackError::Io {
                path: dest_path.to_path_buf(),
                source,
            })?;

        for path in extracted_files {
            let canonical = path.canonicalize().map_err(|source| UnpackError::Io {
                path: path.clone(),
                source,
            })?;
            if !canonical.starts_with(&canonical_dest) {
                return Err(UnpackError::PathTraversal {
                    path: canonical,
                    dest: canonical_dest,
                });
            }
        }
        Ok(())
    }
}
