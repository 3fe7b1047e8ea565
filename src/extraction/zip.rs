use crate::error::UnpackError;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Archive extractor for ZIP payloads
pub struct ZipExtractor;

impl ZipExtractor {
    /// Extract a single ZIP entry to disk, creating directories as needed
    fn extract_zip_entry(
        mut file: zip::read::ZipFile,
        dest_path: &Path,
    ) -> Result<Option<PathBuf>, UnpackError> {
        let file_path = match file.enclosed_name() {
            Some(path) => dest_path.join(path),
            None => {
                warn!(entry = file.name(), "skipping entry with unsafe path");
                return Ok(None);
            }
        };

        if file.is_dir() {
            std::fs::create_dir_all(&file_path).map_err(|source| UnpackError::Io {
                path: file_path.clone(),
                source,
            })?;
            return Ok(None);
        }

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| UnpackError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        // File::create truncates, so a later entry with the same path wins
        let mut outfile = std::fs::File::create(&file_path).map_err(|source| UnpackError::Io {
            path: file_path.clone(),
            source,
        })?;
        std::io::copy(&mut file, &mut outfile).map_err(|source| UnpackError::Io {
            path: file_path.clone(),
            source,
        })?;

        Ok(Some(file_path))
    }

    /// Extract an in-memory ZIP archive into `dest_path`
    ///
    /// `progress` is called once per entry with its name, 1-based index and
    /// the entry count.
    pub fn extract(
        bytes: Vec<u8>,
        dest_path: &Path,
        title: &str,
        progress: &mut dyn FnMut(&str, usize, Option<usize>),
    ) -> Result<Vec<PathBuf>, UnpackError> {
        debug!(?dest_path, size = bytes.len(), "attempting ZIP extraction");

        let mut archive =
            zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| UnpackError::ExtractionFailed {
                title: title.to_string(),
                reason: format!("failed to read ZIP archive: {}", e),
            })?;

        let total = archive.len();
        let mut extracted_files = Vec::new();

        for i in 0..total {
            let file = archive
                .by_index(i)
                .map_err(|e| UnpackError::ExtractionFailed {
                    title: title.to_string(),
                    reason: format!("failed to read ZIP entry {}: {}", i, e),
                })?;
            progress(file.name(), i + 1, Some(total));

            if let Some(file_path) = Self::extract_zip_entry(file, dest_path)? {
                extracted_files.push(file_path);
            }
        }

        info!(
            ?dest_path,
            extracted_count = extracted_files.len(),
            "ZIP extraction successful"
        );
        Ok(extracted_files)
    }
}
