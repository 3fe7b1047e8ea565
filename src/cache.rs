//! Identifier cache
//!
//! Discovering ids costs one request per listing page plus one per title, so
//! the result of a full scan is kept on disk as a pair of JSON files per
//! console:
//!
//! - `cached_game_ids_<System>.json`: array of ids in discovery order
//! - `cached_game_id_to_url_<System>.json`: object mapping id to detail page
//!
//! The pair is all-or-nothing. Both absent means "scan again"; anything else
//! that cannot be read back is reported rather than silently rescanned.

use crate::error::{CacheError, Result};
use crate::types::{Console, DiscoveredIds, ResourceId, SourceUrlMap};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// JSON file pair holding previously discovered ids
#[derive(Clone, Debug)]
pub struct IdentifierCache {
    dir: PathBuf,
}

impl IdentifierCache {
    /// Cache rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the id list for a console
    pub fn ids_path(&self, console: Console) -> PathBuf {
        self.dir
            .join(format!("cached_game_ids_{}.json", console.system_name()))
    }

    /// Path of the id → url map for a console
    pub fn sources_path(&self, console: Console) -> PathBuf {
        self.dir
            .join(format!("cached_game_id_to_url_{}.json", console.system_name()))
    }

    /// Load cached ids
    ///
    /// Returns `Ok(None)` when neither file exists.
    pub async fn load(&self, console: Console) -> Result<Option<DiscoveredIds>> {
        let ids_path = self.ids_path(console);
        let sources_path = self.sources_path(console);

        let ids: Option<Vec<ResourceId>> = read_json(&ids_path).await?;
        let sources: Option<SourceUrlMap> = read_json(&sources_path).await?;

        match (ids, sources) {
            (None, None) => {
                debug!(%console, ?ids_path, "no cached ids");
                Ok(None)
            }
            (Some(_), None) => Err(CacheError::Partial {
                present: ids_path,
                missing: sources_path,
            }
            .into()),
            (None, Some(_)) => Err(CacheError::Partial {
                present: sources_path,
                missing: ids_path,
            }
            .into()),
            (Some(ids), Some(sources)) => {
                let discovered = DiscoveredIds::from_parts(ids, sources).map_err(|id| {
                    CacheError::Inconsistent {
                        id,
                        path: sources_path.clone(),
                    }
                })?;
                info!(%console, count = discovered.len(), "loaded cached ids");
                Ok(Some(discovered))
            }
        }
    }

    /// Persist a full scan, replacing any previous one
    ///
    /// The map is written first and the id list is renamed into place last, so
    /// a crash mid-save never leaves a readable id list without its map.
    pub async fn save(&self, console: Console, discovered: &DiscoveredIds) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| CacheError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let ids_path = self.ids_path(console);
        let sources_path = self.sources_path(console);

        // An old id list must not survive next to a half-written map
        remove_if_exists(&ids_path).await?;

        write_json(&sources_path, discovered.sources()).await?;
        write_json(&ids_path, &discovered.ids()).await?;

        info!(%console, count = discovered.len(), ?ids_path, "cached discovered ids");
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(CacheError::Io {
                path: path.to_path_buf(),
                source,
            }
            .into());
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| {
            CacheError::Parse {
                path: path.to_path_buf(),
                source,
            }
            .into()
        })
}

async fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec(value)?;
    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &json)
        .await
        .map_err(|source| CacheError::Io {
            path: tmp_path.clone(),
            source,
        })?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(())
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
        .into()),
    }
}
