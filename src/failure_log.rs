//! Append-only record of urls that could not be resolved or downloaded.
//!
//! One plain-text file per console, one url per line. The tool never reads
//! it back; it exists so failed titles can be retried by hand.

use crate::error::Result;
use crate::types::Console;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Failure log for one console
#[derive(Clone, Debug)]
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    /// Log file `failed_game_downloads_<System>.txt` under `failed_dir`
    pub fn new(failed_dir: &Path, console: Console) -> Self {
        Self {
            path: failed_dir.join(format!("failed_game_downloads_{}.txt", console.system_name())),
        }
    }

    /// Where lines are appended
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one url
    pub async fn append(&self, url: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{}\n", url).as_bytes()).await?;
        file.flush().await?;
        debug!(path = ?self.path, url, "recorded failure");
        Ok(())
    }

    /// Append one url, logging instead of failing if the log itself is unwritable
    pub async fn record(&self, url: &str) {
        if let Err(e) = self.append(url).await {
            warn!(path = ?self.path, url, error = %e, "could not write failure log");
        }
    }
}
