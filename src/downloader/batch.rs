//! The sequential fetch/unpack loop.

use crate::error::{Error, Result};
use crate::extraction;
use crate::filter::filter_ids;
use crate::types::{Event, ResourceId, RunSummary, SourceUrlMap, Stage};
use crate::utils::format_bytes;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

use super::VaultDownloader;

/// Where one item ended up
struct Unpacked {
    path: PathBuf,
    files: usize,
}

impl VaultDownloader {
    /// Discover, filter, then download and unpack every remaining id
    ///
    /// Per-item failures are logged, recorded in the failure log and
    /// counted in the summary; they never abort the run.
    ///
    /// # Errors
    /// Run-level failures only: discovery errors, a resume id that was not
    /// discovered, or cancellation during discovery.
    pub async fn run(&self) -> Result<RunSummary> {
        let discovered = self.discover().await?;

        let download = &self.config.download;
        let queue = filter_ids(
            discovered.ids(),
            &download.blocklist,
            download.resume_from.as_ref(),
        )?;
        info!(
            console = %self.console,
            discovered = discovered.len(),
            queued = queue.len(),
            "filtered id list"
        );

        Ok(self.download_all(&queue, discovered.sources()).await)
    }

    /// Download and unpack `ids` in order
    ///
    /// Cancellation is checked before each item; the item in flight always
    /// finishes.
    pub async fn download_all(&self, ids: &[ResourceId], sources: &SourceUrlMap) -> RunSummary {
        let started = Instant::now();
        let total = ids.len();
        let destination_root = self.download_dir();
        let mut summary = RunSummary {
            total,
            ..Default::default()
        };

        self.emit(Event::BatchStarted { total });

        for (i, id) in ids.iter().enumerate() {
            if self.cancel_token.is_cancelled() {
                summary.cancelled = total - i;
                warn!(remaining = summary.cancelled, "run cancelled, stopping before next item");
                self.emit(Event::Cancelled {
                    remaining: summary.cancelled,
                });
                break;
            }

            let index = i + 1;
            let at = Utc::now();
            info!(index, total, resource_id = %id, "starting item");
            self.emit(Event::ItemStarted {
                index,
                total,
                id: id.clone(),
                at,
            });

            match self.process_item(id, &destination_root).await {
                Ok(unpacked) => {
                    summary.succeeded += 1;
                    info!(
                        resource_id = %id,
                        path = %unpacked.path.display(),
                        files = unpacked.files,
                        "item complete"
                    );
                    self.emit(Event::ItemComplete {
                        id: id.clone(),
                        path: unpacked.path,
                        files: unpacked.files,
                    });
                }
                Err((stage, e)) => {
                    summary.failed += 1;
                    let url = sources
                        .get(id)
                        .cloned()
                        .unwrap_or_else(|| self.fetcher.download_url(id, self.console));
                    warn!(resource_id = %id, ?stage, %url, error = %e, "item failed, skipping");
                    self.failure_log.record(&url).await;
                    self.emit(Event::ItemFailed {
                        id: id.clone(),
                        stage,
                        error: e.to_string(),
                    });
                }
            }
        }

        summary.elapsed = started.elapsed();
        summary.interrupted = self.cancel_token.is_cancelled();
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            cancelled = summary.cancelled,
            interrupted = summary.interrupted,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "run complete"
        );
        self.emit(Event::RunComplete(summary.clone()));
        summary
    }

    /// Fetch and unpack one id
    async fn process_item(
        &self,
        id: &ResourceId,
        destination_root: &Path,
    ) -> std::result::Result<Unpacked, (Stage, Error)> {
        let event_tx = self.event_tx.clone();
        let payload = self
            .fetcher
            .fetch(id, self.console, |received, total| {
                event_tx
                    .send(Event::Downloading {
                        id: id.clone(),
                        received,
                        total,
                    })
                    .ok();
            })
            .await
            .map_err(|e| (Stage::Fetch, Error::from(e)))?;

        info!(
            resource_id = %id,
            title = %payload.title,
            size = %format_bytes(payload.bytes.len() as u64),
            "download complete, unpacking"
        );

        let path = destination_root.join(&payload.title);
        let event_tx = self.event_tx.clone();
        let item = id.clone();
        let files = extraction::unpack(
            payload,
            destination_root,
            self.config.extraction.mime_detection,
            move |entry| {
                event_tx
                    .send(Event::Extracting {
                        id: item.clone(),
                        file: entry.name,
                        index: entry.index,
                        total: entry.total,
                    })
                    .ok();
            },
        )
        .await
        .map_err(|e| (Stage::Unpack, Error::from(e)))?;

        Ok(Unpacked {
            path,
            files: files.len(),
        })
    }
}
