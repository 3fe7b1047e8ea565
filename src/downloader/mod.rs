//! Batch orchestration split into focused submodules.
//!
//! The `VaultDownloader` struct and its methods are organized by stage:
//! - [`discovery`] - Cached ids or a full catalog scan and resolution
//! - [`batch`] - Filtering and the sequential fetch/unpack loop

mod batch;
mod discovery;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::cache::IdentifierCache;
use crate::catalog::{CatalogScanner, EntryResolver};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::failure_log::FailureLog;
use crate::fetcher::{ArchiveFetcher, build_client};
use crate::types::{Console, Event};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Capacity of the event channel; slow subscribers lag rather than block the run
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Downloads every archive of one console (cloneable - all fields are shared)
#[derive(Clone)]
pub struct VaultDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Console this downloader works on
    pub(crate) console: Console,
    /// Ignore the id cache and scan the catalog again
    pub(crate) rescan: bool,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Cancels the run between items
    pub(crate) cancel_token: CancellationToken,
    pub(crate) cache: IdentifierCache,
    pub(crate) failure_log: FailureLog,
    pub(crate) scanner: CatalogScanner,
    pub(crate) resolver: EntryResolver,
    pub(crate) fetcher: ArchiveFetcher,
}

impl VaultDownloader {
    /// Create a downloader for one console
    ///
    /// Validates the configuration and creates the output directory, so a bad
    /// letter range or an unwritable destination fails before any request.
    pub async fn new(config: Config, console: Console) -> Result<Self> {
        config.validate()?;

        let download_dir = config.download_dir(console);
        tokio::fs::create_dir_all(&download_dir).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "failed to create download directory '{}': {}",
                    download_dir.display(),
                    e
                ),
            ))
        })?;

        let client = build_client(&config.request)?;
        let scanner = CatalogScanner::new(client.clone(), &config.catalog)?;
        let resolver = EntryResolver::new(client.clone(), &config.catalog)?;
        let fetcher = ArchiveFetcher::new(client, &config.request, &config.download)?;

        let cache = IdentifierCache::new(config.persistence.cache_dir.clone());
        let failure_log = FailureLog::new(&config.persistence.failed_dir, console);

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        tracing::info!(
            %console,
            download_dir = %download_dir.display(),
            "downloader ready"
        );

        Ok(Self {
            config: Arc::new(config),
            console,
            rescan: false,
            event_tx,
            cancel_token: CancellationToken::new(),
            cache,
            failure_log,
            scanner,
            resolver,
            fetcher,
        })
    }

    /// Force a fresh catalog scan instead of loading cached ids
    pub fn with_rescan(mut self, rescan: bool) -> Self {
        self.rescan = rescan;
        self
    }

    /// Subscribe to progress events
    ///
    /// Events emitted before subscribing are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Token that stops the run before the next item when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Stop the run before the next item
    ///
    /// The item in flight is allowed to finish.
    pub fn cancel(&self) {
        tracing::info!(console = %self.console, "cancellation requested");
        self.cancel_token.cancel();
    }

    /// Console this downloader works on
    pub fn console(&self) -> Console {
        self.console
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Root directory titles are unpacked into
    pub fn download_dir(&self) -> PathBuf {
        self.config.download_dir(self.console)
    }

    /// Where failed urls are appended
    pub fn failure_log(&self) -> &FailureLog {
        &self.failure_log
    }

    /// Emit an event; having no subscribers is not an error
    pub(crate) fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
