//! Id discovery: cached ids, or a full scan and resolution.

use crate::catalog::LetterRange;
use crate::error::{Error, Result};
use crate::types::{DiscoveredIds, Event};
use futures::StreamExt;
use tracing::{info, warn};

use super::VaultDownloader;

impl VaultDownloader {
    /// Discover every resource id for the console
    ///
    /// Cached ids are returned without touching the network. Otherwise every
    /// listing page is scanned, every detail page resolved, and the result
    /// cached. A rescan ignores the cache but only replaces it once the new
    /// discovery completes; a cancelled or failed discovery leaves it as is.
    ///
    /// # Errors
    /// Cache read/write errors, a bad letter range, or [`Error::Cancelled`].
    pub async fn discover(&self) -> Result<DiscoveredIds> {
        let console = self.console;

        if !self.rescan
            && let Some(cached) = self.cache.load(console).await?
        {
            info!(%console, count = cached.len(), "using cached ids, skipping catalog scan");
            self.emit(Event::UsingCache {
                console,
                count: cached.len(),
            });
            return Ok(cached);
        }

        let catalog = &self.config.catalog;
        let letters = LetterRange::new(catalog.first_letter, catalog.last_letter)?;
        let pages = self.scanner.listing_urls(console, letters).len();
        self.emit(Event::Scanning { console, pages });

        let detail_urls: Vec<String> = self
            .scanner
            .scan(console, letters)
            .take_until(self.cancel_token.cancelled())
            .collect()
            .await;

        if self.cancel_token.is_cancelled() {
            warn!(%console, found = detail_urls.len(), "catalog scan cancelled");
            return Err(Error::Cancelled);
        }
        info!(%console, detail_pages = detail_urls.len(), "catalog scan complete");

        let discovered = self
            .resolver
            .resolve_all(
                &detail_urls,
                &self.failure_log,
                &self.cancel_token,
                &self.event_tx,
            )
            .await?;

        self.cache.save(console, &discovered).await?;
        Ok(discovered)
    }
}
