use crate::config::CatalogConfig;
use crate::error::Result;
use crate::types::Console;
use futures::stream::{self, Stream, StreamExt};
use regex::Regex;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{LetterRange, compile_pattern, detail_url};

/// Walks a console's listing pages and yields detail page urls
#[derive(Clone, Debug)]
pub struct CatalogScanner {
    client: reqwest::Client,
    base_url: String,
    page_delay: Duration,
    page_timeout: Duration,
    entry_pattern: Regex,
}

impl CatalogScanner {
    /// Create a scanner sharing `client`
    ///
    /// # Errors
    /// Returns a configuration error if the entry pattern does not compile
    pub fn new(client: reqwest::Client, config: &CatalogConfig) -> Result<Self> {
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_delay: config.page_delay,
            page_timeout: config.page_timeout,
            entry_pattern: compile_pattern(&config.entry_pattern, "catalog.entry_pattern")?,
        })
    }

    /// Listing pages for a console: one per letter, then the numeric section
    pub fn listing_urls(&self, console: Console, letters: LetterRange) -> Vec<String> {
        let system = console.system_name();
        let mut urls: Vec<String> = letters
            .letters()
            .map(|letter| format!("{}/vault/{}/{}", self.base_url, system, letter))
            .collect();
        urls.push(format!(
            "{}/vault/?p=list&system={}&section=number",
            self.base_url, system
        ));
        urls
    }

    /// Detail page urls found on a listing page, in page order
    pub fn extract_entry_urls(&self, html: &str) -> Vec<String> {
        self.entry_pattern
            .captures_iter(html)
            .filter_map(|caps| caps.get(1))
            .map(|token| detail_url(&self.base_url, token.as_str()))
            .collect()
    }

    /// Lazily fetch every listing page and yield the detail urls on them
    ///
    /// Pages are requested one at a time as the stream is polled. The stream
    /// cannot be restarted; scanning again issues every request again.
    pub fn scan(
        &self,
        console: Console,
        letters: LetterRange,
    ) -> impl Stream<Item = String> + '_ {
        let pages = self.listing_urls(console, letters);
        let total = pages.len();
        info!(%console, pages = total, "scanning catalog listing pages");

        stream::iter(pages.into_iter().enumerate())
            .then(move |(i, url)| async move { self.scan_page(i + 1, total, &url).await })
            .flat_map(stream::iter)
    }

    /// Fetch one listing page; an unreachable page yields nothing
    async fn scan_page(&self, page: usize, total: usize, url: &str) -> Vec<String> {
        tokio::time::sleep(self.page_delay).await;
        info!(page, total, url, "fetching listing page");

        let response = self
            .client
            .get(url)
            .timeout(self.page_timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        let body = match response {
            Ok(response) => response.text().await,
            Err(e) => Err(e),
        };

        match body {
            Ok(html) => {
                let entries = self.extract_entry_urls(&html);
                debug!(page, url, entries = entries.len(), "listing page scanned");
                entries
            }
            Err(e) => {
                warn!(page, url, error = %e, "listing page unreachable, skipping");
                Vec::new()
            }
        }
    }
}
