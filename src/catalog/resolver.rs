use crate::config::CatalogConfig;
use crate::error::{Error, ResolveError, Result};
use crate::failure_log::FailureLog;
use crate::types::{DiscoveredIds, Event, ResourceId};
use regex::Regex;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::compile_pattern;

/// Turns detail page urls into resource ids
#[derive(Clone, Debug)]
pub struct EntryResolver {
    client: reqwest::Client,
    page_delay: Duration,
    page_timeout: Duration,
    media_id_pattern: Regex,
}

impl EntryResolver {
    /// Create a resolver sharing `client`
    ///
    /// # Errors
    /// Returns a configuration error if the media id pattern does not compile
    pub fn new(client: reqwest::Client, config: &CatalogConfig) -> Result<Self> {
        Ok(Self {
            client,
            page_delay: config.page_delay,
            page_timeout: config.page_timeout,
            media_id_pattern: compile_pattern(
                &config.media_id_pattern,
                "catalog.media_id_pattern",
            )?,
        })
    }

    /// First media id embedded in a detail page
    pub fn extract_resource_id(&self, html: &str) -> Option<ResourceId> {
        self.media_id_pattern
            .captures(html)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Fetch one detail page and extract its media id
    pub async fn resolve(&self, detail_url: &str) -> std::result::Result<ResourceId, ResolveError> {
        tokio::time::sleep(self.page_delay).await;

        let response = self
            .client
            .get(detail_url)
            .timeout(self.page_timeout)
            .send()
            .await
            .map_err(|source| ResolveError::Network {
                url: detail_url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Status {
                url: detail_url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|source| ResolveError::Network {
                url: detail_url.to_string(),
                source,
            })?;

        self.extract_resource_id(&html)
            .ok_or_else(|| ResolveError::MarkerNotFound {
                url: detail_url.to_string(),
            })
    }

    /// Resolve every url in order, skipping and logging the ones that fail
    ///
    /// Repeated ids keep their first position and first source url.
    ///
    /// # Errors
    /// Returns [`Error::Cancelled`] if `cancel` fires between pages. Nothing
    /// resolved so far is returned, so a partial scan is never cached.
    pub async fn resolve_all(
        &self,
        detail_urls: &[String],
        failure_log: &FailureLog,
        cancel: &CancellationToken,
        event_tx: &broadcast::Sender<Event>,
    ) -> Result<DiscoveredIds> {
        let total = detail_urls.len();
        info!(total, "resolving media ids from detail pages");

        let mut discovered = DiscoveredIds::new();
        for (i, url) in detail_urls.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(resolved = discovered.len(), remaining = total - i, "resolution cancelled");
                return Err(Error::Cancelled);
            }

            let index = i + 1;
            match self.resolve(url).await {
                Ok(id) => {
                    info!(index, total, url, %id, "resolved media id");
                    if !discovered.insert(id.clone(), url.clone()) {
                        debug!(url, %id, "duplicate media id, keeping first source");
                    }
                    event_tx
                        .send(Event::Resolved {
                            index,
                            total,
                            url: url.clone(),
                            id,
                        })
                        .ok();
                }
                Err(e) => {
                    warn!(index, total, url, error = %e, "failed to find media id");
                    failure_log.record(url).await;
                    event_tx
                        .send(Event::ResolveFailed {
                            index,
                            total,
                            url: url.clone(),
                            error: e.to_string(),
                        })
                        .ok();
                }
            }
        }

        info!(resolved = discovered.len(), total, "finished resolving media ids");
        Ok(discovered)
    }
}
