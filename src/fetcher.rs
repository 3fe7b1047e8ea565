//! Archive download
//!
//! Builds the shared HTTP client with the browser header profile and fetches
//! one archive per [`ResourceId`] into memory.

use crate::config::{DownloadConfig, RequestConfig};
use crate::error::{Error, FetchError, Result};
use crate::types::{Console, Payload, ResourceId};
use crate::utils::title_from_content_disposition;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bytes received between two progress reports
pub const PROGRESS_BLOCK: u64 = 1024 * 1024;

/// Build the HTTP client shared by the scanner, resolver and fetcher
///
/// Every request carries the User-Agent and the generic browser headers.
/// The download profile (Referer, `Sec-Fetch-*`, Cookie) is attached per
/// request by [`ArchiveFetcher`], so catalog pages never see the cookie.
pub fn build_client(config: &RequestConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(Error::Network)
}

fn download_headers(config: &RequestConfig) -> Result<HeaderMap> {
    let value = |raw: &str, key: &str| {
        HeaderValue::from_str(raw)
            .map_err(|e| Error::config(format!("invalid header value: {}", e), key))
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::REFERER, value(&config.referer, "request.referer")?);
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("same-site"));
    headers.insert("Sec-Fetch-User", HeaderValue::from_static("?1"));
    if let Some(cookie) = &config.cookie {
        headers.insert(header::COOKIE, value(cookie, "request.cookie")?);
    }
    Ok(headers)
}

/// Downloads archives from the per-console download hosts
#[derive(Clone, Debug)]
pub struct ArchiveFetcher {
    client: reqwest::Client,
    headers: HeaderMap,
    hosts: HashMap<Console, String>,
    fallback_host: String,
    download_delay: Duration,
}

impl ArchiveFetcher {
    /// Create a fetcher sharing `client`
    ///
    /// Host table keys may be either CLI keys (`ps2`) or system names (`PS2`).
    /// The referer and cookie in `request` are sent with archive requests only.
    pub fn new(
        client: reqwest::Client,
        request: &RequestConfig,
        config: &DownloadConfig,
    ) -> Result<Self> {
        let mut hosts = HashMap::new();
        for (key, host) in &config.hosts {
            let console: Console = key.parse().map_err(|e: String| {
                Error::config(e, format!("download.hosts.{}", key))
            })?;
            hosts.insert(console, host.trim_end_matches('/').to_string());
        }

        Ok(Self {
            client,
            headers: download_headers(request)?,
            hosts,
            fallback_host: config.fallback_host.trim_end_matches('/').to_string(),
            download_delay: config.download_delay,
        })
    }

    /// Download host for a console
    pub fn host_for(&self, console: Console) -> &str {
        match self.hosts.get(&console) {
            Some(host) => host,
            None => {
                warn!(
                    %console,
                    fallback = %self.fallback_host,
                    "no download host mapped for console, using fallback"
                );
                &self.fallback_host
            }
        }
    }

    /// Download url for one resource
    pub fn download_url(&self, id: &ResourceId, console: Console) -> String {
        format!("{}/download/?mediaId={}", self.host_for(console), id)
    }

    /// Fetch one archive into memory
    ///
    /// Sleeps the configured download delay first. `progress` receives the
    /// running byte count and the declared length after every
    /// [`PROGRESS_BLOCK`] bytes and once more when the body is complete.
    pub async fn fetch<F>(
        &self,
        id: &ResourceId,
        console: Console,
        mut progress: F,
    ) -> std::result::Result<Payload, FetchError>
    where
        F: FnMut(u64, Option<u64>),
    {
        let url = self.download_url(id, console);
        tokio::time::sleep(self.download_delay).await;
        info!(resource_id = %id, %url, "downloading archive");

        let mut response = self
            .client
            .get(&url)
            .headers(self.headers.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let content_type = header_str(response.headers(), header::CONTENT_TYPE);
        let title = header_str(response.headers(), header::CONTENT_DISPOSITION)
            .as_deref()
            .and_then(title_from_content_disposition)
            .unwrap_or_else(|| id.to_string());
        let content_length = response.content_length();

        let capacity = content_length.unwrap_or(0).min(PROGRESS_BLOCK * 64) as usize;
        let mut bytes = Vec::with_capacity(capacity);
        let mut next_report = PROGRESS_BLOCK;

        while let Some(chunk) = response.chunk().await? {
            bytes.extend_from_slice(&chunk);
            let received = bytes.len() as u64;
            if received >= next_report {
                progress(received, content_length);
                next_report = (received / PROGRESS_BLOCK + 1) * PROGRESS_BLOCK;
            }
        }
        progress(bytes.len() as u64, content_length);

        debug!(
            resource_id = %id,
            %title,
            size = bytes.len(),
            content_type = content_type.as_deref().unwrap_or(""),
            "archive downloaded"
        );

        Ok(Payload {
            resource_id: id.clone(),
            title,
            content_type,
            content_length,
            bytes,
        })
    }
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
