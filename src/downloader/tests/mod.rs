//! Orchestrator tests against a mock catalog and download host.

use crate::config::Config;
use crate::downloader::VaultDownloader;
use crate::types::{Console, Event, ResourceId};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};


// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Config pointing every url at `server` and every directory under `root`
///
/// Letters are limited to `A`, delays are zero, and the blocklist is empty.
fn test_config(server: &MockServer, root: &Path) -> Config {
    let mut config = Config::default();
    config.catalog.base_url = server.uri();
    config.catalog.first_letter = 'A';
    config.catalog.last_letter = 'A';
    config.catalog.page_delay = Duration::ZERO;
    config.download.download_delay = Duration::ZERO;
    config.download.hosts.insert("ps1".to_string(), server.uri());
    config.download.download_dir = Some(root.join("games"));
    config.download.blocklist = Vec::new();
    config.persistence.cache_dir = root.join("cache");
    config.persistence.failed_dir = root.join("failed");
    config
}

async fn create_test_downloader(config: Config) -> VaultDownloader {
    VaultDownloader::new(config, Console::Ps1).await.unwrap()
}

fn listing_page(tokens: &[&str]) -> String {
    let rows: String = tokens
        .iter()
        .map(|t| format!(r#"<tr><td><a href="/vault/{t}">Title {t}</a></td></tr>"#))
        .collect();
    format!("<html><body><table>{rows}</table></body></html>")
}

fn detail_page(media_id: &str) -> String {
    format!(r#"<html><script>var allMedia = [{{"ID":{media_id},"Version":"1.0"}}];</script></html>"#)
}

/// Serve the `A` listing page with `tokens`, an empty numeric page, and one
/// detail page per `(token, media_id)` pair
async fn mount_catalog(server: &MockServer, tokens: &[&str], details: &[(&str, &str)]) {
    Mock::given(method("GET"))
        .and(path("/vault/PS1/A"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(tokens)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vault/"))
        .and(query_param("section", "number"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[])))
        .mount(server)
        .await;
    for (token, media_id) in details {
        Mock::given(method("GET"))
            .and(path(format!("/vault/{}", token)))
            .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(media_id)))
            .mount(server)
            .await;
    }
}

/// Serve a ZIP for `media_id` named `<title>.zip`, expecting exactly `times` downloads
async fn mount_archive(server: &MockServer, media_id: &str, title: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path("/download/"))
        .and(query_param("mediaId", media_id))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/zip")
                .insert_header(
                    "Content-Disposition",
                    format!(r#"attachment; filename="{}.zip""#, title),
                )
                .set_body_bytes(zip_bytes(&[("game.bin", media_id.as_bytes())])),
        )
        .expect(times)
        .mount(server)
        .await;
}

fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ::zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options =
        ::zip::write::FileOptions::default().compression_method(::zip::CompressionMethod::Stored);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        std::io::Write::write_all(&mut writer, content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn id(s: &str) -> ResourceId {
    s.parse().unwrap()
}

/// Everything buffered on a receiver
fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn read_failure_log(downloader: &VaultDownloader) -> String {
    std::fs::read_to_string(downloader.failure_log().path()).unwrap_or_default()
}
