//! Mock catalog pages and archive payloads

use std::io::Write;
use tempfile::TempDir;
use vault_dl::Console;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Listing page linking to each detail token
pub fn listing_page(tokens: &[&str]) -> String {
    let rows: String = tokens
        .iter()
        .map(|t| {
            format!(
                r#"<tr><td style="width:auto"><a href="/vault/{t}" onmouseover="">Game {t}</a></td></tr>"#
            )
        })
        .collect();
    format!(
        r#"<!DOCTYPE html><html><body><table class="rounded centered cellpadding1 hovertable striped">{rows}</table></body></html>"#
    )
}

/// Detail page carrying the media id marker
pub fn detail_page(media_id: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><script>
        var allMedia = [{{"ID":{media_id},"GoodTitle":"R2FtZQ==","Version":"1.1","SortOrder":1}}];
        </script></head><body></body></html>"#
    )
}

/// In-memory ZIP archive
pub fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// 7z archive built from a temporary directory tree
pub fn sevenz_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let src = TempDir::new().unwrap();
    for (name, content) in files {
        let file = src.path().join(name);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(file, content).unwrap();
    }
    let out = TempDir::new().unwrap();
    let archive = out.path().join("fixture.7z");
    sevenz_rust::compress_to_path(src.path(), &archive).unwrap();
    std::fs::read(archive).unwrap()
}

/// Builder for a mock catalog plus download host on one server
pub struct MockCatalog<'a> {
    server: &'a MockServer,
    console: Console,
}

impl<'a> MockCatalog<'a> {
    /// Catalog for `console` on `server`
    pub fn new(server: &'a MockServer, console: Console) -> Self {
        Self { server, console }
    }

    /// Serve a letter page, expecting it to be requested `times` times
    pub async fn letter(&self, letter: char, tokens: &[&str], times: u64) -> &Self {
        Mock::given(method("GET"))
            .and(path(format!(
                "/vault/{}/{}",
                self.console.system_name(),
                letter
            )))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(tokens)))
            .expect(times)
            .mount(self.server)
            .await;
        self
    }

    /// Serve the numeric section page
    pub async fn numeric(&self, tokens: &[&str], times: u64) -> &Self {
        Mock::given(method("GET"))
            .and(path("/vault/"))
            .and(query_param("p", "list"))
            .and(query_param("system", self.console.system_name()))
            .and(query_param("section", "number"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(tokens)))
            .expect(times)
            .mount(self.server)
            .await;
        self
    }

    /// Serve a detail page resolving `token` to `media_id`
    pub async fn detail(&self, token: &str, media_id: &str) -> &Self {
        Mock::given(method("GET"))
            .and(path(format!("/vault/{}", token)))
            .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(media_id)))
            .mount(self.server)
            .await;
        self
    }

    /// Serve an archive for `media_id`
    pub async fn archive(
        &self,
        media_id: &str,
        filename: &str,
        content_type: &str,
        body: Vec<u8>,
        times: u64,
    ) -> &Self {
        Mock::given(method("GET"))
            .and(path("/download/"))
            .and(query_param("mediaId", media_id))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", content_type)
                    .insert_header(
                        "Content-Disposition",
                        format!(r#"attachment; filename="{}""#, filename),
                    )
                    .set_body_bytes(body),
            )
            .expect(times)
            .mount(self.server)
            .await;
        self
    }

    /// Answer downloads of `media_id` with `status`
    pub async fn archive_status(&self, media_id: &str, status: u16, times: u64) -> &Self {
        Mock::given(method("GET"))
            .and(path("/download/"))
            .and(query_param("mediaId", media_id))
            .respond_with(ResponseTemplate::new(status))
            .expect(times)
            .mount(self.server)
            .await;
        self
    }
}
