//! Configuration types for vault-dl

use crate::error::{Error, Result};
use crate::types::{Console, ResourceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Catalog scraping settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Catalog site root (default: "https://vimm.net")
    #[serde(default = "default_catalog_url")]
    pub base_url: String,

    /// First letter of the listing range, inclusive (default: 'A')
    #[serde(default = "default_first_letter")]
    pub first_letter: char,

    /// Last letter of the listing range, inclusive (default: 'Z')
    #[serde(default = "default_last_letter")]
    pub last_letter: char,

    /// Pause before every listing or detail page request (default: 500 ms)
    #[serde(default = "default_page_delay", with = "duration_ms_serde")]
    pub page_delay: Duration,

    /// Per-request timeout for catalog pages (default: 30 s)
    #[serde(default = "default_page_timeout", with = "duration_ms_serde")]
    pub page_timeout: Duration,

    /// Pattern locating entry tokens on a listing page; group 1 is the token
    #[serde(default = "default_entry_pattern")]
    pub entry_pattern: String,

    /// Pattern locating the media id on a detail page; group 1 is the id
    #[serde(default = "default_media_id_pattern")]
    pub media_id_pattern: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_url(),
            first_letter: default_first_letter(),
            last_letter: default_last_letter(),
            page_delay: default_page_delay(),
            page_timeout: default_page_timeout(),
            entry_pattern: default_entry_pattern(),
            media_id_pattern: default_media_id_pattern(),
        }
    }
}

/// Archive download settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Output root (default: "games/<System>")
    #[serde(default)]
    pub download_dir: Option<PathBuf>,

    /// Download host per console, keyed by CLI key (`ps1`, `gc`, ...)
    #[serde(default = "default_download_hosts")]
    pub hosts: BTreeMap<String, String>,

    /// Host used for consoles missing from `hosts`
    #[serde(default = "default_fallback_host")]
    pub fallback_host: String,

    /// Pause before every archive request (default: 5000 ms)
    #[serde(default = "default_download_delay", with = "duration_ms_serde")]
    pub download_delay: Duration,

    /// Resource ids that are never downloaded (default: ["29"])
    #[serde(default = "default_blocklist")]
    pub blocklist: Vec<ResourceId>,

    /// Skip every id that precedes this one in discovery order
    #[serde(default)]
    pub resume_from: Option<ResourceId>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: None,
            hosts: default_download_hosts(),
            fallback_host: default_fallback_host(),
            download_delay: default_download_delay(),
            blocklist: default_blocklist(),
            resume_from: None,
        }
    }
}

/// Header profile attached to outgoing requests
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestConfig {
    /// User-Agent for every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Referer sent with archive requests
    #[serde(default = "default_referer")]
    pub referer: String,

    /// Cookie sent with archive requests. Session cookies expire; supply a fresh one.
    #[serde(default)]
    pub cookie: Option<String>,

    /// TCP connect timeout (default: 30 s)
    #[serde(default = "default_connect_timeout", with = "duration_ms_serde")]
    pub connect_timeout: Duration,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            referer: default_referer(),
            cookie: None,
            connect_timeout: default_connect_timeout(),
        }
    }
}

/// How the unpacker decides which archive format a payload is
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MimeDetection {
    /// Trust the Content-Type header only
    Declared,
    /// Inspect magic bytes only
    Sniff,
    /// Trust Content-Type, sniff when it is missing or generic
    #[default]
    DeclaredThenSniff,
}

/// Extraction settings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Format detection strategy
    #[serde(default)]
    pub mime_detection: MimeDetection,
}

/// On-disk state locations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Identifier cache directory (default: "cache")
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Failure log directory (default: "failed")
    #[serde(default = "default_failed_dir")]
    pub failed_dir: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            failed_dir: default_failed_dir(),
        }
    }
}

/// Main configuration for VaultDownloader
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Catalog scraping
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Archive downloads
    #[serde(default)]
    pub download: DownloadConfig,

    /// Request header profile
    #[serde(default)]
    pub request: RequestConfig,

    /// Extraction
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Cache and failure log locations
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Config {
    /// Parse a TOML configuration document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Load a TOML configuration file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to read config file '{}': {}", path.display(), e),
            ))
        })?;
        Self::from_toml_str(&source)
    }

    /// Output root for a console: the configured directory or `games/<System>`
    pub fn download_dir(&self, console: Console) -> PathBuf {
        self.download
            .download_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("games").join(console.system_name()))
    }

    /// Check settings that would otherwise fail halfway through a run
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.catalog.base_url).map_err(|e| {
            Error::config(
                format!("invalid catalog url '{}': {}", self.catalog.base_url, e),
                "catalog.base_url",
            )
        })?;
        for (console, host) in &self.download.hosts {
            console
                .parse::<Console>()
                .map_err(|e| Error::config(e, "download.hosts"))?;
            url::Url::parse(host).map_err(|e| {
                Error::config(
                    format!("invalid download host '{}' for {}: {}", host, console, e),
                    "download.hosts",
                )
            })?;
        }
        url::Url::parse(&self.download.fallback_host).map_err(|e| {
            Error::config(
                format!(
                    "invalid fallback host '{}': {}",
                    self.download.fallback_host, e
                ),
                "download.fallback_host",
            )
        })?;
        crate::catalog::LetterRange::new(self.catalog.first_letter, self.catalog.last_letter)?;
        crate::catalog::compile_pattern(&self.catalog.entry_pattern, "catalog.entry_pattern")?;
        crate::catalog::compile_pattern(
            &self.catalog.media_id_pattern,
            "catalog.media_id_pattern",
        )?;
        Ok(())
    }
}

fn default_catalog_url() -> String {
    "https://vimm.net".to_string()
}

fn default_first_letter() -> char {
    'A'
}

fn default_last_letter() -> char {
    'Z'
}

fn default_page_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_page_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_entry_pattern() -> String {
    r"/vault/(\d+)".to_string()
}

fn default_media_id_pattern() -> String {
    r#"var\s+allMedia\s*=\s*\[\s*\{\s*"ID"\s*:\s*(\d+)\s*,"#.to_string()
}

fn default_download_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_fallback_host() -> String {
    "https://download3.vimm.net".to_string()
}

fn default_download_hosts() -> BTreeMap<String, String> {
    let download2 = "https://download2.vimm.net";
    let download3 = "https://download3.vimm.net";
    Console::ALL
        .into_iter()
        .map(|console| {
            let host = match console {
                Console::Ps2 | Console::Xbox => download2,
                Console::N64
                | Console::Ps1
                | Console::GameCube
                | Console::Ps3
                | Console::Nes
                | Console::Snes => download3,
            };
            (console.cli_key().to_string(), host.to_string())
        })
        .collect()
}

fn default_blocklist() -> Vec<ResourceId> {
    vec![ResourceId::from_static("29")]
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64; rv:126.0) Gecko/20100101 Firefox/126.0".to_string()
}

fn default_referer() -> String {
    "https://vimm.net/".to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_failed_dir() -> PathBuf {
    PathBuf::from("failed")
}

// Duration serialization helper (milliseconds; catalog delays are sub-second)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
