//! Error types for vault-dl
//!
//! Errors are split by pipeline stage so that callers can tell run-level
//! failures (bad configuration, corrupt cache, unknown resume id) apart from
//! per-item failures (one detail page, one download, one archive) that the
//! batch records and skips.

use crate::types::ResourceId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for vault-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for vault-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "catalog.first_letter")
        key: Option<String>,
    },

    /// Configuration file could not be parsed
    #[error("invalid configuration file: {0}")]
    ConfigFile(#[from] toml::de::Error),

    /// Identifier cache is unreadable or inconsistent
    #[error("identifier cache error: {0}")]
    Cache(#[from] CacheError),

    /// Detail page could not be resolved to a resource id
    #[error("resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Archive download failed
    #[error("download error: {0}")]
    Fetch(#[from] FetchError),

    /// Archive could not be unpacked
    #[error("unpack error: {0}")]
    Unpack(#[from] UnpackError),

    /// The resume cursor does not occur in the discovered id list
    #[error("resume id {0} is not among the discovered ids")]
    ResumeIdNotFound(ResourceId),

    /// The run was cancelled before it finished
    #[error("run cancelled")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a configuration error tied to a config key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Identifier cache errors
///
/// A missing cache is not an error (it just triggers a rescan); these cover
/// the cases where something is on disk but cannot be trusted.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A cache file exists but does not contain the expected JSON
    #[error("cache file {path} is malformed: {source}")]
    Parse {
        /// The offending cache file
        path: PathBuf,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Only one of the two cache files is present
    #[error("cache is incomplete: {present} exists but {missing} does not")]
    Partial {
        /// The file that was found
        present: PathBuf,
        /// The file that is missing
        missing: PathBuf,
    },

    /// The id list and the source map disagree
    #[error("cache is inconsistent: id {id} has no source url in {path}")]
    Inconsistent {
        /// Id without a source url
        id: ResourceId,
        /// The source map file
        path: PathBuf,
    },

    /// Reading or writing a cache file failed
    #[error("cache I/O on {path}: {source}")]
    Io {
        /// The cache file involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors resolving a detail page to its resource id
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The detail page request failed
    #[error("request for {url} failed: {source}")]
    Network {
        /// Detail page url
        url: String,
        /// Underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// The detail page answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Detail page url
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The page loaded but carries no media id marker
    #[error("no media id found on {url}")]
    MarkerNotFound {
        /// Detail page url
        url: String,
    },
}

/// Archive download errors
#[derive(Debug, Error)]
pub enum FetchError {
    /// The download host answered with a non-success status
    #[error("HTTP {status} {reason}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Canonical reason phrase
        reason: String,
    },

    /// The request or the body stream failed
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
}

impl FetchError {
    /// HTTP status of the failed response, if there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Network(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

/// Archive unpacking errors
#[derive(Debug, Error)]
pub enum UnpackError {
    /// The payload is neither ZIP nor 7z
    #[error("unrecognized file type: {}", .mime_type.as_deref().unwrap_or("<none>"))]
    UnrecognizedFormat {
        /// Declared MIME type, if any
        mime_type: Option<String>,
    },

    /// The archive library rejected the payload
    #[error("failed to extract {title}: {reason}")]
    ExtractionFailed {
        /// Title directory being extracted into
        title: String,
        /// Reason reported by the archive library
        reason: String,
    },

    /// An extracted file landed outside the destination directory
    #[error("path traversal detected: {path} is outside {dest}")]
    PathTraversal {
        /// Offending path
        path: PathBuf,
        /// Destination directory
        dest: PathBuf,
    },

    /// Filesystem error while writing extracted files
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
