//! Core types for vault-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Console family a catalog section and its downloads belong to
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Console {
    /// Microsoft Xbox
    Xbox,
    /// Sony PlayStation
    Ps1,
    /// Sony PlayStation 2
    Ps2,
    /// Sony PlayStation 3
    Ps3,
    /// Nintendo Entertainment System
    Nes,
    /// Super Nintendo
    Snes,
    /// Nintendo 64
    N64,
    /// Nintendo GameCube
    #[serde(rename = "gc")]
    GameCube,
}

impl Console {
    /// Every supported console, in CLI order
    pub const ALL: [Console; 8] = [
        Console::Xbox,
        Console::Ps1,
        Console::Ps2,
        Console::Ps3,
        Console::Nes,
        Console::Snes,
        Console::N64,
        Console::GameCube,
    ];

    /// Short key accepted on the command line (`ps1`, `gc`, ...)
    pub fn cli_key(&self) -> &'static str {
        match self {
            Console::Xbox => "xbox",
            Console::Ps1 => "ps1",
            Console::Ps2 => "ps2",
            Console::Ps3 => "ps3",
            Console::Nes => "nes",
            Console::Snes => "snes",
            Console::N64 => "n64",
            Console::GameCube => "gc",
        }
    }

    /// System name as the catalog spells it in listing urls
    pub fn system_name(&self) -> &'static str {
        match self {
            Console::Xbox => "Xbox",
            Console::Ps1 => "PS1",
            Console::Ps2 => "PS2",
            Console::Ps3 => "PS3",
            Console::Nes => "NES",
            Console::Snes => "SNES",
            Console::N64 => "N64",
            Console::GameCube => "GameCube",
        }
    }
}

impl std::fmt::Display for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.system_name())
    }
}

impl std::str::FromStr for Console {
    type Err = String;

    /// Accepts either the CLI key or the catalog system name, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Console::ALL
            .into_iter()
            .find(|c| c.cli_key().eq_ignore_ascii_case(s) || c.system_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let keys: Vec<&str> = Console::ALL.iter().map(|c| c.cli_key()).collect();
                format!("unknown console '{}', expected one of: {}", s, keys.join(", "))
            })
    }
}

/// Numeric identifier the download endpoint uses to locate one archive
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    /// Build from a literal known to be all digits
    pub(crate) fn from_static(digits: &'static str) -> Self {
        debug_assert!(!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()));
        Self(digits.to_string())
    }

    /// Borrow the digits
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A resource id must be a non-empty run of ASCII digits
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid resource id '{0}': expected digits only")]
pub struct ParseResourceIdError(pub String);

impl std::str::FromStr for ResourceId {
    type Err = ParseResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(ParseResourceIdError(s.to_string()))
        }
    }
}

impl TryFrom<String> for ResourceId {
    type Error = ParseResourceIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resource id → detail page it was discovered on
pub type SourceUrlMap = BTreeMap<ResourceId, String>;

/// Ordered resource ids together with where each one came from
///
/// Ids are unique and kept in first-seen order. Every id in `ids` has an
/// entry in `sources`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiscoveredIds {
    ids: Vec<ResourceId>,
    sources: SourceUrlMap,
}

impl DiscoveredIds {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from persisted parts, returning the first id lacking a source url
    pub fn from_parts(
        ids: Vec<ResourceId>,
        sources: SourceUrlMap,
    ) -> std::result::Result<Self, ResourceId> {
        let mut discovered = Self {
            ids: Vec::with_capacity(ids.len()),
            sources,
        };
        for id in ids {
            if !discovered.sources.contains_key(&id) {
                return Err(id);
            }
            if !discovered.ids.contains(&id) {
                discovered.ids.push(id);
            }
        }
        Ok(discovered)
    }

    /// Record a discovery. Returns `false` (and keeps the first source) for a repeat id.
    pub fn insert(&mut self, id: ResourceId, source_url: impl Into<String>) -> bool {
        if self.sources.contains_key(&id) {
            return false;
        }
        self.sources.insert(id.clone(), source_url.into());
        self.ids.push(id);
        true
    }

    /// Ids in discovery order
    pub fn ids(&self) -> &[ResourceId] {
        &self.ids
    }

    /// Full id → url map
    pub fn sources(&self) -> &SourceUrlMap {
        &self.sources
    }

    /// Detail page an id was discovered on
    pub fn source_url(&self, id: &ResourceId) -> Option<&str> {
        self.sources.get(id).map(String::as_str)
    }

    /// Number of discovered ids
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing was discovered
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Archive formats the unpacker understands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveType {
    /// ZIP archive (`application/zip`)
    Zip,
    /// 7-Zip archive (`application/x-7z-compressed`)
    SevenZip,
}

/// A fully downloaded archive, held in memory until it is unpacked
#[derive(Clone, Debug)]
pub struct Payload {
    /// Which resource this is
    pub resource_id: ResourceId,
    /// Title derived from Content-Disposition; names the output subdirectory
    pub title: String,
    /// Declared Content-Type, if the server sent one
    pub content_type: Option<String>,
    /// Declared Content-Length, if the server sent one
    pub content_length: Option<u64>,
    /// Body bytes
    pub bytes: Vec<u8>,
}

/// Which step of an item failed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Downloading the archive
    Fetch,
    /// Unpacking the archive
    Unpack,
}

/// Final tally of a batch run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Ids that survived filtering
    pub total: usize,
    /// Ids downloaded and unpacked
    pub succeeded: usize,
    /// Ids that failed at fetch or unpack
    pub failed: usize,
    /// Ids never attempted because the run was cancelled
    pub cancelled: usize,
    /// Cancellation was requested at some point, even if every id was attempted
    #[serde(default)]
    pub interrupted: bool,
    /// Wall-clock duration of the batch
    pub elapsed: Duration,
}

/// Progress events emitted while a run is in flight
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Cached ids were found; no catalog requests will be made
    UsingCache {
        /// Console being processed
        console: Console,
        /// Number of cached ids
        count: usize,
    },

    /// Catalog scan started
    Scanning {
        /// Console being processed
        console: Console,
        /// Number of listing pages that will be fetched
        pages: usize,
    },

    /// A detail page was resolved
    Resolved {
        /// 1-based position among detail pages
        index: usize,
        /// Number of detail pages
        total: usize,
        /// Detail page url
        url: String,
        /// The id found there
        id: ResourceId,
    },

    /// A detail page could not be resolved
    ResolveFailed {
        /// 1-based position among detail pages
        index: usize,
        /// Number of detail pages
        total: usize,
        /// Detail page url
        url: String,
        /// Error message
        error: String,
    },

    /// Downloads are about to begin
    BatchStarted {
        /// Number of ids that survived filtering
        total: usize,
    },

    /// One item is starting
    ItemStarted {
        /// 1-based position in the batch
        index: usize,
        /// Batch size
        total: usize,
        /// Resource being processed
        id: ResourceId,
        /// Wall-clock marker
        at: DateTime<Utc>,
    },

    /// Download byte progress
    Downloading {
        /// Resource being downloaded
        id: ResourceId,
        /// Bytes received so far
        received: u64,
        /// Declared Content-Length, if any
        total: Option<u64>,
    },

    /// One archive entry was written
    Extracting {
        /// Resource being unpacked
        id: ResourceId,
        /// Entry name inside the archive
        file: String,
        /// 1-based entry position
        index: usize,
        /// Number of entries, if known up front
        total: Option<usize>,
    },

    /// Item downloaded and unpacked
    ItemComplete {
        /// Resource that finished
        id: ResourceId,
        /// Output directory
        path: PathBuf,
        /// Number of files written
        files: usize,
    },

    /// Item failed and was skipped
    ItemFailed {
        /// Resource that failed
        id: ResourceId,
        /// Step that failed
        stage: Stage,
        /// Error message
        error: String,
    },

    /// Cancellation was observed between items
    Cancelled {
        /// Items left unprocessed
        remaining: usize,
    },

    /// Batch finished
    RunComplete(RunSummary),
}
