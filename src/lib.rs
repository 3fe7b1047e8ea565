//! # vault-dl
//!
//! Bulk downloader for a console game catalog.
//!
//! For one console, vault-dl walks the catalog's alphabetical listing pages,
//! resolves every title's detail page to the media id the download endpoint
//! expects, then downloads and unpacks each archive in turn.
//!
//! ## Design Philosophy
//!
//! - **Polite by default** - one request at a time with fixed delays between them
//! - **Resumable** - discovered ids are cached on disk; a run can start from any id
//! - **Failure tolerant** - a title that fails is logged and skipped, never fatal
//! - **Event-driven** - consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use vault_dl::{Config, Console, VaultDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = VaultDownloader::new(Config::default(), Console::Ps1).await?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = downloader.run().await?;
//!     println!("{} of {} titles downloaded", summary.succeeded, summary.total);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Identifier cache persistence
pub mod cache;
/// Catalog scanning and detail page resolution
pub mod catalog;
/// Configuration types
pub mod config;
/// Batch orchestration (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Archive extraction
pub mod extraction;
/// Append-only log of failed urls
pub mod failure_log;
/// Archive download
pub mod fetcher;
/// Blocklist and resume filtering
pub mod filter;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use cache::IdentifierCache;
pub use catalog::{CatalogScanner, EntryResolver, LetterRange};
pub use config::{Config, MimeDetection};
pub use downloader::VaultDownloader;
pub use error::{CacheError, Error, FetchError, ResolveError, Result, UnpackError};
pub use failure_log::FailureLog;
pub use fetcher::ArchiveFetcher;
pub use filter::filter_ids;
pub use types::{
    ArchiveType, Console, DiscoveredIds, Event, Payload, ResourceId, RunSummary, SourceUrlMap,
    Stage,
};

/// Run the downloader, cancelling it on a termination signal.
///
/// A signal cancels the downloader's token; the item in flight finishes and
/// the remaining items are counted as cancelled in the returned summary. A
/// signal during discovery ends the run with [`Error::Cancelled`].
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use vault_dl::{Config, Console, VaultDownloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = VaultDownloader::new(Config::default(), Console::Snes).await?;
///
///     // Run with automatic signal handling
///     let summary = run_with_shutdown(&downloader).await?;
///     println!("{:?}", summary);
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: &VaultDownloader) -> Result<RunSummary> {
    let token = downloader.cancellation_token();
    let signal_task = tokio::spawn(async move {
        wait_for_signal().await;
        token.cancel();
    });

    let result = downloader.run().await;
    signal_task.abort();
    result
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut sigterm, mut sigint) =
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            (Err(e), _) | (_, Err(e)) => {
                // Without a signal source the run is never cancelled
                tracing::warn!(error = %e, "could not register signal handlers");
                std::future::pending::<()>().await;
                return;
            }
        };

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("received SIGTERM, finishing current item"),
        _ = sigint.recv() => tracing::info!("received SIGINT (Ctrl+C), finishing current item"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received Ctrl+C, finishing current item"),
        Err(e) => {
            tracing::warn!(error = %e, "could not listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
