//! vault-dl binary: parse flags, set up logging, run one console.

mod cli;

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use std::io::IsTerminal;
use std::process::ExitCode;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;
use vault_dl::utils::format_bytes;
use vault_dl::{Error, Event, RunSummary, VaultDownloader, run_with_shutdown};

use cli::Cli;

/// Exit status after a run cancelled by a signal
const EXIT_CANCELLED: u8 = 130;

/// Initialize structured logging to stderr.
///
/// `RUST_LOG` wins over the default filter.
fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "debug,vault_dl=debug"
    } else {
        "info,vault_dl=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

/// Print human-readable progress lines from the event stream
async fn print_events(mut events: broadcast::Receiver<Event>) {
    loop {
        match events.recv().await {
            Ok(event) => print_event(&event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "progress printer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_event(event: &Event) {
    match event {
        Event::UsingCache { console, count } => {
            println!("Using {} cached ids for {}", count, console);
        }
        Event::Scanning { console, pages } => {
            println!("Scanning {} listing pages for {}", pages, console);
        }
        Event::Resolved { index, total, id, .. } => {
            println!("[{}/{}] found media id {}", index, total, id);
        }
        Event::ResolveFailed { index, total, url, .. } => {
            println!("[{}/{}] no media id on {}", index, total, url);
        }
        Event::BatchStarted { total } => {
            println!("Downloading {} titles", total);
        }
        Event::ItemStarted { index, total, id, at } => {
            let local = at.with_timezone(&Local);
            println!(
                "[{}/{}] {} started at {}",
                index,
                total,
                id,
                local.format("%b %d %I:%M:%S %p")
            );
        }
        Event::Downloading { received, total, .. } => match total {
            Some(total) => println!(
                "  downloaded {} of {}",
                format_bytes(*received),
                format_bytes(*total)
            ),
            None => println!("  downloaded {}", format_bytes(*received)),
        },
        Event::Extracting {
            file, index, total, ..
        } => match total {
            Some(total) => println!("  extracting {}/{}: {}", index, total, file),
            None => println!("  extracting {}: {}", index, file),
        },
        Event::ItemComplete { path, files, .. } => {
            println!("  {} files written to {}", files, path.display());
        }
        Event::ItemFailed { id, stage, error } => {
            println!("  {} failed during {:?}: {}", id, stage, error);
        }
        Event::Cancelled { remaining } => {
            println!("Cancelled, {} titles not attempted", remaining);
        }
        Event::RunComplete(summary) => print_summary(summary),
    }
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Done: {} succeeded, {} failed, {} cancelled of {} in {:.1}s",
        summary.succeeded,
        summary.failed,
        summary.cancelled,
        summary.total,
        summary.elapsed.as_secs_f64()
    );
}

async fn run(cli: Cli) -> Result<RunSummary> {
    let config = cli.load_config()?;
    let downloader = VaultDownloader::new(config, cli.console)
        .await?
        .with_rescan(cli.rescan);

    let printer = tokio::spawn(print_events(downloader.subscribe()));
    let result = run_with_shutdown(&downloader).await;

    // Dropping the last sender closes the channel and ends the printer
    drop(downloader);
    printer.await.ok();

    let summary = result?;
    if summary.failed > 0 {
        tracing::warn!(
            failed = summary.failed,
            "some titles failed; see the failure log to retry them"
        );
    }
    Ok(summary)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(summary) if summary.interrupted => ExitCode::from(EXIT_CANCELLED),
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            if matches!(err.downcast_ref::<Error>(), Some(Error::Cancelled)) {
                eprintln!("vault-dl: cancelled");
                return ExitCode::from(EXIT_CANCELLED);
            }
            eprintln!("vault-dl error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
