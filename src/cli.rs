//! Command-line interface for vault-dl.

use anyhow::{Context, Result};
use clap::Parser;
use clap::builder::{PossibleValuesParser, TypedValueParser};
use std::path::PathBuf;
use vault_dl::{Config, Console, ResourceId};

/// Download every archive of one console from the vault catalog.
#[derive(Debug, Parser)]
#[command(name = "vault-dl", version)]
#[command(about = "Bulk downloader for the vault game catalog", long_about = None)]
pub struct Cli {
    /// Console to download.
    #[arg(short, long, value_parser = console_parser())]
    pub console: Console,

    /// First listing letter to scan [default: A].
    #[arg(short, long, value_name = "LETTER")]
    pub start: Option<char>,

    /// Last listing letter to scan [default: Z].
    #[arg(short, long, value_name = "LETTER")]
    pub end: Option<char>,

    /// Output directory [default: games/<System>].
    #[arg(short, long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Start downloading at this media id, skipping everything before it.
    #[arg(short = 'g', long = "first-game-id", value_name = "ID")]
    pub first_game_id: Option<ResourceId>,

    /// Never download this media id (repeatable; adds to the configured blocklist).
    #[arg(short = 'b', long = "block", value_name = "ID")]
    pub block: Vec<ResourceId>,

    /// TOML config file; command-line flags override it.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Ignore cached ids and scan the catalog again.
    #[arg(long)]
    pub rescan: bool,

    /// Directory for the id cache [default: cache].
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory for failure logs [default: failed].
    #[arg(long, value_name = "DIR")]
    pub failed_dir: Option<PathBuf>,

    /// Cookie header sent with every request.
    #[arg(long, value_name = "COOKIE")]
    pub cookie: Option<String>,

    /// Debug logging.
    #[arg(short, long)]
    pub verbose: bool,
}

fn console_parser() -> impl TypedValueParser<Value = Console> {
    PossibleValuesParser::new(Console::ALL.map(|c| c.cli_key()))
        .try_map(|key: String| key.parse::<Console>())
}

impl Cli {
    /// Load the config file (if any) and apply command-line overrides
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_toml_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => Config::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    /// Apply command-line overrides to `config`
    pub fn apply(&self, config: &mut Config) {
        if let Some(start) = self.start {
            config.catalog.first_letter = start;
        }
        if let Some(end) = self.end {
            config.catalog.last_letter = end;
        }
        if let Some(dir) = &self.directory {
            config.download.download_dir = Some(dir.clone());
        }
        if let Some(id) = &self.first_game_id {
            config.download.resume_from = Some(id.clone());
        }
        for id in &self.block {
            if !config.download.blocklist.contains(id) {
                config.download.blocklist.push(id.clone());
            }
        }
        if let Some(dir) = &self.cache_dir {
            config.persistence.cache_dir = dir.clone();
        }
        if let Some(dir) = &self.failed_dir {
            config.persistence.failed_dir = dir.clone();
        }
        if let Some(cookie) = &self.cookie {
            config.request.cookie = Some(cookie.clone());
        }
    }
}
