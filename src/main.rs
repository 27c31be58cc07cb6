//! # JueJin Markdown
//!
//! Fetches an article from JueJin (juejin.cn), keeps only its readable body,
//! optionally downloads its images into the note vault, and saves the result
//! as a Markdown note named after the article title.
//!
//! ## Usage
//!
//! ```sh
//! juejin_markdown --vault ~/Notes fetch 7312345678901234567 --dest notes/juejin
//! ```
//!
//! ## Architecture
//!
//! Each run is a linear pipeline:
//! 1. **Fetching**: Download the article page
//! 2. **Locating**: Extract the title and the `div#article-root` subtree
//! 3. **Relocating**: Download images into the vault and rewrite their sources (optional)
//! 4. **Converting**: Turn the subtree into Markdown
//! 5. **Persisting**: Create `<dest>/<title>.md`, never overwriting

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod assets;
mod cli;
mod config;
mod error;
mod fetcher;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod subtree;
mod utils;

use cli::{Cli, Command, ConfigOverrides};
use config::{PipelineConfiguration, SettingsStore};
use fetcher::Fetcher;
use models::ArticleRequest;
use outputs::vault::{FsStorage, Storage};
use pipeline::run_pipeline;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();

    let args = Cli::parse();
    let settings = SettingsStore::new(args.settings_path());
    let storage = FsStorage::new(&args.vault);
    debug!(vault = %args.vault.display(), settings = %settings.path().display(), "Parsed CLI arguments");

    let outcome = match &args.command {
        Command::Fetch {
            article_id,
            dest,
            overrides,
        } => fetch(article_id, dest, overrides, &settings, &storage).await,
        Command::Config { overrides } => configure(overrides, &settings, &storage).await,
    };

    let elapsed = start_time.elapsed();
    match outcome {
        Ok(()) => {
            info!(?elapsed, "Execution complete");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, ?elapsed, "Execution failed");
            Err(e)
        }
    }
}

async fn fetch(
    article_id: &str,
    dest: &str,
    overrides: &ConfigOverrides,
    settings: &SettingsStore,
    storage: &FsStorage,
) -> Result<(), Box<dyn Error>> {
    let mut config = settings.load().await?;
    overrides.apply(&mut config);
    info!(
        localize_assets = config.localize_assets,
        asset_folder = %config.asset_destination_folder,
        "Loaded configuration"
    );

    let request = ArticleRequest::new(article_id, dest)?;
    let fetcher = Fetcher::new()?;
    let path = run_pipeline(&request, &config, &fetcher, storage).await?;

    println!("{}", storage.root().join(&path).display());
    Ok(())
}

async fn configure(
    overrides: &ConfigOverrides,
    settings: &SettingsStore,
    storage: &FsStorage,
) -> Result<(), Box<dyn Error>> {
    let mut config = settings.load().await?;
    if !overrides.is_empty() {
        overrides.apply(&mut config);
        settings.save(&config).await?;
    }

    let folders = storage.list_folders().await?;
    print_settings(&config, &folders);

    if let Some(folder) = config.asset_folder() {
        if !folders.iter().any(|f| f == folder) {
            warn!(%folder, "Asset folder does not exist yet; it will be created on first use");
        }
    }
    Ok(())
}

fn print_settings(config: &PipelineConfiguration, folders: &[String]) {
    println!("localize_assets          = {}", config.localize_assets);
    println!("asset_destination_folder = {:?}", config.asset_destination_folder);
    match config.max_concurrent_downloads {
        Some(limit) => println!("max_concurrent_downloads = {limit}"),
        None => println!("max_concurrent_downloads = unbounded"),
    }
    println!("asset_failure_policy     = {:?}", config.asset_failure_policy);
    println!("heading_style            = {:?}", config.heading_style);
    println!("code_block_style         = {:?}", config.code_block_style);
    println!();
    println!("Folders in vault:");
    for folder in folders {
        println!("  {folder}");
    }
}
