//! Command-line interface definitions for JueJin Markdown.
//!
//! Global options locate the vault and the settings file; subcommands either
//! fetch one article or update the saved settings. Options can also be given
//! through environment variables.

use crate::config::{AssetFailurePolicy, PipelineConfiguration};
use crate::outputs::markdown::{CodeBlockStyle, HeadingStyle};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// File name of the settings file inside the vault.
pub const SETTINGS_FILE_NAME: &str = ".juejin_markdown.json";

/// Command-line arguments for the JueJin Markdown application.
///
/// # Examples
///
/// ```sh
/// # Save an article into notes/juejin, keeping remote image links
/// juejin_markdown --vault ~/Notes fetch 7312345678901234567 --dest notes/juejin
///
/// # Turn on image localization for every later run
/// juejin_markdown --vault ~/Notes config --localize-assets true --asset-folder assets
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Root folder of the note vault
    #[arg(long, global = true, env = "JUEJIN_VAULT", default_value = ".")]
    pub vault: PathBuf,

    /// Settings file (defaults to <VAULT>/.juejin_markdown.json)
    #[arg(long, global = true, env = "JUEJIN_SETTINGS")]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn settings_path(&self) -> PathBuf {
        self.settings
            .clone()
            .unwrap_or_else(|| self.vault.join(SETTINGS_FILE_NAME))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch one article and save it as a markdown note
    Fetch {
        /// Identifier at the end of the article URL
        article_id: String,

        /// Vault-relative folder the note is created in
        #[arg(short, long, default_value = "")]
        dest: String,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },

    /// Update and print the saved settings
    Config {
        #[command(flatten)]
        overrides: ConfigOverrides,
    },
}

/// Settings that can be overridden on the command line.
#[derive(Args, Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Download images into the vault
    #[arg(long)]
    pub localize_assets: Option<bool>,

    /// Vault-relative folder for downloaded images
    #[arg(long)]
    pub asset_folder: Option<String>,

    /// Maximum simultaneous image downloads (0 for no limit)
    #[arg(long)]
    pub max_concurrent_downloads: Option<usize>,

    /// What to do when an image cannot be downloaded
    #[arg(long, value_enum)]
    pub on_asset_failure: Option<AssetFailurePolicy>,

    /// Heading syntax in the generated note
    #[arg(long, value_enum)]
    pub heading_style: Option<HeadingStyle>,

    /// Code block syntax in the generated note
    #[arg(long, value_enum)]
    pub code_block_style: Option<CodeBlockStyle>,
}

impl ConfigOverrides {
    /// Apply every override that was given to `config`.
    pub fn apply(&self, config: &mut PipelineConfiguration) {
        if let Some(localize) = self.localize_assets {
            config.localize_assets = localize;
        }
        if let Some(folder) = &self.asset_folder {
            config.asset_destination_folder = folder.clone();
        }
        if let Some(limit) = self.max_concurrent_downloads {
            config.max_concurrent_downloads = (limit > 0).then_some(limit);
        }
        if let Some(policy) = self.on_asset_failure {
            config.asset_failure_policy = policy;
        }
        if let Some(style) = self.heading_style {
            config.heading_style = style;
        }
        if let Some(style) = self.code_block_style {
            config.code_block_style = style;
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
