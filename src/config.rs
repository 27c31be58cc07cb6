//! Pipeline configuration and its persisted settings file.
//!
//! The configuration is an explicit value handed to each run. The
//! [`SettingsStore`] only loads and saves it; nothing reads ambient state.

use crate::error::PipelineError;
use crate::outputs::markdown::{CodeBlockStyle, ConvertOptions, HeadingStyle};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

/// What to do when a single image cannot be localized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AssetFailurePolicy {
    /// Fail the whole run.
    #[default]
    Abort,
    /// Log the failure and leave the remote URL in the document.
    KeepRemote,
}

/// Read-only settings for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfiguration {
    /// Download images and point the document at the local copies.
    pub localize_assets: bool,
    /// Vault-relative folder that receives downloaded images.
    pub asset_destination_folder: String,
    /// Upper bound on simultaneous image downloads; `None` means no bound.
    pub max_concurrent_downloads: Option<usize>,
    pub asset_failure_policy: AssetFailurePolicy,
    pub heading_style: HeadingStyle,
    pub code_block_style: CodeBlockStyle,
}

impl PipelineConfiguration {
    /// The asset folder without surrounding whitespace or trailing `/`, or
    /// `None` when localization is off or the folder is blank.
    pub fn asset_folder(&self) -> Option<&str> {
        if !self.localize_assets {
            return None;
        }
        let folder = self.asset_destination_folder.trim().trim_end_matches('/');
        (!folder.is_empty()).then_some(folder)
    }

    /// Converter options for this run; everything not configurable here
    /// keeps its default.
    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            heading_style: self.heading_style,
            code_block_style: self.code_block_style,
            ..Default::default()
        }
    }
}

/// JSON file holding the persisted [`PipelineConfiguration`].
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the settings, falling back to defaults when the file is missing.
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<PipelineConfiguration, PipelineError> {
        match fs::read_to_string(&self.path).await {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| self.error(e)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No settings file; using defaults");
                Ok(PipelineConfiguration::default())
            }
            Err(e) => Err(self.error(e)),
        }
    }

    /// Persist `config`, creating parent folders as needed.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn save(&self, config: &PipelineConfiguration) -> Result<(), PipelineError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| self.error(e))?;
        }
        let json = serde_json::to_string_pretty(config).map_err(|e| self.error(e))?;
        fs::write(&self.path, json).await.map_err(|e| self.error(e))?;
        info!("Saved settings");
        Ok(())
    }

    fn error(&self, err: impl std::fmt::Display) -> PipelineError {
        PipelineError::Settings {
            path: self.path.display().to_string(),
            message: err.to_string(),
        }
    }
}
