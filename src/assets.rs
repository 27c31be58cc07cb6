//! Asset relocation: download every remote image once and point the
//! document at the local copies.
//!
//! # Phases
//!
//! 1. Collect image references in document order, resolve each `src`
//!    against the page URL and keep one target per distinct resolved URL
//!    (the first occurrence supplies the extension hint).
//! 2. Fan out one download per distinct URL, bounded only when
//!    `max_concurrent_downloads` is set. Each download writes its payload to
//!    `<asset folder>/<uuid><ext>`.
//! 3. Wait for every download to settle.
//! 4. Build the [`AssetMapping`] and produce a rewritten copy of the subtree.
//!
//! No rewrite happens before phase 3 ends, so the document never holds a mix
//! of old and new sources.

use crate::config::{AssetFailurePolicy, PipelineConfiguration};
use crate::error::PipelineError;
use crate::fetcher::Fetcher;
use crate::models::{AssetMapping, AssetReference};
use crate::outputs::vault::Storage;
use crate::subtree::ContentSubtree;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

/// Extension used when an image has an empty `alt` hint.
pub const DEFAULT_EXTENSION: &str = ".png";

static EXTENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.[a-zA-Z0-9]+$").unwrap());

/// Infer a file extension (with the leading dot) from an image's `alt` hint.
///
/// # Errors
///
/// [`PipelineError::AssetNameUnresolvable`] when `hint` is non-empty but does
/// not end in `.ext`.
pub fn resolve_extension(hint: &str) -> Result<&str, PipelineError> {
    if hint.is_empty() {
        return Ok(DEFAULT_EXTENSION);
    }
    EXTENSION
        .find(hint)
        .map(|m| m.as_str())
        .ok_or_else(|| PipelineError::AssetNameUnresolvable {
            hint: hint.to_string(),
        })
}

/// One distinct image to download, with every raw `src` that resolves to it.
#[derive(Debug, Clone)]
struct AssetTarget {
    url: Url,
    hint: String,
    sources: Vec<String>,
}

/// Downloads images into the vault and rewrites their references.
#[derive(Debug)]
pub struct AssetRelocator<'a, S> {
    fetcher: &'a Fetcher,
    storage: &'a S,
    config: &'a PipelineConfiguration,
}

impl<'a, S: Storage> AssetRelocator<'a, S> {
    pub fn new(fetcher: &'a Fetcher, storage: &'a S, config: &'a PipelineConfiguration) -> Self {
        Self {
            fetcher,
            storage,
            config,
        }
    }

    /// Localize every image in `subtree`, resolving relative sources against
    /// `page_url`.
    ///
    /// Returns an unchanged copy when localization is disabled or the asset
    /// folder is blank.
    #[instrument(level = "info", skip_all, fields(%page_url))]
    pub async fn relocate(
        &self,
        subtree: &ContentSubtree,
        page_url: &Url,
    ) -> Result<ContentSubtree, PipelineError> {
        let Some(folder) = self.config.asset_folder() else {
            debug!("Asset localization disabled; passing subtree through");
            return Ok(subtree.clone());
        };

        let references = subtree.images();
        let targets = distinct_targets(references.iter(), page_url);
        if targets.is_empty() {
            debug!(images = references.len(), "No downloadable images");
            return Ok(subtree.clone());
        }

        let limit = self
            .config
            .max_concurrent_downloads
            .unwrap_or(targets.len())
            .max(1);
        info!(
            images = references.len(),
            distinct = targets.len(),
            limit,
            %folder,
            "Localizing images"
        );

        let results: Vec<(AssetTarget, Result<String, PipelineError>)> =
            stream::iter(targets)
                .map(|target| async move {
                    let result = self.localize(&target, folder).await;
                    (target, result)
                })
                .buffer_unordered(limit)
                .collect()
                .await;

        let mut mapping = AssetMapping::default();
        let mut failed = 0usize;
        for (target, result) in results {
            match result {
                Ok(local_name) => {
                    for source in target.sources {
                        mapping.insert(source, local_name.clone());
                    }
                }
                Err(e) => match self.config.asset_failure_policy {
                    AssetFailurePolicy::Abort => {
                        warn!(url = %target.url, error = %e, "Image failed; aborting relocation");
                        return Err(e);
                    }
                    AssetFailurePolicy::KeepRemote => {
                        failed += 1;
                        warn!(url = %target.url, error = %e, "Image failed; keeping remote source");
                    }
                },
            }
        }

        info!(localized = mapping.len(), failed, "Image downloads settled");
        Ok(subtree.with_image_sources(&mapping))
    }

    /// Download one image and store it under a fresh name in `folder`.
    #[instrument(level = "debug", skip_all, fields(url = %target.url))]
    async fn localize(&self, target: &AssetTarget, folder: &str) -> Result<String, PipelineError> {
        let extension = resolve_extension(&target.hint)?;
        let bytes = self.fetcher.fetch_bytes(&target.url).await?;
        let local_name = format!("{folder}/{}{extension}", Uuid::new_v4());
        self.storage.create_binary(&local_name, &bytes).await?;
        debug!(%local_name, bytes = bytes.len(), "Stored image");
        Ok(local_name)
    }
}

/// One target per distinct resolved URL, in document order. Sources that do
/// not resolve to an http(s) URL are skipped and stay as they are.
fn distinct_targets<'r>(
    references: impl Iterator<Item = &'r AssetReference>,
    page_url: &Url,
) -> Vec<AssetTarget> {
    let mut targets: Vec<AssetTarget> = Vec::new();
    for reference in references.unique_by(|r| r.original_url.clone()) {
        let url = match page_url.join(&reference.original_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            Ok(url) => {
                debug!(scheme = url.scheme(), "Skipping non-http image source");
                continue;
            }
            Err(e) => {
                debug!(src = %reference.original_url, error = %e, "Skipping unparsable image source");
                continue;
            }
        };
        match targets.iter_mut().find(|t| t.url == url) {
            Some(target) => target.sources.push(reference.original_url.clone()),
            None => targets.push(AssetTarget {
                url,
                hint: reference.hint.clone(),
                sources: vec![reference.original_url.clone()],
            }),
        }
    }
    targets
}
