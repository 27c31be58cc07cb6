//! One end-to-end run: fetch, locate, relocate, convert, persist.
//!
//! Stages run strictly in that order and the first failure ends the run.
//! Nothing is written to the destination folder unless every earlier stage
//! succeeded; images downloaded before a later failure stay in the vault.

use crate::assets::AssetRelocator;
use crate::config::PipelineConfiguration;
use crate::error::PipelineError;
use crate::fetcher::Fetcher;
use crate::models::{ArticleRequest, MarkdownDocument};
use crate::outputs::markdown::MarkdownConverter;
use crate::outputs::persist::persist;
use crate::outputs::vault::Storage;
use crate::scrapers::juejin;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Turn the article named by `request` into a markdown note in `storage`.
///
/// Returns the vault-relative path of the created note.
#[instrument(
    level = "info",
    skip_all,
    fields(id = %request.identifier, dest = %request.destination_path)
)]
pub async fn run_pipeline<S: Storage>(
    request: &ArticleRequest,
    config: &PipelineConfiguration,
    fetcher: &Fetcher,
    storage: &S,
) -> Result<String, PipelineError> {
    let t0 = Instant::now();
    let result = run_stages(request, config, fetcher, storage).await;
    let elapsed_ms = t0.elapsed().as_millis() as u64;

    match &result {
        Ok(path) => info!(%path, elapsed_ms, "Article saved"),
        Err(e) => warn!(error = %e, elapsed_ms, "Pipeline failed"),
    }
    result
}

async fn run_stages<S: Storage>(
    request: &ArticleRequest,
    config: &PipelineConfiguration,
    fetcher: &Fetcher,
    storage: &S,
) -> Result<String, PipelineError> {
    let url = fetcher.article_url(&request.identifier)?;
    let raw_html = fetcher.fetch_article(&url).await?;

    let (title, subtree) = juejin::locate(&raw_html)?;

    let subtree = AssetRelocator::new(fetcher, storage, config)
        .relocate(&subtree, &url)
        .await?;

    let markdown = MarkdownConverter::new(config.convert_options()).convert(&subtree);
    debug!(chars = markdown.chars().count(), "Converted to markdown");

    let document = MarkdownDocument { title, markdown };
    persist(storage, &request.destination_path, &document).await
}
