//! JueJin article locator.
//!
//! JueJin renders every post with the body inside `div#article-root` and the
//! title in `h1.article-title`. Everything else on the page (navigation,
//! author card, comments, recommendations) is discarded.

use crate::error::PipelineError;
use crate::subtree::ContentSubtree;
use crate::utils::sanitize_title;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};

pub const ARTICLE_ROOT_SELECTOR: &str = "div#article-root";
pub const ARTICLE_TITLE_SELECTOR: &str = "h1.article-title";

static ARTICLE_ROOT: Lazy<Selector> = Lazy::new(|| Selector::parse(ARTICLE_ROOT_SELECTOR).unwrap());
static ARTICLE_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(ARTICLE_TITLE_SELECTOR).unwrap());

/// Find the sanitized title and the content subtree of an article page.
///
/// The title element is left out of the subtree when it sits inside the
/// content root, so it is not rendered twice.
///
/// # Errors
///
/// [`PipelineError::StructureMismatch`] when either selector matches nothing,
/// or when the title is blank once sanitized.
#[instrument(level = "info", skip_all, fields(bytes = raw_html.len()))]
pub fn locate(raw_html: &str) -> Result<(String, ContentSubtree), PipelineError> {
    let document = Html::parse_document(raw_html);

    let root = document
        .select(&ARTICLE_ROOT)
        .next()
        .ok_or(PipelineError::StructureMismatch {
            selector: ARTICLE_ROOT_SELECTOR,
        })?;
    let title_element = document
        .select(&ARTICLE_TITLE)
        .next()
        .ok_or(PipelineError::StructureMismatch {
            selector: ARTICLE_TITLE_SELECTOR,
        })?;

    let title = sanitize_title(&title_element.text().collect::<String>());
    if title.is_empty() {
        return Err(PipelineError::StructureMismatch {
            selector: ARTICLE_TITLE_SELECTOR,
        });
    }

    let subtree = ContentSubtree::from_element(root, Some(&ARTICLE_TITLE));
    let image_count = subtree.images().len();
    info!(%title, image_count, "Located article content");
    debug!(html = %crate::utils::truncate_for_log(&subtree.html(), 300), "Content subtree");

    Ok((title, subtree))
}
