//! Writes the finished markdown document into the vault.

use crate::error::PipelineError;
use crate::models::MarkdownDocument;
use crate::outputs::vault::Storage;
use tracing::{error, info, instrument};

/// Vault-relative path of `document` inside `destination_path`.
pub fn note_path(destination_path: &str, document: &MarkdownDocument) -> String {
    let folder = destination_path.trim().trim_matches('/');
    if folder.is_empty() {
        document.file_name()
    } else {
        format!("{folder}/{}", document.file_name())
    }
}

/// Create `destination_path/<title>.md` and return its path.
///
/// # Errors
///
/// [`PipelineError::AlreadyExists`] if the note is already there (it is left
/// untouched), [`PipelineError::WriteFailure`] for any other storage error.
#[instrument(level = "info", skip_all, fields(%destination_path, title = %document.title))]
pub async fn persist<S: Storage>(
    storage: &S,
    destination_path: &str,
    document: &MarkdownDocument,
) -> Result<String, PipelineError> {
    let path = note_path(destination_path, document);
    match storage.create_text(&path, &document.markdown).await {
        Ok(()) => {
            info!(%path, bytes = document.markdown.len(), "Wrote markdown note");
            Ok(path)
        }
        Err(e) => {
            error!(%path, error = %e, "Failed writing markdown note");
            Err(e.into())
        }
    }
}
