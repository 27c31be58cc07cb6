//! Error taxonomy for a pipeline run.
//!
//! Every stage reports through [`PipelineError`]. A run is one atomic attempt
//! from the caller's point of view, so the first error that escapes a stage
//! ends the run and is reported once.

use std::io;

/// Everything that can end a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("article identifier must not be empty")]
    EmptyIdentifier,

    #[error("invalid article base url {url}: {message}")]
    InvalidBaseUrl { url: String, message: String },

    /// Transport error, non-2xx status or unreadable body on the article GET.
    #[error("failed to fetch article {url}: {message}")]
    FetchFailure { url: String, message: String },

    /// The page has no element matching `selector`.
    #[error("page does not look like an article: nothing matched `{selector}`")]
    StructureMismatch { selector: &'static str },

    #[error("failed to fetch asset {url}: {message}")]
    AssetFetchFailure { url: String, message: String },

    /// The `alt` hint is non-empty but carries no `.ext` suffix.
    #[error("cannot infer a file extension from image hint {hint:?}")]
    AssetNameUnresolvable { hint: String },

    #[error("{path} already exists")]
    AlreadyExists { path: String },

    #[error("failed to write {path}: {message}")]
    WriteFailure { path: String, message: String },

    #[error("settings file {path}: {message}")]
    Settings { path: String, message: String },
}

/// Failures reported by a [`Storage`](crate::outputs::vault::Storage) collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{path} already exists")]
    AlreadyExists { path: String },

    #[error("storage error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AlreadyExists { path } => PipelineError::AlreadyExists { path },
            StorageError::Io { path, source } => PipelineError::WriteFailure {
                path,
                message: source.to_string(),
            },
        }
    }
}
