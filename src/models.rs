//! Data carried between pipeline stages.
//!
//! - [`ArticleRequest`]: what the caller asked for
//! - [`AssetReference`]: one image found in the content subtree
//! - [`AssetMapping`]: remote URL to local name, built once per run
//! - [`MarkdownDocument`]: the converted article and its file name

use crate::error::PipelineError;
use std::collections::HashMap;

/// A single request to fetch and store one article.
///
/// Built by the caller and consumed once by
/// [`run_pipeline`](crate::pipeline::run_pipeline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRequest {
    /// Short token appended to the canonical article URL.
    pub identifier: String,
    /// Vault-relative folder the markdown file is created in.
    pub destination_path: String,
}

impl ArticleRequest {
    /// Build a request, rejecting blank identifiers.
    pub fn new(
        identifier: impl Into<String>,
        destination_path: impl Into<String>,
    ) -> Result<Self, PipelineError> {
        let identifier = identifier.into().trim().to_string();
        if identifier.is_empty() {
            return Err(PipelineError::EmptyIdentifier);
        }
        Ok(Self {
            identifier,
            destination_path: destination_path.into(),
        })
    }
}

/// An image element's source and the hint used to pick its file extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReference {
    /// The `src` attribute exactly as it appears in the document.
    pub original_url: String,
    /// The `alt` attribute, empty when missing.
    pub hint: String,
}

/// Remote image URL to the local name that replaces it.
///
/// Keys are the original `src` values, so every element sharing a URL
/// resolves to the same entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetMapping(HashMap<String, String>);

impl AssetMapping {
    pub fn insert(&mut self, original_url: String, local_name: String) {
        self.0.insert(original_url, local_name);
    }

    pub fn get(&self, original_url: &str) -> Option<&str> {
        self.0.get(original_url).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for AssetMapping {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The converted article, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownDocument {
    /// Sanitized article title, used as the file stem.
    pub title: String,
    pub markdown: String,
}

impl MarkdownDocument {
    /// File name the document is stored under: `<title>.md`.
    pub fn file_name(&self) -> String {
        format!("{}.md", self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_trims_identifier() {
        let request = ArticleRequest::new("  7312345678901234567 ", "notes").unwrap();
        assert_eq!(request.identifier, "7312345678901234567");
        assert_eq!(request.destination_path, "notes");
    }

    #[test]
    fn test_request_rejects_blank_identifier() {
        assert!(matches!(
            ArticleRequest::new("   ", "notes"),
            Err(PipelineError::EmptyIdentifier)
        ));
    }

    #[test]
    fn test_mapping_keys_by_original_url() {
        let mapping: AssetMapping = vec![(
            "https://cdn.example/a.png".to_string(),
            "assets/1.png".to_string(),
        )]
        .into_iter()
        .collect();

        assert_eq!(mapping.get("https://cdn.example/a.png"), Some("assets/1.png"));
        assert_eq!(mapping.get("https://cdn.example/b.png"), None);
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn test_document_file_name() {
        let doc = MarkdownDocument {
            title: "Hello World".to_string(),
            markdown: String::new(),
        };
        assert_eq!(doc.file_name(), "Hello World.md");
    }
}
