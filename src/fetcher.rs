//! HTTP access for article pages and image payloads.
//!
//! Every call is a single GET with no retries. Non-2xx statuses count as
//! failures.

use crate::error::PipelineError;
use reqwest::Client;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Where JueJin serves posts; the article identifier is the last path segment.
pub const ARTICLE_BASE_URL: &str = "https://juejin.cn/post/";

const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) ",
    "Chrome/124.0 Safari/537.36 juejin_markdown/",
    env!("CARGO_PKG_VERSION")
);

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    base_url: Url,
}

impl Fetcher {
    /// A fetcher for the public JueJin site.
    pub fn new() -> Result<Self, PipelineError> {
        Self::with_base_url(ARTICLE_BASE_URL)
    }

    /// A fetcher that builds article URLs under `base_url` instead.
    pub fn with_base_url(base_url: &str) -> Result<Self, PipelineError> {
        let invalid = |message: String| PipelineError::InvalidBaseUrl {
            url: base_url.to_string(),
            message,
        };
        let parsed = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(invalid("url cannot carry a path".to_string()));
        }
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    /// The canonical URL of the article `identifier`.
    pub fn article_url(&self, identifier: &str) -> Result<Url, PipelineError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(PipelineError::EmptyIdentifier);
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PipelineError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                message: "url cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .push(identifier);
        Ok(url)
    }

    /// Fetch the raw HTML of an article page.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn fetch_article(&self, url: &Url) -> Result<String, PipelineError> {
        let t0 = Instant::now();
        let body = match self.get(url).await {
            Ok(response) => response.text().await,
            Err(e) => Err(e),
        };

        match body {
            Ok(html) => {
                info!(
                    bytes = html.len(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Fetched article page"
                );
                Ok(html)
            }
            Err(e) => {
                warn!(error = %e, "Article fetch failed");
                Err(PipelineError::FetchFailure {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
        }
    }

    /// Fetch a binary payload such as an image.
    #[instrument(level = "debug", skip_all, fields(%url))]
    pub async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>, PipelineError> {
        let bytes = match self.get(url).await {
            Ok(response) => response.bytes().await,
            Err(e) => Err(e),
        };
        match bytes {
            Ok(bytes) => {
                debug!(bytes = bytes.len(), "Fetched asset");
                Ok(bytes.to_vec())
            }
            Err(e) => {
                warn!(error = %e, "Asset fetch failed");
                Err(PipelineError::AssetFetchFailure {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
        }
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_article_url_appends_identifier() {
        let fetcher = Fetcher::new().unwrap();
        let url = fetcher.article_url(" 7312345678901234567 ").unwrap();
        assert_eq!(url.as_str(), "https://juejin.cn/post/7312345678901234567");
    }

    #[test]
    fn test_article_url_encodes_identifier_as_one_segment() {
        let fetcher = Fetcher::with_base_url("http://localhost:8080/post").unwrap();
        let url = fetcher.article_url("a/b?c").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/post/a%2Fb%3Fc");
    }

    #[test]
    fn test_article_url_rejects_blank_identifier() {
        let fetcher = Fetcher::new().unwrap();
        assert!(matches!(
            fetcher.article_url("  "),
            Err(PipelineError::EmptyIdentifier)
        ));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            Fetcher::with_base_url("not a url"),
            Err(PipelineError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            Fetcher::with_base_url("mailto:someone@example.com"),
            Err(PipelineError::InvalidBaseUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_article_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/post/42"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::with_base_url(&format!("{}/post/", server.uri())).unwrap();
        let url = fetcher.article_url("42").unwrap();
        assert_eq!(fetcher.fetch_article(&url).await.unwrap(), "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_fetch_article_non_2xx_is_fetch_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/post/404"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::with_base_url(&format!("{}/post/", server.uri())).unwrap();
        let url = fetcher.article_url("404").unwrap();
        let err = fetcher.fetch_article(&url).await.unwrap_err();
        assert!(matches!(err, PipelineError::FetchFailure { .. }));
    }

    #[tokio::test]
    async fn test_fetch_bytes_failure_is_asset_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/a.png"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let url = Url::parse(&format!("{}/img/a.png", server.uri())).unwrap();
        let err = fetcher.fetch_bytes(&url).await.unwrap_err();
        assert!(matches!(err, PipelineError::AssetFetchFailure { .. }));
    }

    #[tokio::test]
    async fn test_fetch_bytes_returns_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/a.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let url = Url::parse(&format!("{}/img/a.png", server.uri())).unwrap();
        assert_eq!(fetcher.fetch_bytes(&url).await.unwrap(), vec![0x89, b'P', b'N', b'G']);
    }
}
