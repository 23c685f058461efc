pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

pub use reqwest::StatusCode;

use crate::types::{Candidate, SearchResponse};

pub const DEFAULT_BASE_URL: &str = "https://en.wiktionary.org";
pub const DEFAULT_USER_AGENT: &str = concat!("wiktionary-lookup/", env!("CARGO_PKG_VERSION"));
/// Upper bound on suggestions requested from the search endpoint.
pub const MAX_SUGGESTIONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("unexpected status code: {0}")]
    Status(StatusCode),
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// Upstream dictionary operations the lookup pipeline depends on.
#[async_trait]
pub trait DictionarySource: Send + Sync {
    /// Title search, in the service's relevance order.
    async fn search_titles(&self, query: &str, limit: usize) -> Result<Vec<Candidate>, ClientError>;

    /// Raw definition payload keyed by language code.
    async fn fetch_definition(&self, title: &str) -> Result<Value, ClientError>;

    /// Rendered HTML of the whole page.
    async fn fetch_page_html(&self, title: &str) -> Result<String, ClientError>;

    /// Canonical wiki page a user can open for `title`.
    fn page_url(&self, title: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct WiktionaryClient {
    http: Client,
    config: ClientConfig,
}

impl WiktionaryClient {
    pub fn with_config(config: ClientConfig) -> Result<Self, ClientError> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .gzip(true)
            .build()
            .map_err(|err| ClientError::Http(err.to_string()))?;

        Ok(Self { http, config })
    }

    pub fn new() -> Result<Self, ClientError> {
        Self::with_config(ClientConfig::default())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, ClientError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| ClientError::Http(err.to_string()))?;

        if !response.status().is_success() {
            warn!(status = %response.status(), url, "Wiktionary request failed");
            return Err(ClientError::Status(response.status()));
        }
        Ok(response)
    }
}

#[async_trait]
impl DictionarySource for WiktionaryClient {
    #[instrument(name = "wiktionary_client.search_titles", skip(self))]
    async fn search_titles(&self, query: &str, limit: usize) -> Result<Vec<Candidate>, ClientError> {
        let limit = limit.clamp(1, MAX_SUGGESTIONS);
        let url = format!(
            "{}/w/rest.php/v1/search/title?q={}&limit={limit}",
            self.base_url(),
            urlencoding::encode(query)
        );
        debug!(url = %url, "Searching titles");

        let bytes = self
            .get(&url)
            .await?
            .bytes()
            .await
            .map_err(|err| ClientError::Http(err.to_string()))?;
        let response: SearchResponse =
            serde_json::from_slice(&bytes).map_err(|err| ClientError::Decode {
                url: url.clone(),
                message: err.to_string(),
            })?;

        Ok(response
            .pages
            .unwrap_or_default()
            .into_iter()
            .map(Candidate::from)
            .collect())
    }

    #[instrument(name = "wiktionary_client.fetch_definition", skip(self))]
    async fn fetch_definition(&self, title: &str) -> Result<Value, ClientError> {
        let url = definition_url(self.base_url(), title);
        debug!(url = %url, "Fetching definition payload");

        let bytes = self
            .get(&url)
            .await?
            .bytes()
            .await
            .map_err(|err| ClientError::Http(err.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| ClientError::Decode {
            url,
            message: err.to_string(),
        })
    }

    #[instrument(name = "wiktionary_client.fetch_page_html", skip(self))]
    async fn fetch_page_html(&self, title: &str) -> Result<String, ClientError> {
        let url = page_html_url(self.base_url(), title);
        debug!(url = %url, "Fetching page HTML");

        self.get(&url)
            .await?
            .text()
            .await
            .map_err(|err| ClientError::Http(err.to_string()))
    }

    fn page_url(&self, title: &str) -> String {
        wiki_page_url(self.base_url(), title)
    }
}

fn escape_title(title: &str) -> String {
    urlencoding::encode(title.trim()).into_owned()
}

#[must_use]
pub fn definition_url(base_url: &str, title: &str) -> String {
    format!(
        "{}/api/rest_v1/page/definition/{}",
        base_url.trim_end_matches('/'),
        escape_title(title)
    )
}

#[must_use]
pub fn page_html_url(base_url: &str, title: &str) -> String {
    format!(
        "{}/api/rest_v1/page/html/{}",
        base_url.trim_end_matches('/'),
        escape_title(title)
    )
}

#[must_use]
pub fn wiki_page_url(base_url: &str, title: &str) -> String {
    format!("{}/wiki/{}", base_url.trim_end_matches('/'), escape_title(title))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_escape_and_trim_titles() {
        assert_eq!(
            definition_url(DEFAULT_BASE_URL, "  ice cream "),
            "https://en.wiktionary.org/api/rest_v1/page/definition/ice%20cream"
        );
        assert_eq!(
            page_html_url("https://en.wiktionary.org/", "naïve"),
            "https://en.wiktionary.org/api/rest_v1/page/html/na%C3%AFve"
        );
        assert_eq!(
            wiki_page_url(DEFAULT_BASE_URL, "AC/DC"),
            "https://en.wiktionary.org/wiki/AC%2FDC"
        );
    }

    #[test]
    fn client_builds_with_defaults() {
        let client = WiktionaryClient::new().unwrap();
        assert_eq!(client.config().base_url, DEFAULT_BASE_URL);
        assert_eq!(
            client.page_url("cat"),
            "https://en.wiktionary.org/wiki/cat"
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_http_error() {
        let client = WiktionaryClient::with_config(ClientConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_millis(500),
            ..ClientConfig::default()
        })
        .unwrap();

        let error = client.fetch_definition("cat").await.unwrap_err();
        assert!(matches!(error, ClientError::Http(_)), "{error:?}");
    }
}
