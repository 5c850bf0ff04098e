//! Product search API backend.
//!
//! Provides the `SearchBackend` trait and its HTTP implementation.
//! The analysis core never talks to the network itself; the caller fetches
//! products through a backend and hands them over.

use assortcheck_model::{AnalysisRequest, Environment, Product};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors from search backend operations.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("API Error (Status Code: {status}): {body}")]
    Http { status: u16, body: String },

    #[error("Network Error: Could not connect to the API. Details: {0}")]
    Transport(String),

    #[error("Could not parse the API response: {0}")]
    Parse(String),

    #[error("Could not create HTTP client: {0}")]
    Client(String),
}

/// Trait for product search backends.
pub trait SearchBackend {
    /// Fetch the ranked products for the request's keyword.
    fn search(
        &self,
        request: &AnalysisRequest,
    ) -> impl Future<Output = Result<Vec<Product>, BackendError>> + Send;

    /// Get the backend name for logging.
    fn name(&self) -> &'static str;
}

/// Search API configuration.
#[derive(Debug, Clone)]
pub struct SearchApiConfig {
    /// Replaces the per-environment host, e.g. `http://127.0.0.1:8080`
    pub base_url: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SearchApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
        }
    }
}

impl SearchApiConfig {
    /// Search endpoint for an environment, without the shop query.
    pub fn endpoint(&self, environment: Environment) -> String {
        match &self.base_url {
            Some(base) => format!("{}/search", base.trim_end_matches('/')),
            None => format!(
                "https://search-{}-dlp-adept-search.search-prod.adeptmind.app/search",
                environment
            ),
        }
    }
}

#[derive(Debug, Serialize)]
struct SearchPayload<'a> {
    query: &'a str,
    size: u32,
    force_exploding_variants: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    products: Vec<Product>,
}

/// HTTP client for the product search API.
pub struct SearchApiBackend {
    config: SearchApiConfig,
    client: reqwest::Client,
}

impl SearchApiBackend {
    pub fn new(config: SearchApiConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Client(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn parse_response(body: &str) -> Result<Vec<Product>, BackendError> {
        let response: SearchResponse =
            serde_json::from_str(body).map_err(|e| BackendError::Parse(e.to_string()))?;
        Ok(response.products)
    }
}

impl SearchBackend for SearchApiBackend {
    async fn search(&self, request: &AnalysisRequest) -> Result<Vec<Product>, BackendError> {
        let url = self.config.endpoint(request.environment);
        let payload = SearchPayload {
            query: &request.keyword,
            size: request.result_size,
            force_exploding_variants: false,
        };

        tracing::debug!(
            url = %url,
            shop_id = %request.shop_id,
            query = %request.keyword,
            size = request.result_size,
            "Sending search request"
        );

        let response = self
            .client
            .post(&url)
            .query(&[("shop_id", request.shop_id.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(BackendError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let products = Self::parse_response(&body)?;
        if products.is_empty() {
            tracing::warn!(query = %request.keyword, "Search returned no products");
        }
        Ok(products)
    }

    fn name(&self) -> &'static str {
        "search-api"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assortcheck_model::{ConceptGroup, MatchMode};
    use mockito::Matcher;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn request() -> AnalysisRequest {
        AnalysisRequest::new("shop-1", "hdr10+ tv")
            .with_group(ConceptGroup::new(["hdr10+"], MatchMode::Contains))
            .with_result_size(2)
    }

    fn backend(base_url: String) -> SearchApiBackend {
        SearchApiBackend::new(SearchApiConfig {
            base_url: Some(base_url),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_default_endpoint() {
        let config = SearchApiConfig::default();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(
            config.endpoint(Environment::Staging),
            "https://search-staging-dlp-adept-search.search-prod.adeptmind.app/search"
        );
    }

    #[test]
    fn test_base_url_override() {
        let config = SearchApiConfig {
            base_url: Some("http://localhost:8080/".into()),
            ..Default::default()
        };
        assert_eq!(config.endpoint(Environment::Prod), "http://localhost:8080/search");
    }

    #[tokio::test]
    async fn test_search_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Regex(r"^/search".into()))
            .match_query(Matcher::UrlEncoded("shop_id".into(), "shop-1".into()))
            .match_body(Matcher::PartialJson(json!({
                "query": "hdr10+ tv",
                "size": 2,
                "force_exploding_variants": false
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                "products": [
                    {"product_id": "a1", "title": "Samsung HDR10+ TV"},
                    {"product_id": "b2", "title": "LG OLED TV", "price": 999}
                ]
            }"#,
            )
            .create_async()
            .await;

        let products = backend(server.url()).search(&request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].title(), "Samsung HDR10+ TV");
        assert_eq!(products[1].field_text("price").as_deref(), Some("999"));
    }

    #[tokio::test]
    async fn test_search_missing_products_key() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", Matcher::Regex(r"^/search".into()))
            .with_status(200)
            .with_body(r#"{"total": 0}"#)
            .create_async()
            .await;

        let products = backend(server.url()).search(&request()).await.unwrap();
        assert!(products.is_empty());
    }

    #[tokio::test]
    async fn test_search_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", Matcher::Regex(r"^/search".into()))
            .with_status(503)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let err = backend(server.url()).search(&request()).await.unwrap_err();
        match &err {
            BackendError::Http { status, body } => {
                assert_eq!(*status, 503);
                assert_eq!(body, "upstream unavailable");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            err.to_string(),
            "API Error (Status Code: 503): upstream unavailable"
        );
    }

    #[tokio::test]
    async fn test_search_invalid_json() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", Matcher::Regex(r"^/search".into()))
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let err = backend(server.url()).search(&request()).await.unwrap_err();
        assert!(matches!(err, BackendError::Parse(_)));
    }

    #[tokio::test]
    async fn test_search_connection_refused() {
        let err = backend("http://127.0.0.1:1".into())
            .search(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
        assert!(err.to_string().starts_with("Network Error"));
    }
}
