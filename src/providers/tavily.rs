//! Tavily search API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{rank_score, ProviderMetadata, SearchProvider, USER_AGENT};
use crate::error::{Error, Result};
use crate::listing::ProductListing;

/// Tavily search endpoint.
pub const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

const PROVIDER_NAME: &str = "tavily";

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: String,
    search_depth: &'static str,
    max_results: usize,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    score: Option<f32>,
}

/// Product search through the Tavily API.
pub struct TavilyProvider {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl TavilyProvider {
    /// Create a client. A blank API key makes the provider unavailable.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::unavailable(PROVIDER_NAME, "missing Tavily API key"));
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::unavailable(PROVIDER_NAME, e))?;
        Ok(Self {
            client,
            api_key: api_key.trim().to_string(),
            endpoint: TAVILY_ENDPOINT.to_string(),
        })
    }

    /// Point the client at a different endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn request<'a>(&'a self, query: &str, limit: usize) -> TavilyRequest<'a> {
        TavilyRequest {
            api_key: &self.api_key,
            query: format!("{} buy online price", query.trim()),
            search_depth: "basic",
            max_results: limit,
            include_answer: false,
        }
    }
}

fn into_listings(response: TavilyResponse, limit: usize) -> Vec<ProductListing> {
    response
        .results
        .into_iter()
        .filter(|r| !r.url.is_empty() && !(r.title.trim().is_empty() && r.content.trim().is_empty()))
        .take(limit)
        .enumerate()
        .map(|(rank, r)| {
            let score = r.score.unwrap_or_else(|| rank_score(rank));
            ProductListing::from_web_result(&r.title, &r.content, &r.url, score)
        })
        .collect()
}

#[async_trait]
impl SearchProvider for TavilyProvider {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata::remote(PROVIDER_NAME, "Tavily web search for online store listings")
            .with_tag("web")
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ProductListing>> {
        debug!("Tavily search: {:?} (limit {})", query, limit);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.request(query, limit))
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER_NAME, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(Error::provider(
                PROVIDER_NAME,
                format!("API error ({}): {}", status, body),
            ));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| Error::provider(PROVIDER_NAME, format!("invalid response: {}", e)))?;
        Ok(into_listings(parsed, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> TavilyProvider {
        TavilyProvider::new("tvly-key", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_blank_key_is_dependency_unavailable() {
        let err = TavilyProvider::new("   ", Duration::from_secs(5))
            .err()
            .expect("blank key must fail");
        assert!(matches!(err, Error::DependencyUnavailable { .. }));
    }

    #[test]
    fn test_request_body_shape() {
        let provider = provider();
        let body = serde_json::to_value(provider.request(" paneer ", 5)).unwrap();
        assert_eq!(body["api_key"], "tvly-key");
        assert_eq!(body["query"], "paneer buy online price");
        assert_eq!(body["max_results"], 5);
        assert_eq!(body["search_depth"], "basic");
        assert_eq!(body["include_answer"], false);
    }

    #[test]
    fn test_response_maps_to_listings() {
        let raw = serde_json::json!({
            "query": "milk",
            "results": [
                {
                    "title": "Amul Gold Full Cream Milk 1 L",
                    "url": "https://www.bigbasket.com/pd/amul-gold",
                    "content": "Amul Gold milk, Rs. 68 per pouch. Delivered in 10 minutes.",
                    "score": 0.91
                },
                {
                    "title": "",
                    "url": "https://blinkit.com/mother-dairy",
                    "content": "Mother Dairy toned milk. Order online."
                },
                { "title": "no url", "url": "", "content": "dropped" }
            ]
        });
        let response: TavilyResponse = serde_json::from_value(raw).unwrap();
        let listings = into_listings(response, 10);

        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].price, "₹68");
        assert_eq!(listings[0].source, "bigbasket.com");
        assert!((listings[0].relevance_score - 0.91).abs() < f32::EPSILON);
        assert_eq!(listings[1].title, "Mother Dairy toned milk");
        assert_eq!(listings[1].relevance_score, 0.5);
    }

    #[test]
    fn test_response_respects_limit() {
        let results: Vec<_> = (0..5)
            .map(|i| serde_json::json!({"title": format!("Item {}", i), "url": format!("https://shop.in/{}", i), "content": "x"}))
            .collect();
        let response: TavilyResponse =
            serde_json::from_value(serde_json::json!({ "results": results })).unwrap();
        assert_eq!(into_listings(response, 2).len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_provider_error() {
        let provider = TavilyProvider::new("tvly-key", Duration::from_millis(500))
            .unwrap()
            .with_endpoint("http://127.0.0.1:9/search");
        let err = provider.search("rice", 2).await.unwrap_err();
        assert!(matches!(err, Error::ProviderCallFailed { .. }));
    }
}
