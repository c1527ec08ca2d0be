//! DuckDuckGo Instant Answer API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{rank_score, ProviderMetadata, SearchProvider, USER_AGENT};
use crate::error::{Error, Result};
use crate::listing::{truncate_chars, ProductListing};

/// DuckDuckGo Instant Answer endpoint.
pub const DUCKDUCKGO_ENDPOINT: &str = "https://api.duckduckgo.com/";

const PROVIDER_NAME: &str = "duckduckgo";

#[derive(Debug, Default, Deserialize)]
struct DdgResponse {
    #[serde(rename = "Results", default)]
    results: Vec<DdgTopic>,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<DdgTopic>,
}

#[derive(Debug, Default, Deserialize)]
struct DdgTopic {
    #[serde(rename = "Text", default)]
    text: String,
    #[serde(rename = "FirstURL", default)]
    first_url: String,
    /// Present on topic groups instead of text/url
    #[serde(rename = "Topics", default)]
    topics: Vec<DdgTopic>,
}

/// Product search through DuckDuckGo.
pub struct DuckDuckGoProvider {
    client: Client,
    endpoint: String,
}

impl DuckDuckGoProvider {
    /// Create a client.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::unavailable(PROVIDER_NAME, e))?;
        Ok(Self {
            client,
            endpoint: DUCKDUCKGO_ENDPOINT.to_string(),
        })
    }

    /// Point the client at a different endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn request_url(&self, query: &str) -> String {
        format!(
            "{}?q={}&format=json&no_html=1&skip_disambig=1",
            self.endpoint,
            urlencoding::encode(query.trim())
        )
    }
}

fn flatten<'a>(topics: &'a [DdgTopic], out: &mut Vec<&'a DdgTopic>) {
    for topic in topics {
        if topic.topics.is_empty() {
            out.push(topic);
        } else {
            flatten(&topic.topics, out);
        }
    }
}

fn into_listings(response: &DdgResponse, limit: usize) -> Vec<ProductListing> {
    let mut topics = Vec::new();
    flatten(&response.results, &mut topics);
    flatten(&response.related_topics, &mut topics);

    topics
        .into_iter()
        .filter(|t| !t.text.trim().is_empty() && !t.first_url.is_empty())
        .take(limit)
        .enumerate()
        .map(|(rank, t)| {
            let title = t.text.split(" - ").next().unwrap_or_default();
            ProductListing::from_web_result(
                &truncate_chars(title.trim(), 80),
                &t.text,
                &t.first_url,
                rank_score(rank),
            )
        })
        .collect()
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata::remote(PROVIDER_NAME, "DuckDuckGo instant answers").with_tag("web")
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ProductListing>> {
        let url = self.request_url(query);
        debug!("DuckDuckGo search: {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER_NAME, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::provider(
                PROVIDER_NAME,
                format!("API error ({})", response.status()),
            ));
        }

        // The API sometimes answers with an empty body or a JS content type
        let body = response
            .text()
            .await
            .map_err(|e| Error::provider(PROVIDER_NAME, format!("read failed: {}", e)))?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let parsed: DdgResponse = serde_json::from_str(&body)
            .map_err(|e| Error::provider(PROVIDER_NAME, format!("invalid response: {}", e)))?;
        Ok(into_listings(&parsed, limit))
    }
}
