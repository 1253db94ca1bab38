//! SerpAPI search provider.

use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use ripple_core::{config::SearchConfig, traits::SearchProvider, types::SearchResult, Error, Result};

/// Google results through SerpAPI.
#[derive(Clone)]
pub struct SerpApiProvider {
    client: reqwest::Client,
    api_key: Secret<String>,
    base_url: String,
    engine: String,
    language: String,
}

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Vec<SearchResult>,
    error: Option<String>,
}

impl SerpApiProvider {
    pub fn new(api_key: Secret<String>, config: &SearchConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_key,
            base_url: config.base_url.clone(),
            engine: config.engine.clone(),
            language: config.language.clone(),
        }
    }

    /// Provider from configuration; `None` without a credential.
    pub fn from_config(config: &SearchConfig) -> Option<Self> {
        let key = config.api_key.as_ref()?;
        if key.expose_secret().trim().is_empty() {
            return None;
        }
        Some(Self::new(key.clone(), config))
    }

    /// Extract ranked results from a SerpAPI response body.
    pub fn parse_results(body: &str, count: usize) -> Result<Vec<SearchResult>> {
        let parsed: SerpResponse = serde_json::from_str(body)
            .map_err(|e| Error::search(format!("Malformed SerpAPI payload: {}", e)))?;
        if let Some(err) = parsed.error {
            return Err(Error::search(format!("SerpAPI error: {}", err)));
        }
        Ok(parsed.organic_results.into_iter().take(count).collect())
    }
}

#[async_trait]
impl SearchProvider for SerpApiProvider {
    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchResult>> {
        let num = count.to_string();
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("api_key", self.api_key.expose_secret().as_str()),
                ("engine", self.engine.as_str()),
                ("num", num.as_str()),
                ("hl", self.language.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::search(format!("Request failed: {}", e.without_url())))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::search(format!("SerpAPI returned HTTP {}", status)));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::search(format!("Failed to read response: {}", e.without_url())))?;

        Self::parse_results(&body, count)
    }

    fn name(&self) -> &str {
        "serpapi"
    }
}
