use crate::core::errors::AsinCacheError;
use crate::core::models::Asin;
use crate::infrastructure::fetcher::ProductApi;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://serpapi.com";

/// SerpApi client for the `amazon_product` and `amazon` engines.
#[derive(Clone)]
pub struct SerpApiClient {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl std::fmt::Debug for SerpApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerpApiClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl SerpApiClient {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self, AsinCacheError> {
        let endpoint = Url::parse(base_url)
            .and_then(|base| base.join("/search.json"))
            .map_err(|e| AsinCacheError::InvalidConfig("SERPAPI_BASE_URL".to_string(), e.to_string()))?;
        let client = Client::builder()
            .user_agent(concat!("asin-cache/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| AsinCacheError::InvalidConfig("SERPAPI_BASE_URL".to_string(), e.to_string()))?;
        Ok(SerpApiClient {
            client,
            endpoint,
            api_key,
        })
    }

    async fn query(&self, engine: &str, asin: &Asin) -> Result<Value, AsinCacheError> {
        let transport = |e: reqwest::Error| AsinCacheError::UpstreamTransportFailure(asin.to_string(), e.to_string());

        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("engine", engine)
            .append_pair("asin", asin.as_str())
            .append_pair("api_key", &self.api_key);

        debug!(engine, %asin, "querying product API");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AsinCacheError::UpstreamTransportFailure(
                asin.to_string(),
                format!("{} returned {}", engine, status),
            ));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AsinCacheError::UpstreamInvalidResponse(asin.to_string(), e.to_string()))
    }
}

#[async_trait]
impl ProductApi for SerpApiClient {
    async fn product(&self, asin: &Asin) -> Result<Value, AsinCacheError> {
        self.query("amazon_product", asin).await
    }

    async fn search(&self, asin: &Asin) -> Result<Value, AsinCacheError> {
        self.query("amazon", asin).await
    }
}
