use crate::core::errors::AsinCacheError;
use crate::core::models::Asin;
use crate::core::services::InvalidationOutcome;
use crate::devtools::Invalidator;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct InvalidateBody<'a> {
    asins: &'a [Asin],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvalidateReply {
    success: bool,
    #[serde(flatten)]
    outcome: InvalidationOutcome,
}

/// Calls `POST /api/asins/invalidate` on a running server.
#[derive(Clone, Debug)]
pub struct HttpInvalidator {
    client: Client,
    endpoint: Url,
}

impl HttpInvalidator {
    pub fn new(site: &str) -> Result<Self, AsinCacheError> {
        let endpoint = Url::parse(site)
            .and_then(|base| base.join("/api/asins/invalidate"))
            .map_err(|e| AsinCacheError::InvalidConfig("site".to_string(), e.to_string()))?;
        let client = Client::builder()
            .user_agent(concat!("asin-cache-devtools/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AsinCacheError::InvalidConfig("site".to_string(), e.to_string()))?;
        Ok(HttpInvalidator { client, endpoint })
    }
}

#[async_trait]
impl Invalidator for HttpInvalidator {
    async fn request_invalidation(&self, keys: Vec<Asin>) -> Result<InvalidationOutcome, AsinCacheError> {
        let label = keys.iter().map(Asin::as_str).collect::<Vec<_>>().join(",");
        let transport = |e: reqwest::Error| AsinCacheError::UpstreamTransportFailure(label.clone(), e.to_string());

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&InvalidateBody { asins: &keys })
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(AsinCacheError::UpstreamTransportFailure(
                label,
                format!("invalidate returned {}", response.status()),
            ));
        }

        let reply: InvalidateReply = response
            .json()
            .await
            .map_err(|e| AsinCacheError::UpstreamInvalidResponse(label.clone(), e.to_string()))?;
        if !reply.success {
            return Err(AsinCacheError::UpstreamInvalidResponse(label, "server reported failure".to_string()));
        }
        Ok(reply.outcome)
    }
}
