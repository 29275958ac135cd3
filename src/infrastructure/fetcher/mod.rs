pub mod serpapi;

use crate::core::errors::AsinCacheError;
use crate::core::models::{Asin, Price, ProductAttributes, ProductRecord};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Two upstream lookups per ASIN, returned as raw JSON documents.
#[async_trait]
pub trait ProductApi: Send + Sync {
    /// Product detail lookup (`engine=amazon_product`).
    async fn product(&self, asin: &Asin) -> Result<Value, AsinCacheError>;
    /// Search lookup used to resolve the purchase link (`engine=amazon`).
    async fn search(&self, asin: &Asin) -> Result<Value, AsinCacheError>;
}

#[async_trait]
impl<A: ProductApi + ?Sized> ProductApi for Arc<A> {
    async fn product(&self, asin: &Asin) -> Result<Value, AsinCacheError> {
        (**self).product(asin).await
    }

    async fn search(&self, asin: &Asin) -> Result<Value, AsinCacheError> {
        (**self).search(asin).await
    }
}

pub fn fallback_product_url(asin: &Asin) -> String {
    format!("https://www.amazon.com/dp/{}", asin)
}

/// Turns upstream documents into [`ProductRecord`]s, repairing partial failures.
pub struct ProductFetcher<A: ProductApi> {
    api: A,
}

impl<A: ProductApi> ProductFetcher<A> {
    pub fn new(api: A) -> Self {
        ProductFetcher { api }
    }

    pub async fn fetch_attributes(&self, asin: &Asin) -> Result<ProductAttributes, AsinCacheError> {
        let json = self.api.product(asin).await?;
        parse_attributes(asin, &json)
    }

    /// Never fails: any error resolves to the constructed product page URL.
    pub async fn fetch_purchase_link(&self, asin: &Asin) -> String {
        match self.api.search(asin).await {
            Ok(json) => parse_purchase_link(asin, &json),
            Err(e) => {
                warn!(%asin, error = %e, "link lookup failed, using fallback URL");
                fallback_product_url(asin)
            }
        }
    }

    /// Runs both lookups concurrently; a failed attribute lookup degrades to zeroed fields.
    ///
    /// The flag in the result reports whether attributes came back intact.
    pub async fn fetch_record(&self, asin: &Asin) -> (ProductRecord, bool) {
        let (attributes, link) = futures::join!(self.fetch_attributes(asin), self.fetch_purchase_link(asin));
        match attributes {
            Ok(attributes) => (ProductRecord::from_parts(attributes, link), true),
            Err(e) => {
                warn!(%asin, error = %e, "attribute lookup failed, returning degraded record");
                (ProductRecord::from_parts(ProductAttributes::default(), link), false)
            }
        }
    }
}

pub fn parse_attributes(asin: &Asin, json: &Value) -> Result<ProductAttributes, AsinCacheError> {
    let results = json.get("product_results").filter(|v| v.is_object()).ok_or_else(|| {
        let reason = json
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("missing product_results")
            .to_string();
        AsinCacheError::UpstreamInvalidResponse(asin.to_string(), reason)
    })?;

    let thumbnails = results
        .get("thumbnails")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(String::from).collect())
        .unwrap_or_default();

    Ok(ProductAttributes {
        title: results.get("title").and_then(Value::as_str).unwrap_or_default().to_string(),
        thumbnails,
        rating: results.get("rating").and_then(Value::as_f64).unwrap_or(0.0),
        review_count: results.get("reviews").and_then(Value::as_u64).unwrap_or(0),
        price: parse_price(json, results),
    })
}

fn parse_price(json: &Value, results: &Value) -> Price {
    let extracted = json
        .get("prices")
        .and_then(Value::as_array)
        .and_then(|prices| prices.first())
        .and_then(|first| first.get("extracted_price"))
        .and_then(Value::as_f64);
    if let Some(amount) = extracted {
        return Price::Amount(amount);
    }
    match results.get("price") {
        Some(Value::String(label)) => Price::Label(label.clone()),
        Some(Value::Number(n)) => Price::Amount(n.as_f64().unwrap_or(0.0)),
        _ => Price::default(),
    }
}

/// Link priority: exact organic match, then the canonical search URL, then the fallback.
pub fn parse_purchase_link(asin: &Asin, json: &Value) -> String {
    let organic = json
        .get("organic_results")
        .and_then(Value::as_array)
        .and_then(|results| {
            results
                .iter()
                .find(|r| r.get("asin").and_then(Value::as_str) == Some(asin.as_str()))
        })
        .and_then(|r| r.get("link"))
        .and_then(Value::as_str)
        .filter(|link| !link.is_empty());
    if let Some(link) = organic {
        return link.to_string();
    }

    let canonical = json
        .get("search_metadata")
        .and_then(|m| m.get("amazon_url"))
        .and_then(Value::as_str)
        .filter(|link| !link.is_empty());
    if let Some(link) = canonical {
        debug!(%asin, "no organic match, using search metadata URL");
        return link.to_string();
    }

    fallback_product_url(asin)
}
