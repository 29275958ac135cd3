use crate::core::models::{asin::Asin, product::ProductRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

/// Event name published after every invalidation batch.
pub const ASIN_CACHE_INVALIDATOR: &str = "asin-cache-invalidator";

/// Payload of [`ASIN_CACHE_INVALIDATOR`]: the freshly fetched records of one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub asin_data: HashMap<Asin, ProductRecord>,
}

impl NotificationEvent {
    pub fn new(asin_data: HashMap<Asin, ProductRecord>) -> Self {
        NotificationEvent { asin_data }
    }

    pub fn keys(&self) -> impl Iterator<Item = &Asin> {
        self.asin_data.keys()
    }
}
