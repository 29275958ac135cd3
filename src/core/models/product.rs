use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Price as reported upstream: a parsed amount when available, the raw label otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum Price {
    Amount(f64),
    Label(String),
}

impl Default for Price {
    fn default() -> Self {
        Price::Amount(0.0)
    }
}

impl Price {
    pub fn is_zero(&self) -> bool {
        match self {
            Price::Amount(amount) => *amount == 0.0,
            Price::Label(label) => label.trim().is_empty(),
        }
    }
}

/// Attribute half of a product record, everything except the purchase link.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductAttributes {
    pub title: String,
    pub thumbnails: Vec<String>,
    pub rating: f64,
    pub review_count: u64,
    pub price: Price,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "link")]
    pub purchase_link: String,
    #[serde(default)]
    pub thumbnails: Vec<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default, alias = "reviews")]
    pub review_count: u64,
    #[serde(default)]
    pub price: Price,
}

impl ProductRecord {
    pub fn from_parts(attributes: ProductAttributes, purchase_link: String) -> Self {
        ProductRecord {
            title: attributes.title,
            purchase_link,
            thumbnails: attributes.thumbnails,
            rating: attributes.rating,
            review_count: attributes.review_count,
            price: attributes.price,
        }
    }

    /// True when the attribute lookup produced nothing usable.
    ///
    /// Such a record still carries a purchase link, so pages can render a buy
    /// button, but it reads as "not found" everywhere else.
    pub fn is_degraded(&self) -> bool {
        self.title.is_empty()
            && self.thumbnails.is_empty()
            && self.rating == 0.0
            && self.review_count == 0
            && self.price.is_zero()
    }
}
