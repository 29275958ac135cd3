use crate::core::errors::AsinCacheError;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Amazon Standard Identification Number, the opaque key of one cached product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Asin(String);

impl Asin {
    pub fn parse(raw: &str) -> Result<Self, AsinCacheError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AsinCacheError::InvalidInput("ASIN must not be empty".to_string()));
        }
        if trimmed.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(AsinCacheError::InvalidInput(format!("Malformed ASIN `{}`", trimmed)));
        }
        Ok(Asin(trimmed.to_string()))
    }

    /// Parses a comma separated list, skipping empty segments.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, AsinCacheError> {
        raw.split(',')
            .filter(|s| !s.trim().is_empty())
            .map(Asin::parse)
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Asin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Asin {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
