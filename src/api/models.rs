use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};

use crate::core::errors::AsinCacheError;
use crate::core::models::{Asin, ProductRecord};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ResolveQuery {
    /// Comma separated ASINs; the tracked set is used when omitted
    pub asins: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct AsinListRequest {
    pub asins: Vec<String>,
}

impl AsinListRequest {
    pub fn parse(&self) -> Result<Vec<Asin>, AsinCacheError> {
        if self.asins.is_empty() {
            return Err(AsinCacheError::InvalidInput("At least one ASIN is required".to_string()));
        }
        self.asins.iter().map(|raw| Asin::parse(raw)).collect()
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateResponse {
    pub success: bool,
    pub invalidated_count: usize,
    pub fresh_data: HashMap<Asin, ProductRecord>,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpireResponse {
    pub expired_count: usize,
}

// Error response struct
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

// Newtype wrapper for AsinCacheError to implement IntoResponse
pub struct ApiError(pub AsinCacheError);

impl From<AsinCacheError> for ApiError {
    fn from(err: AsinCacheError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            AsinCacheError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AsinCacheError::NotFound(_) => StatusCode::NOT_FOUND,
            AsinCacheError::UpstreamInvalidResponse(..) | AsinCacheError::UpstreamTransportFailure(..) => {
                StatusCode::BAD_GATEWAY
            }
            AsinCacheError::StoreUnavailable(_)
            | AsinCacheError::MissingConfig(_)
            | AsinCacheError::InvalidConfig(..)
            | AsinCacheError::NotificationFailed(_)
            | AsinCacheError::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorResponse { error: self.0.to_string() })).into_response()
    }
}
