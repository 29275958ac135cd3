use crate::{
    api::models::*,
    core::{
        errors::AsinCacheError,
        models::{Asin, ProductRecord},
        services::{CacheService, InvalidationService},
    },
    infrastructure::{fetcher::ProductApi, store::BlobBackend},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub struct AppState<B: BlobBackend, A: ProductApi> {
    pub cache: Arc<CacheService<B, A>>,
    pub invalidation: Arc<InvalidationService<B, A>>,
    pub tracked: Arc<Vec<Asin>>,
}

impl<B: BlobBackend, A: ProductApi> Clone for AppState<B, A> {
    fn clone(&self) -> Self {
        AppState {
            cache: self.cache.clone(),
            invalidation: self.invalidation.clone(),
            tracked: self.tracked.clone(),
        }
    }
}

// Define API routes
pub fn api_routes<B, A>(state: AppState<B, A>) -> Router
where
    B: BlobBackend + 'static,
    A: ProductApi + 'static,
{
    Router::new()
        .route("/asins", get(resolve_asins::<B, A>))
        .route("/asins/invalidate", post(invalidate_asins::<B, A>))
        .route("/asins/expire", post(expire_asins::<B, A>))
        .route("/asins/{asin}", get(get_asin::<B, A>))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/asins",
    params(ResolveQuery),
    responses(
        (status = 200, description = "Product records keyed by ASIN", body = HashMap<String, ProductRecord>),
        (status = 400, description = "Malformed ASIN or nothing to resolve", body = ErrorResponse)
    )
)]
pub(crate) async fn resolve_asins<B: BlobBackend, A: ProductApi>(
    State(state): State<AppState<B, A>>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<HashMap<Asin, ProductRecord>>, ApiError> {
    let requested = match query.asins.as_deref() {
        Some(raw) => Asin::parse_list(raw)?,
        None => Vec::new(),
    };
    let keys = if requested.is_empty() {
        state.tracked.to_vec()
    } else {
        requested
    };
    if keys.is_empty() {
        return Err(AsinCacheError::InvalidInput("No ASINs requested and none are tracked".to_string()).into());
    }
    debug!(count = keys.len(), "resolving ASINs");
    Ok(Json(state.cache.resolve(&keys).await))
}

#[utoipa::path(
    get,
    path = "/api/asins/{asin}",
    params(("asin" = String, Path, description = "ASIN to resolve")),
    responses(
        (status = 200, description = "Product record", body = ProductRecord),
        (status = 404, description = "No usable record for this ASIN", body = ErrorResponse)
    )
)]
pub(crate) async fn get_asin<B: BlobBackend, A: ProductApi>(
    State(state): State<AppState<B, A>>,
    Path(asin): Path<String>,
) -> Result<Json<ProductRecord>, ApiError> {
    let asin = Asin::parse(&asin)?;
    Ok(Json(state.cache.resolve_one(&asin).await?))
}

#[utoipa::path(
    post,
    path = "/api/asins/invalidate",
    request_body = AsinListRequest,
    responses(
        (status = 200, description = "Entries deleted and refetched", body = InvalidateResponse),
        (status = 400, description = "Empty or malformed ASIN list", body = ErrorResponse)
    )
)]
pub(crate) async fn invalidate_asins<B: BlobBackend, A: ProductApi>(
    State(state): State<AppState<B, A>>,
    Json(req): Json<AsinListRequest>,
) -> Result<Json<InvalidateResponse>, ApiError> {
    let keys = req.parse()?;
    let outcome = state.invalidation.invalidate(&keys).await;
    Ok(Json(InvalidateResponse {
        success: true,
        invalidated_count: outcome.invalidated_count,
        fresh_data: outcome.fresh_data,
    }))
}

#[utoipa::path(
    post,
    path = "/api/asins/expire",
    request_body = AsinListRequest,
    responses(
        (status = 200, description = "Entries marked expired in place", body = ExpireResponse),
        (status = 400, description = "Empty or malformed ASIN list", body = ErrorResponse)
    )
)]
pub(crate) async fn expire_asins<B: BlobBackend, A: ProductApi>(
    State(state): State<AppState<B, A>>,
    Json(req): Json<AsinListRequest>,
) -> Result<Json<ExpireResponse>, ApiError> {
    let keys = req.parse()?;
    let expired_count = state.cache.expire(&keys).await;
    Ok(Json(ExpireResponse { expired_count }))
}
