pub mod handlers;
pub mod models;
pub mod openapi;

use crate::infrastructure::{fetcher::ProductApi, store::BlobBackend};
use axum::{Router, http::header, routing::get};
use handlers::AppState;
use openapi::ApiDoc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Full application router: health check, API under `/api`, and the OpenAPI document.
pub fn app<B, A>(state: AppState<B, A>) -> Router
where
    B: BlobBackend + 'static,
    A: ProductApi + 'static,
{
    Router::new()
        .route("/", get(|| async { "OK" }))
        .nest("/api", handlers::api_routes(state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([http::Method::GET, http::Method::POST])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
}
