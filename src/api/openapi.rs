use utoipa::OpenApi;

use crate::{
    api::models::{AsinListRequest, ErrorResponse, ExpireResponse, InvalidateResponse},
    core::models::{Asin, Price, ProductRecord},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::handlers::resolve_asins,
        super::handlers::get_asin,
        super::handlers::invalidate_asins,
        super::handlers::expire_asins
    ),
    components(schemas(
        AsinListRequest,
        InvalidateResponse,
        ExpireResponse,
        ErrorResponse,
        Asin,
        Price,
        ProductRecord
    )),
    info(
        title = "ASIN Cache API",
        description = "Read-through cache and invalidation for book product data",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;
