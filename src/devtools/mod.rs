//! Operator panel that forces cache invalidation per ASIN or for the whole tracked set.

pub mod controller;
pub mod remote;

pub use controller::{InvalidationController, KeyStatus, PanelSnapshot, Settled};
pub use remote::HttpInvalidator;

use crate::core::errors::AsinCacheError;
use crate::core::models::Asin;
use crate::core::services::{InvalidationOutcome, InvalidationService};
use crate::infrastructure::fetcher::ProductApi;
use crate::infrastructure::store::BlobBackend;
use async_trait::async_trait;
use std::sync::Arc;

/// Whatever the panel calls to invalidate keys: the service in-process, or the HTTP endpoint.
#[async_trait]
pub trait Invalidator: Send + Sync + 'static {
    async fn request_invalidation(&self, keys: Vec<Asin>) -> Result<InvalidationOutcome, AsinCacheError>;
}

#[async_trait]
impl<B, A> Invalidator for InvalidationService<B, A>
where
    B: BlobBackend + 'static,
    A: ProductApi + 'static,
{
    async fn request_invalidation(&self, keys: Vec<Asin>) -> Result<InvalidationOutcome, AsinCacheError> {
        Ok(self.invalidate(&keys).await)
    }
}

#[async_trait]
impl<I: Invalidator + ?Sized> Invalidator for Arc<I> {
    async fn request_invalidation(&self, keys: Vec<Asin>) -> Result<InvalidationOutcome, AsinCacheError> {
        (**self).request_invalidation(keys).await
    }
}
