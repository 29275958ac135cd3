pub mod api;
pub mod config;
pub mod core;
pub mod devtools;
pub mod infrastructure;

pub use crate::core::errors::AsinCacheError;
pub use crate::core::services::{CacheService, InvalidationService};
pub use crate::devtools::InvalidationController;
pub use crate::infrastructure::bus::NotificationBus;

#[cfg(test)]
mod tests; // Include integration tests
