pub mod asin;
pub mod entry;
pub mod event;
pub mod product;

pub use asin::Asin;
pub use entry::CacheEntry;
pub use event::{ASIN_CACHE_INVALIDATOR, NotificationEvent};
pub use product::{Price, ProductAttributes, ProductRecord};
