pub mod invalidation;
pub mod read_through;

pub use invalidation::{InvalidationOutcome, InvalidationService};
pub use read_through::{CachePolicy, CacheService};

use crate::core::models::Asin;
use std::collections::BTreeSet;

/// Sorted, duplicate-free copy of `keys`.
pub(crate) fn unique_keys(keys: &[Asin]) -> Vec<Asin> {
    keys.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect()
}
