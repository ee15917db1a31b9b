//! Slice identity and the bounded slice cache.

mod cache;
mod snapshot;

pub use cache::{CacheStats, SliceCache, DEFAULT_SLICE_CACHE_CAPACITY};
pub use snapshot::{Axis, SliceKey, SliceSnapshot};
