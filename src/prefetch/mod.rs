//! Speculative loading of slices around the cursor.

mod neighborhood;
mod worker;

pub use neighborhood::prefetch_neighborhood;
pub use worker::PrefetchRequest;

pub(crate) use worker::spawn_prefetch_worker;
