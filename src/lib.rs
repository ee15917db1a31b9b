//! # Slice Streamer
//!
//! A slice cache and prefetch engine for interactive viewing of large
//! chunked, compressed 3D volumes.
//!
//! This library backs a viewer that navigates orthogonal 2D slices of
//! volumetric datasets stored in a single-file container. Chunks are
//! decompressed on demand, extracted slices are cached, and a per-volume
//! prefetcher keeps the cursor's neighborhood warm so scrolling stays
//! responsive on volumes far larger than memory.
//!
//! ## Features
//!
//! - **On-demand slice extraction**: Decodes only the chunks a requested
//!   slice touches, along any of the three axes
//! - **LRU slice caching**: Bounded per-volume cache with hit/miss accounting
//! - **Cursor-driven prefetch**: A background worker fetches neighboring
//!   slices, always collapsing its backlog to the latest cursor position
//! - **Progressive first pass**: Batched full-volume sweep that announces
//!   slices as they decode, without flooding the cache
//! - **Slice notifications**: Per-side subscriptions deliver ready slices
//!   to any number of consumers
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`store`] - Container format, chunk reading and the gzip codec
//! - [`volume`] - Dataset resolution and slice extraction
//! - [`slice`] - Slice keys, snapshots and the LRU cache
//! - [`prefetch`] - Neighborhood ordering and the prefetch worker
//! - [`notify`] - Slice event hub and subscriptions
//! - [`engine`] - The façade tying sides, caches and workers together
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use slice_streamer::{Axis, EngineConfig, Side, VolumeEngine};
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = VolumeEngine::with_config(EngineConfig::default());
//!
//!     engine.load_side(Side::Full, "scan.volc").await.unwrap();
//!
//!     // Fetch the slice under the cursor, then warm its neighbors.
//!     let snapshot = engine
//!         .request_slice(Side::Full, Axis::Depth, 42)
//!         .await
//!         .unwrap();
//!     println!("{}x{} slice ready", snapshot.rows(), snapshot.cols());
//!
//!     engine
//!         .notify_cursor_moved(Side::Full, Axis::Depth, 42)
//!         .await
//!         .unwrap();
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod notify;
pub mod prefetch;
pub mod slice;
pub mod store;
pub mod volume;

// Re-export commonly used types
pub use config::{
    progressive_chunk_size, BenchConfig, Cli, Command, EngineConfig, InspectConfig,
    DEFAULT_BENCH_STEPS, DEFAULT_PREFETCH_RADIUS,
};
pub use engine::{Side, VolumeEngine};
pub use error::{EngineError, StoreError, VolumeError};
pub use notify::{NotificationHub, SliceEvent, SliceOrigin, SliceSubscription, SubscriberId};
pub use prefetch::{prefetch_neighborhood, PrefetchRequest};
pub use slice::{
    Axis, CacheStats, SliceCache, SliceKey, SliceSnapshot, DEFAULT_SLICE_CACHE_CAPACITY,
};
pub use store::{
    compress_chunk, decompress_chunk, ChunkReader, ChunkRecord, Compression, Container,
    DatasetRecord, ElementType, FileChunkReader, VolumeFileWriter, VolumeHeader,
    DEFAULT_CHUNK_DEPTH, FORMAT_VERSION, MAGIC, SUPERBLOCK_LEN,
};
pub use volume::{resolve_dataset, VolumeHandle, VolumeReader, DEFAULT_DATASET_NAME};
