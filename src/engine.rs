//! The consumer-facing engine tying the pieces together.
//!
//! A [`VolumeEngine`] manages up to two loaded volumes, one per [`Side`].
//! Each side owns its reader, its slice cache, and one background
//! prefetch worker:
//!
//! ```text
//!                 request_slice            notify_cursor_moved
//!                      |                           |
//!                      v                           v
//!                +-----------+  miss   +---------------------+
//!                | SliceCache| ------> | VolumeReader        |
//!                +-----------+         +---------------------+
//!                      ^                           ^
//!                      |   insert + announce      | reads
//!                +---------------------------------------+
//!                |        prefetch worker (per side)     |
//!                +---------------------------------------+
//! ```
//!
//! Every completed load, whatever its path, is announced through the
//! shared [`NotificationHub`] so consumers can react without polling.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::config::{progressive_chunk_size, EngineConfig};
use crate::error::{EngineError, VolumeError};
use crate::notify::{NotificationHub, SliceOrigin, SliceSubscription, SubscriberId};
use crate::prefetch::{spawn_prefetch_worker, PrefetchRequest};
use crate::slice::{Axis, CacheStats, SliceCache, SliceKey, SliceSnapshot};
use crate::store::{ChunkReader, FileChunkReader};
use crate::volume::{VolumeHandle, VolumeReader};

// =============================================================================
// Side
// =============================================================================

/// The two volumes a viewing session works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The full field of view
    Full,
    /// The cropped region of interest
    Roi,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Full => write!(f, "full"),
            Side::Roi => write!(f, "roi"),
        }
    }
}

// =============================================================================
// SideContext
// =============================================================================

/// Everything one loaded side owns.
///
/// The generation counter coordinates prefetch supersession: every
/// cursor notification bumps it, and the worker compares its request's
/// generation against the live value before each read. The stop flag
/// covers unload, which must also halt a progressive sweep in flight.
pub(crate) struct SideContext {
    side: Side,
    reader: VolumeReader,
    cache: SliceCache,
    hub: Arc<NotificationHub>,
    generation: AtomicU64,
    stop: AtomicBool,
}

impl SideContext {
    fn new(
        side: Side,
        reader: VolumeReader,
        cache_capacity: usize,
        hub: Arc<NotificationHub>,
    ) -> Arc<Self> {
        Arc::new(Self {
            side,
            reader,
            cache: SliceCache::with_capacity(cache_capacity),
            hub,
            generation: AtomicU64::new(0),
            stop: AtomicBool::new(false),
        })
    }

    pub(crate) fn side(&self) -> Side {
        self.side
    }

    pub(crate) fn reader(&self) -> &VolumeReader {
        &self.reader
    }

    pub(crate) fn cache(&self) -> &SliceCache {
        &self.cache
    }

    pub(crate) fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn advance_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }
}

/// Registry entry for one loaded side.
struct SideEntry {
    ctx: Arc<SideContext>,

    /// Feeds the side's prefetch worker. Dropped with the entry, which
    /// closes the channel and lets the worker exit.
    prefetch_tx: mpsc::UnboundedSender<PrefetchRequest>,
}

// =============================================================================
// VolumeEngine
// =============================================================================

/// Slice cache and prefetch engine over per-side volumes.
///
/// The engine:
/// - Opens one volume per side and keeps a bounded slice cache for each
/// - Serves slice requests cache-first, reading synchronously on a miss
/// - Turns cursor notifications into background neighborhood prefetch
/// - Announces every completed load through its notification hub
///
/// Thread-safe; share across tasks via `Arc`.
pub struct VolumeEngine {
    config: EngineConfig,
    hub: Arc<NotificationHub>,
    sides: RwLock<HashMap<Side, SideEntry>>,
}

impl VolumeEngine {
    /// Create an engine with default cache capacity and prefetch radius.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with explicit tuning.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            hub: Arc::new(NotificationHub::new()),
            sides: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open the container file at `path` and load it as `side`.
    pub async fn load_side(
        &self,
        side: Side,
        path: impl AsRef<Path>,
    ) -> Result<VolumeHandle, EngineError> {
        let path = path.as_ref();
        let reader = FileChunkReader::open(path)
            .await
            .map_err(|e| VolumeError::OpenFailure {
                identifier: path.display().to_string(),
                reason: e.to_string(),
            })?;
        self.load_side_with(side, Arc::new(reader)).await
    }

    /// Load a volume for `side` from an already-open byte source.
    pub async fn load_side_with(
        &self,
        side: Side,
        reader: Arc<dyn ChunkReader>,
    ) -> Result<VolumeHandle, EngineError> {
        {
            let sides = self.sides.read().await;
            if sides.contains_key(&side) {
                return Err(EngineError::SideAlreadyLoaded(side));
            }
        }

        let volume = VolumeReader::open(reader).await?;
        let handle = volume.handle().clone();

        let ctx = SideContext::new(side, volume, self.config.cache_capacity, self.hub.clone());
        let prefetch_tx = spawn_prefetch_worker(ctx.clone());

        let mut sides = self.sides.write().await;
        if sides.contains_key(&side) {
            // Lost a load race for this side; retire the worker we spawned
            ctx.request_stop();
            return Err(EngineError::SideAlreadyLoaded(side));
        }
        info!(
            side = %side,
            identifier = %handle.identifier(),
            shape = ?handle.shape(),
            "volume loaded"
        );
        sides.insert(side, SideEntry { ctx, prefetch_tx });
        Ok(handle)
    }

    /// Unload `side`, stopping its prefetch worker and any progressive
    /// sweep. Subscriptions survive and resume if the side is reloaded.
    pub async fn unload_side(&self, side: Side) -> Result<(), EngineError> {
        let entry = {
            let mut sides = self.sides.write().await;
            sides.remove(&side)
        }
        .ok_or(EngineError::SideNotLoaded(side))?;

        entry.ctx.request_stop();
        info!(side = %side, "volume unloaded");
        Ok(())
    }

    pub async fn is_loaded(&self, side: Side) -> bool {
        let sides = self.sides.read().await;
        sides.contains_key(&side)
    }

    /// Handle describing the volume loaded for `side`.
    pub async fn handle(&self, side: Side) -> Result<VolumeHandle, EngineError> {
        Ok(self.context(side).await?.reader.handle().clone())
    }

    /// Shape of the volume loaded for `side`, as `[depth, height, width]`.
    pub async fn shape(&self, side: Side) -> Result<[usize; 3], EngineError> {
        Ok(self.context(side).await?.reader.shape())
    }

    /// Cache counters for `side`.
    pub async fn cache_stats(&self, side: Side) -> Result<CacheStats, EngineError> {
        Ok(self.context(side).await?.cache.stats().await)
    }

    /// Drop every cached slice for `side` and reset its counters.
    pub async fn clear_cache(&self, side: Side) -> Result<(), EngineError> {
        self.context(side).await?.cache.clear().await;
        Ok(())
    }

    /// Fetch one slice, cache-first.
    ///
    /// On a hit the cached copy is returned directly. On a miss the
    /// slice is read synchronously, cached, announced with origin
    /// [`SliceOrigin::DirectLoad`], and returned. Out-of-range indices
    /// fail; the engine never clamps.
    pub async fn request_slice(
        &self,
        side: Side,
        axis: Axis,
        index: usize,
    ) -> Result<SliceSnapshot, EngineError> {
        let ctx = self.context(side).await?;
        let key = SliceKey::new(axis, index);

        // Fast path: cache hit
        if let Some(snapshot) = ctx.cache.get(&key).await {
            debug!(side = %side, %key, "slice served from cache");
            return Ok(snapshot);
        }

        // Miss: read, cache a copy, announce
        let snapshot = ctx.reader.read_slice(axis, index).await?;
        ctx.cache.put(snapshot.clone()).await;
        ctx.hub.publish(side, SliceOrigin::DirectLoad, &snapshot).await;
        debug!(side = %side, %key, "slice loaded directly");
        Ok(snapshot)
    }

    /// Tell the engine where the cursor is now.
    ///
    /// Returns as soon as the position is handed to the side's prefetch
    /// worker; it never waits for any read. Each call supersedes all
    /// earlier ones for this side.
    pub async fn notify_cursor_moved(
        &self,
        side: Side,
        axis: Axis,
        index: usize,
    ) -> Result<(), EngineError> {
        let sides = self.sides.read().await;
        let entry = sides.get(&side).ok_or(EngineError::SideNotLoaded(side))?;

        let generation = entry.ctx.advance_generation();
        let request = PrefetchRequest {
            axis,
            origin: index,
            radius: self.config.prefetch_radius,
            generation,
        };
        // The worker only goes away when the side unloads; losing that
        // race just means there is nobody left to prefetch for
        let _ = entry.prefetch_tx.send(request);
        Ok(())
    }

    /// Subscribe to slice-ready events for `side`.
    ///
    /// Subscribing does not require the side to be loaded; events start
    /// flowing once it is.
    pub async fn subscribe(&self, side: Side) -> SliceSubscription {
        self.hub.subscribe(side).await
    }

    /// Remove a subscription explicitly. Dropping it has the same effect.
    pub async fn unsubscribe(&self, side: Side, id: SubscriberId) -> bool {
        self.hub.unsubscribe(side, id).await
    }

    /// Start the progressive first sweep for `side`.
    ///
    /// A background task walks the depth axis in batches sized by
    /// [`progressive_chunk_size`], announcing every slice with origin
    /// [`SliceOrigin::ProgressiveLoad`]. The sweep does not populate the
    /// slice cache; consumers own the snapshots they receive. Unloading
    /// the side aborts the sweep at the next batch boundary.
    pub async fn start_progressive_load(&self, side: Side) -> Result<(), EngineError> {
        let ctx = self.context(side).await?;
        tokio::spawn(run_progressive_load(ctx));
        Ok(())
    }

    async fn context(&self, side: Side) -> Result<Arc<SideContext>, EngineError> {
        let sides = self.sides.read().await;
        sides
            .get(&side)
            .map(|entry| entry.ctx.clone())
            .ok_or(EngineError::SideNotLoaded(side))
    }
}

impl Default for VolumeEngine {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Progressive first sweep
// =============================================================================

async fn run_progressive_load(ctx: Arc<SideContext>) {
    let depth = ctx.reader.extent(Axis::Depth);
    let batch = progressive_chunk_size(depth);
    info!(side = %ctx.side, depth, batch, "progressive load started");

    let mut start = 0;
    while start < depth {
        if ctx.stopped() {
            debug!(side = %ctx.side, start, "progressive load aborted");
            return;
        }

        let count = batch.min(depth - start);
        match ctx.reader.read_depth_range(start, count).await {
            Ok(slices) => {
                for snapshot in slices {
                    ctx.hub
                        .publish(ctx.side, SliceOrigin::ProgressiveLoad, &snapshot)
                        .await;
                }
            }
            Err(e) => {
                warn!(
                    side = %ctx.side,
                    start,
                    count,
                    error = %e,
                    "progressive batch failed"
                );
            }
        }
        start += count;
    }
    info!(side = %ctx.side, "progressive load complete");
}

// =============================================================================
// Tests
// =============================================================================
