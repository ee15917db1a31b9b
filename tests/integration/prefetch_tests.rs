//! Prefetch lifecycle integration tests.
//!
//! Tests verify:
//! - A newer cursor position supersedes an in-flight neighborhood
//! - Unloading a side stops its worker and its progressive sweep
//! - Subscriptions survive an unload/reload cycle

use std::sync::Arc;
use std::time::Duration;

use slice_streamer::store::Compression;
use slice_streamer::{Axis, EngineConfig, Side, SliceKey, SliceOrigin, VolumeEngine};

use super::test_utils::{drain_events, volume_bytes, SlowChunkReader};

const CHUNK_DELAY: Duration = Duration::from_millis(50);

/// Slow reader over a one-slab-per-chunk container, so every slice read
/// costs exactly one delayed chunk fetch.
fn slow_reader(shape: [usize; 3]) -> Arc<SlowChunkReader> {
    Arc::new(SlowChunkReader::new(
        volume_bytes(shape, 1, Compression::None),
        CHUNK_DELAY,
    ))
}

// =============================================================================
// Supersession
// =============================================================================

#[tokio::test]
async fn test_newer_cursor_supersedes_older_neighborhood() {
    let engine = VolumeEngine::with_config(EngineConfig::default().with_prefetch_radius(2));
    engine
        .load_side_with(Side::Full, slow_reader([64, 4, 4]))
        .await
        .unwrap();
    let mut sub = engine.subscribe(Side::Full).await;

    engine
        .notify_cursor_moved(Side::Full, Axis::Depth, 10)
        .await
        .unwrap();
    // Land the second move while the first neighborhood is still being read
    tokio::time::sleep(CHUNK_DELAY / 2).await;
    engine
        .notify_cursor_moved(Side::Full, Axis::Depth, 40)
        .await
        .unwrap();

    let events = drain_events(&mut sub, Duration::from_millis(500)).await;
    let keys: Vec<SliceKey> = events.iter().map(|e| e.snapshot.key()).collect();

    // The newer neighborhood arrives in full
    for index in [41, 39, 42, 38] {
        assert!(
            keys.contains(&SliceKey::new(Axis::Depth, index)),
            "missing neighbor {index} in {keys:?}"
        );
    }
    // The older one is abandoned after at most the read in flight
    let stale: Vec<_> = keys.iter().filter(|k| k.index < 20).collect();
    assert!(
        stale.len() <= 1,
        "stale neighborhood was not superseded: {stale:?}"
    );
}

#[tokio::test]
async fn test_burst_of_moves_collapses_to_latest() {
    let engine = VolumeEngine::with_config(EngineConfig::default().with_prefetch_radius(1));
    let reader = slow_reader([64, 4, 4]);
    engine
        .load_side_with(Side::Full, reader.clone())
        .await
        .unwrap();
    let mut sub = engine.subscribe(Side::Full).await;

    // A fast scroll: five positions queued before the worker can react
    for index in [10, 15, 20, 25, 30] {
        engine
            .notify_cursor_moved(Side::Full, Axis::Depth, index)
            .await
            .unwrap();
    }

    let events = drain_events(&mut sub, Duration::from_millis(500)).await;
    let keys: Vec<SliceKey> = events.iter().map(|e| e.snapshot.key()).collect();

    // Only the final neighborhood is fetched in full
    assert!(keys.contains(&SliceKey::new(Axis::Depth, 31)), "{keys:?}");
    assert!(keys.contains(&SliceKey::new(Axis::Depth, 29)), "{keys:?}");
    // Five full neighborhoods would be ten reads; the backlog collapses
    // to far fewer
    assert!(
        reader.chunk_reads() <= 4,
        "backlog was not collapsed: {} chunk reads",
        reader.chunk_reads()
    );
}

// =============================================================================
// Unload
// =============================================================================

#[tokio::test]
async fn test_unload_stops_prefetch_worker() {
    let engine = VolumeEngine::with_config(EngineConfig::default().with_prefetch_radius(3));
    engine
        .load_side_with(Side::Full, slow_reader([64, 4, 4]))
        .await
        .unwrap();
    let mut sub = engine.subscribe(Side::Full).await;

    engine
        .notify_cursor_moved(Side::Full, Axis::Depth, 30)
        .await
        .unwrap();
    tokio::time::sleep(CHUNK_DELAY / 2).await;
    engine.unload_side(Side::Full).await.unwrap();

    // Radius 3 would deliver six neighbors; only the read already in
    // flight may still land
    let events = drain_events(&mut sub, Duration::from_millis(500)).await;
    assert!(
        events.len() <= 1,
        "worker kept fetching after unload: {} events",
        events.len()
    );

    // The subscription survives; a reload puts it back in business
    engine
        .load_side_with(Side::Full, slow_reader([64, 4, 4]))
        .await
        .unwrap();
    engine
        .notify_cursor_moved(Side::Full, Axis::Depth, 5)
        .await
        .unwrap();
    let events = drain_events(&mut sub, Duration::from_millis(500)).await;
    assert_eq!(events.len(), 6);
    assert!(events.iter().all(|e| e.origin == SliceOrigin::Prefetch));
}

#[tokio::test]
async fn test_unload_aborts_progressive_sweep() {
    let engine = VolumeEngine::new();
    // Depth 120 splits the sweep into batches of 100 and 20
    let reader = Arc::new(SlowChunkReader::new(
        volume_bytes([120, 2, 2], 16, Compression::None),
        CHUNK_DELAY,
    ));
    engine
        .load_side_with(Side::Full, reader.clone())
        .await
        .unwrap();
    let mut sub = engine.subscribe(Side::Full).await;

    engine.start_progressive_load(Side::Full).await.unwrap();
    tokio::time::sleep(CHUNK_DELAY).await;
    engine.unload_side(Side::Full).await.unwrap();

    let events = drain_events(&mut sub, Duration::from_millis(500)).await;
    assert!(
        events.len() < 120,
        "sweep ran to completion after unload: {} events",
        events.len()
    );
    assert!(events
        .iter()
        .all(|e| e.origin == SliceOrigin::ProgressiveLoad));
}
