//! Test utilities for integration tests.
//!
//! This module provides deterministic volume fixtures, on-disk container
//! builders, and instrumented readers for cache and prefetch assertions.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use slice_streamer::error::StoreError;
use slice_streamer::store::{ChunkReader, Compression, VolumeFileWriter, SUPERBLOCK_LEN};
use slice_streamer::{SliceEvent, SliceSubscription};

// =============================================================================
// Deterministic Volume Fixtures
// =============================================================================

/// Voxel data for `shape`, each voxel holding its linear index modulo 256.
pub fn volume_data(shape: [usize; 3]) -> Vec<u8> {
    let len = shape[0] * shape[1] * shape[2];
    (0..len).map(|i| (i % 256) as u8).collect()
}

/// Expected payload of the depth plane at `index`.
pub fn expected_depth_slice(shape: [usize; 3], index: usize) -> Vec<u8> {
    let [_, height, width] = shape;
    let base = index * height * width;
    (0..height * width)
        .map(|i| ((base + i) % 256) as u8)
        .collect()
}

/// Expected payload of the height plane at `index`.
pub fn expected_height_slice(shape: [usize; 3], index: usize) -> Vec<u8> {
    let [depth, height, width] = shape;
    let mut data = Vec::with_capacity(depth * width);
    for d in 0..depth {
        for w in 0..width {
            data.push(((d * height * width + index * width + w) % 256) as u8);
        }
    }
    data
}

/// Expected payload of the width plane at `index`.
pub fn expected_width_slice(shape: [usize; 3], index: usize) -> Vec<u8> {
    let [depth, height, width] = shape;
    let mut data = Vec::with_capacity(depth * height);
    for d in 0..depth {
        for h in 0..height {
            data.push(((d * height * width + h * width + index) % 256) as u8);
        }
    }
    data
}

/// Encode a single-dataset container holding [`volume_data`].
pub fn volume_bytes(shape: [usize; 3], chunk_depth: u64, compression: Compression) -> Vec<u8> {
    VolumeFileWriter::new()
        .with_compression(compression)
        .with_chunk_depth(chunk_depth)
        .add_dataset(
            "data",
            &[shape[0] as u64, shape[1] as u64, shape[2] as u64],
            volume_data(shape),
        )
        .unwrap()
        .encode()
        .unwrap()
}

/// Write a single-dataset container under `dir` and return its path.
pub async fn write_volume_file(
    dir: &Path,
    name: &str,
    shape: [usize; 3],
    chunk_depth: u64,
    compression: Compression,
) -> PathBuf {
    let path = dir.join(name);
    tokio::fs::write(&path, volume_bytes(shape, chunk_depth, compression))
        .await
        .unwrap();
    path
}

// =============================================================================
// Instrumented Readers
// =============================================================================

fn read_range(data: &[u8], offset: u64, len: usize) -> Result<Bytes, StoreError> {
    let end = offset as usize + len;
    if end > data.len() {
        return Err(StoreError::RangeOutOfBounds {
            offset,
            requested: len as u64,
            size: data.len() as u64,
        });
    }
    Ok(Bytes::copy_from_slice(&data[offset as usize..end]))
}

fn data_start_of(container: &[u8]) -> u64 {
    let header_len = u64::from_le_bytes(container[8..16].try_into().unwrap());
    SUPERBLOCK_LEN + header_len
}

/// In-memory reader counting every byte-range request.
pub struct TrackingChunkReader {
    data: Vec<u8>,
    reads: AtomicUsize,
}

impl TrackingChunkReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            reads: AtomicUsize::new(0),
        }
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChunkReader for TrackingChunkReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        read_range(&self.data, offset, len)
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn identifier(&self) -> &str {
        "tracking"
    }
}

/// In-memory reader that sleeps before serving chunk payloads.
///
/// Superblock and header reads stay fast so opening is instant; only
/// reads into the data region pay the delay. This models a container on
/// slow storage and gives supersession tests a window to land a newer
/// cursor position while a prefetch read is still in flight.
pub struct SlowChunkReader {
    data: Vec<u8>,
    data_start: u64,
    delay: Duration,
    chunk_reads: AtomicUsize,
}

impl SlowChunkReader {
    pub fn new(data: Vec<u8>, delay: Duration) -> Self {
        Self {
            data_start: data_start_of(&data),
            data,
            delay,
            chunk_reads: AtomicUsize::new(0),
        }
    }

    /// Number of reads that touched the data region.
    pub fn chunk_reads(&self) -> usize {
        self.chunk_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChunkReader for SlowChunkReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, StoreError> {
        if offset >= self.data_start {
            self.chunk_reads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
        }
        read_range(&self.data, offset, len)
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn identifier(&self) -> &str {
        "slow"
    }
}

/// In-memory reader that fails the next chunk read after being armed.
///
/// Header reads always succeed, so containers open normally and the
/// failure lands on exactly one slice or batch read.
pub struct FailingChunkReader {
    data: Vec<u8>,
    data_start: u64,
    fail_next: AtomicBool,
}

impl FailingChunkReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data_start: data_start_of(&data),
            data,
            fail_next: AtomicBool::new(false),
        }
    }

    /// Make the next data-region read fail.
    pub fn arm(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChunkReader for FailingChunkReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, StoreError> {
        if offset >= self.data_start && self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Io("injected chunk read failure".to_string()));
        }
        read_range(&self.data, offset, len)
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn identifier(&self) -> &str {
        "failing"
    }
}

// =============================================================================
// Event Collection
// =============================================================================

/// Receive one event, failing the test after five seconds.
pub async fn next_event(sub: &mut SliceSubscription) -> SliceEvent {
    tokio::time::timeout(Duration::from_secs(5), sub.recv())
        .await
        .expect("timed out waiting for slice event")
        .expect("hub closed")
}

/// Drain events until the stream stays quiet for `quiet`.
pub async fn drain_events(sub: &mut SliceSubscription, quiet: Duration) -> Vec<SliceEvent> {
    let mut events = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout(quiet, sub.recv()).await {
        events.push(event);
    }
    events
}
