//! Container round-trip integration tests.
//!
//! Tests verify:
//! - Slice extraction from real files along all three axes
//! - Gzip and uncompressed storage serve identical voxels
//! - Dataset resolution across multi-dataset containers
//! - Damaged files fail at open or at read, never silently

use std::path::Path;
use std::sync::Arc;

use slice_streamer::error::VolumeError;
use slice_streamer::store::{Compression, FileChunkReader, VolumeFileWriter};
use slice_streamer::volume::VolumeReader;
use slice_streamer::Axis;

use super::test_utils::{
    expected_depth_slice, expected_height_slice, expected_width_slice, write_volume_file,
};

async fn open_file(path: &Path) -> VolumeReader {
    let reader = FileChunkReader::open(path).await.unwrap();
    VolumeReader::open(Arc::new(reader)).await.unwrap()
}

// =============================================================================
// Round Trips
// =============================================================================

#[tokio::test]
async fn test_file_round_trip_all_axes() {
    let dir = tempfile::tempdir().unwrap();
    let shape = [10, 6, 4];
    let path = write_volume_file(dir.path(), "vol.volc", shape, 3, Compression::Gzip).await;

    let volume = open_file(&path).await;
    assert_eq!(volume.shape(), shape);

    for index in [0, 4, 9] {
        let slice = volume.read_slice(Axis::Depth, index).await.unwrap();
        assert_eq!((slice.rows(), slice.cols()), (6, 4));
        assert_eq!(slice.data(), expected_depth_slice(shape, index).as_slice());
    }
    for index in [0, 3, 5] {
        let slice = volume.read_slice(Axis::Height, index).await.unwrap();
        assert_eq!((slice.rows(), slice.cols()), (10, 4));
        assert_eq!(slice.data(), expected_height_slice(shape, index).as_slice());
    }
    for index in [0, 2, 3] {
        let slice = volume.read_slice(Axis::Width, index).await.unwrap();
        assert_eq!((slice.rows(), slice.cols()), (10, 6));
        assert_eq!(slice.data(), expected_width_slice(shape, index).as_slice());
    }
}

#[tokio::test]
async fn test_compression_modes_serve_identical_voxels() {
    let dir = tempfile::tempdir().unwrap();
    let shape = [8, 5, 3];
    let gz = write_volume_file(dir.path(), "gz.volc", shape, 4, Compression::Gzip).await;
    let raw = write_volume_file(dir.path(), "raw.volc", shape, 4, Compression::None).await;

    let gz_volume = open_file(&gz).await;
    let raw_volume = open_file(&raw).await;

    for axis in Axis::ALL {
        let a = gz_volume.read_slice(axis, 1).await.unwrap();
        let b = raw_volume.read_slice(axis, 1).await.unwrap();
        assert_eq!(a.into_data(), b.into_data(), "axis {axis} disagrees");
    }
}

#[tokio::test]
async fn test_single_chunk_volume() {
    let dir = tempfile::tempdir().unwrap();
    let shape = [4, 3, 3];
    // Chunk depth past the volume depth collapses it to one chunk
    let path = write_volume_file(dir.path(), "one.volc", shape, 64, Compression::Gzip).await;

    let volume = open_file(&path).await;
    let slice = volume.read_slice(Axis::Depth, 3).await.unwrap();
    assert_eq!(slice.data(), expected_depth_slice(shape, 3).as_slice());
}

// =============================================================================
// Dataset Resolution
// =============================================================================

#[tokio::test]
async fn test_multi_dataset_file_serves_preferred() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("multi.volc");

    VolumeFileWriter::new()
        .with_chunk_depth(4)
        .add_dataset("labels", &[12], vec![7; 12])
        .unwrap()
        .add_dataset("data", &[4, 3, 2], (0..24u8).collect())
        .unwrap()
        .write_to(&path)
        .await
        .unwrap();

    let volume = open_file(&path).await;
    assert_eq!(volume.handle().dataset(), "data");
    assert_eq!(volume.shape(), [4, 3, 2]);

    let slice = volume.read_slice(Axis::Depth, 0).await.unwrap();
    assert_eq!(slice.data(), &[0, 1, 2, 3, 4, 5]);
}

// =============================================================================
// Damaged Files
// =============================================================================

#[tokio::test]
async fn test_corrupted_magic_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_volume_file(dir.path(), "vol.volc", [4, 2, 2], 2, Compression::Gzip).await;

    let mut bytes = tokio::fs::read(&path).await.unwrap();
    bytes[0..4].copy_from_slice(b"JUNK");
    tokio::fs::write(&path, &bytes).await.unwrap();

    let reader = FileChunkReader::open(&path).await.unwrap();
    let err = VolumeReader::open(Arc::new(reader)).await.unwrap_err();
    assert!(matches!(err, VolumeError::OpenFailure { .. }));
}

#[tokio::test]
async fn test_truncated_file_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_volume_file(dir.path(), "vol.volc", [4, 2, 2], 2, Compression::Gzip).await;

    let bytes = tokio::fs::read(&path).await.unwrap();
    tokio::fs::write(&path, &bytes[..bytes.len() - 3])
        .await
        .unwrap();

    let reader = FileChunkReader::open(&path).await.unwrap();
    let err = VolumeReader::open(Arc::new(reader)).await.unwrap_err();
    assert!(matches!(err, VolumeError::OpenFailure { .. }));
}

#[tokio::test]
async fn test_flipped_payload_byte_fails_at_read() {
    let dir = tempfile::tempdir().unwrap();
    // Single chunk, so the flipped byte is inside its gzip stream
    let path = write_volume_file(dir.path(), "vol.volc", [4, 2, 2], 4, Compression::Gzip).await;

    let mut bytes = tokio::fs::read(&path).await.unwrap();
    let last = bytes.len() - 5;
    bytes[last] ^= 0xFF;
    tokio::fs::write(&path, &bytes).await.unwrap();

    // Geometry is intact, so the container still opens
    let reader = FileChunkReader::open(&path).await.unwrap();
    let volume = VolumeReader::open(Arc::new(reader)).await.unwrap();

    let err = volume.read_slice(Axis::Depth, 0).await.unwrap_err();
    assert!(matches!(err, VolumeError::ReadFailure { .. }));
}
