use thiserror::Error;

use crate::engine::Side;
use crate::slice::{Axis, SliceKey};

/// Errors that can occur when reading raw bytes from a volume container
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Error from the underlying file or byte source
    #[error("I/O error: {0}")]
    Io(String),

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// Invalid container magic bytes
    #[error("Invalid magic bytes: expected \"VOLC\", got {0:?}")]
    InvalidMagic([u8; 4]),

    /// Container format version this build does not understand
    #[error("Unsupported container version: expected {expected}, got {actual}")]
    UnsupportedVersion { expected: u32, actual: u32 },

    /// File is too small to contain a valid superblock
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Header or chunk table is internally inconsistent
    #[error("Corrupt container: {0}")]
    Corrupt(String),

    /// Chunk payload failed to decompress or decoded to the wrong size
    #[error("Decompression failed: {0}")]
    Decompress(String),
}

/// Errors surfaced by the volume layer when opening or slicing a dataset
#[derive(Debug, Clone, Error)]
pub enum VolumeError {
    /// The container could not be opened or validated
    #[error("Failed to open volume {identifier}: {reason}")]
    OpenFailure { identifier: String, reason: String },

    /// No dataset in the container is usable as a volume
    #[error("No 3-dimensional dataset found in {identifier}")]
    DatasetNotFound { identifier: String },

    /// Slice index is outside the volume extent along the given axis
    #[error("Index {index} out of range for axis {axis} (extent {extent})")]
    IndexOutOfRange {
        axis: Axis,
        index: usize,
        extent: usize,
    },

    /// A chunk read or decode failed while extracting a slice
    #[error("Failed to read slice {key}: {reason}")]
    ReadFailure { key: SliceKey, reason: String },
}

/// Errors surfaced by the engine's consumer-facing API
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Operation addressed a side that has no volume loaded
    #[error("No volume loaded for side {0}")]
    SideNotLoaded(Side),

    /// load_side called for a side that already holds a volume
    #[error("Side {0} already has a volume loaded")]
    SideAlreadyLoaded(Side),

    /// Error from the volume layer
    #[error("Volume error: {0}")]
    Volume(#[from] VolumeError),
}
