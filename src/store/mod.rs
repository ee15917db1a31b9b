//! Byte-level access to volume containers.
//!
//! A volume container is a single file: a fixed superblock, a JSON header
//! describing the datasets it holds, then the chunk payloads. This module
//! owns the raw-byte side of that picture. The [`ChunkReader`] trait is the
//! seam between the parsing code and the actual storage, so tests can swap
//! in mock readers and the volume layer never touches `tokio::fs` directly.

mod chunk_reader;
mod codec;
mod format;
mod writer;

pub use chunk_reader::{ChunkReader, FileChunkReader};
pub use codec::{compress_chunk, decompress_chunk, Compression};
pub use format::{
    ChunkRecord, Container, DatasetRecord, ElementType, VolumeHeader, FORMAT_VERSION, MAGIC,
    SUPERBLOCK_LEN,
};
pub use writer::{VolumeFileWriter, DEFAULT_CHUNK_DEPTH};
