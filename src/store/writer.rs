use std::path::Path;

use crate::error::StoreError;
use crate::store::codec::{compress_chunk, Compression};
use crate::store::format::{
    ChunkRecord, DatasetRecord, ElementType, VolumeHeader, FORMAT_VERSION, MAGIC,
};

/// Default number of slabs per chunk when the caller does not override it.
pub const DEFAULT_CHUNK_DEPTH: u64 = 16;

#[derive(Debug)]
struct PendingDataset {
    name: String,
    shape: Vec<u64>,
    chunk_depth: u64,
    compression: Compression,
    data: Vec<u8>,
}

/// Builder for volume container files.
///
/// Used by the CLI and by tests to fabricate real artifacts. The engine
/// itself never writes; this type exists so fixtures do not have to
/// hand-assemble superblocks.
#[derive(Debug)]
pub struct VolumeFileWriter {
    compression: Compression,
    chunk_depth: u64,
    datasets: Vec<PendingDataset>,
}

impl VolumeFileWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::Gzip,
            chunk_depth: DEFAULT_CHUNK_DEPTH,
            datasets: Vec::new(),
        }
    }

    /// Compression applied to datasets added after this call.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Chunk depth applied to datasets added after this call.
    pub fn with_chunk_depth(mut self, chunk_depth: u64) -> Self {
        self.chunk_depth = chunk_depth;
        self
    }

    /// Add a dataset of u8 elements laid out row-major over `shape`.
    pub fn add_dataset(
        mut self,
        name: impl Into<String>,
        shape: &[u64],
        data: Vec<u8>,
    ) -> Result<Self, StoreError> {
        let name = name.into();
        if shape.is_empty() || shape.contains(&0) {
            return Err(StoreError::Corrupt(format!(
                "dataset {name} has degenerate shape {shape:?}"
            )));
        }
        if self.chunk_depth == 0 {
            return Err(StoreError::Corrupt(format!(
                "dataset {name} has chunk depth 0"
            )));
        }
        let expected = shape.iter().product::<u64>();
        if data.len() as u64 != expected {
            return Err(StoreError::Corrupt(format!(
                "dataset {name}: {} bytes of data for shape {shape:?} (expected {expected})",
                data.len()
            )));
        }

        self.datasets.push(PendingDataset {
            name,
            shape: shape.to_vec(),
            chunk_depth: self.chunk_depth,
            compression: self.compression,
            data,
        });
        Ok(self)
    }

    /// Assemble the complete container file in memory.
    pub fn encode(&self) -> Result<Vec<u8>, StoreError> {
        let mut data_region = Vec::new();
        let mut records = Vec::new();

        for dataset in &self.datasets {
            let slab_len = dataset.shape[1..].iter().product::<u64>() as usize;
            let depth = dataset.shape[0];
            let mut chunks = Vec::new();

            let mut slab = 0u64;
            while slab < depth {
                let slabs_here = dataset.chunk_depth.min(depth - slab);
                let start = slab as usize * slab_len;
                let end = start + slabs_here as usize * slab_len;
                let stored = compress_chunk(dataset.compression, &dataset.data[start..end])?;
                chunks.push(ChunkRecord {
                    offset: data_region.len() as u64,
                    stored_len: stored.len() as u64,
                    raw_len: (end - start) as u64,
                });
                data_region.extend_from_slice(&stored);
                slab += slabs_here;
            }

            records.push(DatasetRecord {
                name: dataset.name.clone(),
                shape: dataset.shape.clone(),
                dtype: ElementType::U8,
                chunk_depth: dataset.chunk_depth,
                compression: dataset.compression,
                chunks,
            });
        }

        let header = serde_json::to_vec(&VolumeHeader { datasets: records })
            .map_err(|e| StoreError::Corrupt(format!("failed to encode header: {e}")))?;

        let mut file = Vec::with_capacity(16 + header.len() + data_region.len());
        file.extend_from_slice(&MAGIC);
        file.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        file.extend_from_slice(&(header.len() as u64).to_le_bytes());
        file.extend_from_slice(&header);
        file.extend_from_slice(&data_region);
        Ok(file)
    }

    /// Encode and write the container to a file.
    pub async fn write_to(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let bytes = self.encode()?;
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| StoreError::Io(format!("failed to write {}: {e}", path.display())))
    }
}

impl Default for VolumeFileWriter {
    fn default() -> Self {
        Self::new()
    }
}
