use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::chunk_reader::ChunkReader;
use crate::store::codec::{decompress_chunk, Compression};

/// Magic bytes at the start of every volume container.
pub const MAGIC: [u8; 4] = *b"VOLC";

/// Container format version this build reads and writes.
pub const FORMAT_VERSION: u32 = 1;

/// Size of the fixed superblock: magic, version, header length.
pub const SUPERBLOCK_LEN: u64 = 16;

/// Element type of a stored dataset.
///
/// Version 1 of the format defines a single element type. The enum keeps
/// the header self-describing so a later version can add wider types
/// without changing the superblock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    U8,
}

impl ElementType {
    /// Size of one element in bytes.
    pub fn size(&self) -> u64 {
        match self {
            ElementType::U8 => 1,
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementType::U8 => write!(f, "u8"),
        }
    }
}

/// Location of one stored chunk inside the data region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Byte offset relative to the start of the data region
    pub offset: u64,
    /// Stored (possibly compressed) length in bytes
    pub stored_len: u64,
    /// Length after decompression in bytes
    pub raw_len: u64,
}

/// One named dataset in the container.
///
/// Datasets are chunked along dimension 0: chunk `i` holds slabs
/// `[i * chunk_depth, min((i + 1) * chunk_depth, shape[0]))`, each slab
/// laid out row-major over the remaining dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub name: String,
    pub shape: Vec<u64>,
    pub dtype: ElementType,
    pub chunk_depth: u64,
    pub compression: Compression,
    pub chunks: Vec<ChunkRecord>,
}

impl DatasetRecord {
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Bytes occupied by one slab (one index along dimension 0).
    pub fn slab_len(&self) -> u64 {
        self.shape[1..].iter().product::<u64>() * self.dtype.size()
    }

    /// Number of chunks the dataset occupies.
    pub fn chunk_count(&self) -> u64 {
        if self.shape.is_empty() || self.shape[0] == 0 {
            return 0;
        }
        self.shape[0].div_ceil(self.chunk_depth)
    }

    /// First slab and slab count covered by the given chunk.
    pub fn chunk_span(&self, chunk_index: u64) -> (u64, u64) {
        let first = chunk_index * self.chunk_depth;
        let count = self.chunk_depth.min(self.shape[0] - first);
        (first, count)
    }

    /// Index of the chunk holding the given slab.
    pub fn chunk_for_slab(&self, slab: u64) -> u64 {
        slab / self.chunk_depth
    }

    fn validate(&self, data_len: u64) -> Result<(), StoreError> {
        if self.shape.is_empty() || self.shape.contains(&0) {
            return Err(StoreError::Corrupt(format!(
                "dataset {} has degenerate shape {:?}",
                self.name, self.shape
            )));
        }
        if self.chunk_depth == 0 {
            return Err(StoreError::Corrupt(format!(
                "dataset {} has chunk depth 0",
                self.name
            )));
        }
        let expected_chunks = self.chunk_count();
        if self.chunks.len() as u64 != expected_chunks {
            return Err(StoreError::Corrupt(format!(
                "dataset {} declares {} chunks, geometry requires {}",
                self.name,
                self.chunks.len(),
                expected_chunks
            )));
        }
        for (i, chunk) in self.chunks.iter().enumerate() {
            let (_, slabs) = self.chunk_span(i as u64);
            let expected_raw = slabs * self.slab_len();
            if chunk.raw_len != expected_raw {
                return Err(StoreError::Corrupt(format!(
                    "dataset {} chunk {i} raw length {} does not match geometry ({expected_raw})",
                    self.name, chunk.raw_len
                )));
            }
            let end = chunk
                .offset
                .checked_add(chunk.stored_len)
                .ok_or_else(|| {
                    StoreError::Corrupt(format!("dataset {} chunk {i} offset overflows", self.name))
                })?;
            if end > data_len {
                return Err(StoreError::Corrupt(format!(
                    "dataset {} chunk {i} ends at {end}, data region is {data_len} bytes",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// JSON header listing every dataset in the container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeHeader {
    pub datasets: Vec<DatasetRecord>,
}

impl VolumeHeader {
    pub fn find(&self, name: &str) -> Option<&DatasetRecord> {
        self.datasets.iter().find(|d| d.name == name)
    }
}

/// Parsed and validated view of one container.
///
/// Owns the header and the data-region geometry; the bytes stay behind
/// the [`ChunkReader`] and are fetched one chunk at a time.
#[derive(Debug, Clone)]
pub struct Container {
    header: VolumeHeader,
    data_start: u64,
    data_len: u64,
}

impl Container {
    /// Read the superblock and header, validate both, and return the
    /// container view.
    pub async fn parse(reader: &dyn ChunkReader) -> Result<Self, StoreError> {
        let size = reader.size();
        if size < SUPERBLOCK_LEN {
            return Err(StoreError::FileTooSmall {
                required: SUPERBLOCK_LEN,
                actual: size,
            });
        }

        let superblock = reader.read_exact_at(0, SUPERBLOCK_LEN as usize).await?;
        let magic = [superblock[0], superblock[1], superblock[2], superblock[3]];
        if magic != MAGIC {
            return Err(StoreError::InvalidMagic(magic));
        }
        let version = read_u32_le(&superblock[4..8]);
        if version != FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                expected: FORMAT_VERSION,
                actual: version,
            });
        }
        let header_len = read_u64_le(&superblock[8..16]);

        let data_start = SUPERBLOCK_LEN
            .checked_add(header_len)
            .filter(|start| *start <= size)
            .ok_or_else(|| {
                StoreError::Corrupt(format!(
                    "header length {header_len} exceeds file size {size}"
                ))
            })?;

        let header_bytes = reader
            .read_exact_at(SUPERBLOCK_LEN, header_len as usize)
            .await?;
        let header: VolumeHeader = serde_json::from_slice(&header_bytes)
            .map_err(|e| StoreError::Corrupt(format!("invalid header JSON: {e}")))?;

        let data_len = size - data_start;
        for dataset in &header.datasets {
            dataset.validate(data_len)?;
        }

        Ok(Self {
            header,
            data_start,
            data_len,
        })
    }

    pub fn header(&self) -> &VolumeHeader {
        &self.header
    }

    pub fn datasets(&self) -> &[DatasetRecord] {
        &self.header.datasets
    }

    pub fn data_start(&self) -> u64 {
        self.data_start
    }

    pub fn data_len(&self) -> u64 {
        self.data_len
    }

    /// Fetch and decompress one chunk of the given dataset.
    pub async fn chunk_payload(
        &self,
        reader: &dyn ChunkReader,
        dataset: &DatasetRecord,
        chunk_index: u64,
    ) -> Result<Vec<u8>, StoreError> {
        let record = dataset.chunks.get(chunk_index as usize).ok_or_else(|| {
            StoreError::Corrupt(format!(
                "chunk {chunk_index} out of range for dataset {} ({} chunks)",
                dataset.name,
                dataset.chunks.len()
            ))
        })?;

        let stored = reader
            .read_exact_at(self.data_start + record.offset, record.stored_len as usize)
            .await?;
        decompress_chunk(dataset.compression, &stored, record.raw_len as usize)
    }
}

/// Read a little-endian u32 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read a little-endian u64 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 8 bytes.
#[inline]
fn read_u64_le(bytes: &[u8]) -> u64 {
    u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}
