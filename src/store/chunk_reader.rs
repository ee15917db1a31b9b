use std::io::SeekFrom;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;

use crate::error::StoreError;

/// Trait for reading byte ranges from a volume container.
///
/// This abstraction lets the container parser and the volume layer work
/// against any byte source. Implementations must be thread-safe; callers
/// share them behind an `Arc`.
#[async_trait]
pub trait ChunkReader: Send + Sync {
    /// Read exactly `len` bytes starting at `offset`.
    ///
    /// Returns an error if the range is out of bounds or if the read fails.
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, StoreError>;

    /// Total size of the container in bytes.
    fn size(&self) -> u64;

    /// Identifier for this container (for logging and error messages).
    fn identifier(&self) -> &str;
}

/// [`ChunkReader`] backed by a local file.
///
/// Holds a single open handle. Seek-then-read pairs are not safe across
/// concurrent callers, so the handle sits behind a mutex and every read
/// runs the pair under the lock.
#[derive(Debug)]
pub struct FileChunkReader {
    file: Mutex<File>,
    size: u64,
    identifier: String,
}

impl FileChunkReader {
    /// Open a container file and capture its size.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let identifier = path.display().to_string();

        let file = File::open(path)
            .await
            .map_err(|e| StoreError::Io(format!("failed to open {identifier}: {e}")))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| StoreError::Io(format!("failed to stat {identifier}: {e}")))?
            .len();

        Ok(Self {
            file: Mutex::new(file),
            size,
            identifier,
        })
    }
}

#[async_trait]
impl ChunkReader for FileChunkReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, StoreError> {
        let end = offset
            .checked_add(len as u64)
            .ok_or(StoreError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.size,
            })?;
        if end > self.size {
            return Err(StoreError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.size,
            });
        }

        let mut buf = vec![0u8; len];
        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| StoreError::Io(format!("seek failed in {}: {e}", self.identifier)))?;
        file.read_exact(&mut buf)
            .await
            .map_err(|e| StoreError::Io(format!("read failed in {}: {e}", self.identifier)))?;

        Ok(Bytes::from(buf))
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
