//! Read-only volume access.
//!
//! A [`VolumeReader`] wraps one open container and serves 2D planes out
//! of its 3D dataset. Chunks are slabs along the depth axis, so a depth
//! slice touches exactly one chunk while height and width slices gather
//! one row from every slab. All three cases decompress each chunk at
//! most once per call.

use std::sync::Arc;

use tracing::debug;

use crate::error::VolumeError;
use crate::slice::{Axis, SliceKey, SliceSnapshot};
use crate::store::{ChunkReader, Container, DatasetRecord, ElementType, VolumeHeader};

/// Dataset name tried first when opening a container.
pub const DEFAULT_DATASET_NAME: &str = "data";

/// Pick the dataset a container should be served from.
///
/// Prefers the entry named `preferred` when it is 3-dimensional, then
/// falls back to the first 3-dimensional entry in declared order.
pub fn resolve_dataset<'a>(
    header: &'a VolumeHeader,
    preferred: &str,
) -> Option<&'a DatasetRecord> {
    if let Some(dataset) = header.find(preferred) {
        if dataset.rank() == 3 {
            return Some(dataset);
        }
    }
    header.datasets.iter().find(|d| d.rank() == 3)
}

/// Immutable description of an opened volume.
#[derive(Debug, Clone)]
pub struct VolumeHandle {
    identifier: String,
    shape: [usize; 3],
    element: ElementType,
    dataset: String,
}

impl VolumeHandle {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Shape as `[depth, height, width]`.
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Extent of the volume along one axis.
    pub fn extent(&self, axis: Axis) -> usize {
        self.shape[axis.index()]
    }

    pub fn element(&self) -> ElementType {
        self.element
    }

    /// Name of the dataset resolution settled on.
    pub fn dataset(&self) -> &str {
        &self.dataset
    }
}

/// Serves slices of one volume from its container.
pub struct VolumeReader {
    reader: Arc<dyn ChunkReader>,
    container: Container,
    dataset: DatasetRecord,
    handle: VolumeHandle,
}

impl std::fmt::Debug for VolumeReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeReader")
            .field("container", &self.container)
            .field("dataset", &self.dataset)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl VolumeReader {
    /// Parse the container behind `reader` and resolve its volume dataset.
    pub async fn open(reader: Arc<dyn ChunkReader>) -> Result<Self, VolumeError> {
        let identifier = reader.identifier().to_string();

        let container =
            Container::parse(reader.as_ref())
                .await
                .map_err(|e| VolumeError::OpenFailure {
                    identifier: identifier.clone(),
                    reason: e.to_string(),
                })?;

        let dataset = resolve_dataset(container.header(), DEFAULT_DATASET_NAME)
            .ok_or_else(|| VolumeError::DatasetNotFound {
                identifier: identifier.clone(),
            })?
            .clone();

        let shape = [
            dataset.shape[0] as usize,
            dataset.shape[1] as usize,
            dataset.shape[2] as usize,
        ];
        debug!(
            identifier = %identifier,
            dataset = %dataset.name,
            ?shape,
            "opened volume"
        );

        let handle = VolumeHandle {
            identifier,
            shape,
            element: dataset.dtype,
            dataset: dataset.name.clone(),
        };

        Ok(Self {
            reader,
            container,
            dataset,
            handle,
        })
    }

    pub fn handle(&self) -> &VolumeHandle {
        &self.handle
    }

    pub fn shape(&self) -> [usize; 3] {
        self.handle.shape
    }

    pub fn extent(&self, axis: Axis) -> usize {
        self.handle.extent(axis)
    }

    /// Extract one plane perpendicular to `axis` at `index`.
    pub async fn read_slice(&self, axis: Axis, index: usize) -> Result<SliceSnapshot, VolumeError> {
        let extent = self.extent(axis);
        if index >= extent {
            return Err(VolumeError::IndexOutOfRange {
                axis,
                index,
                extent,
            });
        }
        let key = SliceKey::new(axis, index);

        match axis {
            Axis::Depth => self.read_depth_plane(key).await,
            Axis::Height => self.read_height_plane(key).await,
            Axis::Width => self.read_width_plane(key).await,
        }
    }

    /// Extract depth planes `start .. start + count`, decompressing each
    /// chunk once. Used by the progressive first load.
    pub async fn read_depth_range(
        &self,
        start: usize,
        count: usize,
    ) -> Result<Vec<SliceSnapshot>, VolumeError> {
        let depth = self.handle.shape[0];
        let end = start + count;
        if end > depth {
            return Err(VolumeError::IndexOutOfRange {
                axis: Axis::Depth,
                index: end.saturating_sub(1),
                extent: depth,
            });
        }
        if count == 0 {
            return Ok(Vec::new());
        }

        let [_, height, width] = self.handle.shape;
        let slab_len = height * width;
        let mut slices = Vec::with_capacity(count);

        let first_chunk = self.dataset.chunk_for_slab(start as u64);
        let last_chunk = self.dataset.chunk_for_slab((end - 1) as u64);
        for chunk_index in first_chunk..=last_chunk {
            let payload = self.chunk_payload(chunk_index, Axis::Depth, start).await?;
            let (chunk_start, chunk_slabs) = self.dataset.chunk_span(chunk_index);
            let lo = start.max(chunk_start as usize);
            let hi = end.min((chunk_start + chunk_slabs) as usize);
            for slab in lo..hi {
                let offset = (slab - chunk_start as usize) * slab_len;
                slices.push(SliceSnapshot::new(
                    SliceKey::new(Axis::Depth, slab),
                    height,
                    width,
                    payload[offset..offset + slab_len].to_vec(),
                ));
            }
        }
        Ok(slices)
    }

    async fn read_depth_plane(&self, key: SliceKey) -> Result<SliceSnapshot, VolumeError> {
        let [_, height, width] = self.handle.shape;
        let slab_len = height * width;

        let chunk_index = self.dataset.chunk_for_slab(key.index as u64);
        let payload = self.chunk_payload(chunk_index, key.axis, key.index).await?;
        let (chunk_start, _) = self.dataset.chunk_span(chunk_index);
        let offset = (key.index - chunk_start as usize) * slab_len;

        Ok(SliceSnapshot::new(
            key,
            height,
            width,
            payload[offset..offset + slab_len].to_vec(),
        ))
    }

    async fn read_height_plane(&self, key: SliceKey) -> Result<SliceSnapshot, VolumeError> {
        let [depth, height, width] = self.handle.shape;
        let slab_len = height * width;
        let mut data = Vec::with_capacity(depth * width);

        for chunk_index in 0..self.dataset.chunk_count() {
            let payload = self.chunk_payload(chunk_index, key.axis, key.index).await?;
            let (_, chunk_slabs) = self.dataset.chunk_span(chunk_index);
            for slab in 0..chunk_slabs as usize {
                let row = slab * slab_len + key.index * width;
                data.extend_from_slice(&payload[row..row + width]);
            }
        }

        Ok(SliceSnapshot::new(key, depth, width, data))
    }

    async fn read_width_plane(&self, key: SliceKey) -> Result<SliceSnapshot, VolumeError> {
        let [depth, height, width] = self.handle.shape;
        let slab_len = height * width;
        let mut data = Vec::with_capacity(depth * height);

        for chunk_index in 0..self.dataset.chunk_count() {
            let payload = self.chunk_payload(chunk_index, key.axis, key.index).await?;
            let (_, chunk_slabs) = self.dataset.chunk_span(chunk_index);
            for slab in 0..chunk_slabs as usize {
                for row in 0..height {
                    data.push(payload[slab * slab_len + row * width + key.index]);
                }
            }
        }

        Ok(SliceSnapshot::new(key, depth, height, data))
    }

    async fn chunk_payload(
        &self,
        chunk_index: u64,
        axis: Axis,
        index: usize,
    ) -> Result<Vec<u8>, VolumeError> {
        self.container
            .chunk_payload(self.reader.as_ref(), &self.dataset, chunk_index)
            .await
            .map_err(|e| VolumeError::ReadFailure {
                key: SliceKey::new(axis, index),
                reason: e.to_string(),
            })
    }
}
