//! Opening volumes and extracting planes from chunked storage.

mod reader;

pub use reader::{resolve_dataset, VolumeHandle, VolumeReader, DEFAULT_DATASET_NAME};
