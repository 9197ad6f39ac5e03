use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::{ArrayD, ArrayViewD, IxDyn};
use tracing::debug;
use zarrs::array::{Array, ArrayBuilder, ArraySubset, FillValue, data_type};
use zarrs::filesystem::FilesystemStore;
use zarrs::group::GroupBuilder;
use zarrs::storage::ReadableWritableListableStorage;

use crate::ortho_pipeline::common::error::{PipelineError, Result};
use crate::ortho_pipeline::store::array_store::ArrayStore;
use crate::ortho_pipeline::store::paths;

/// Metadata documents marking a zarr node (v3, then v2 array and group).
const NODE_METADATA_FILES: [&str; 3] = ["zarr.json", ".zarray", ".zgroup"];

/// Zarr hierarchy on the local filesystem.
///
/// Raw data written by the acquisition software (zarr v2, nested keys) is
/// read as-is, `uint8` arrays widened to `u16`; derived arrays are created
/// as zarr v3 arrays of `uint16`.
pub struct ZarrStore {
    root: PathBuf,
    storage: ReadableWritableListableStorage,
}

impl ZarrStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(PipelineError::store(
                root.display().to_string(),
                "dataset root is not a directory",
            ));
        }
        let store = FilesystemStore::new(&root)
            .map_err(|e| PipelineError::store(root.display().to_string(), e))?;
        debug!(root = %root.display(), "Opened zarr store");
        Ok(Self {
            root,
            storage: Arc::new(store),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn node_dir(&self, path: &str) -> PathBuf {
        self.root.join(paths::normalize(path).trim_start_matches('/'))
    }
}

impl ArrayStore for ZarrStore {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    fn node_exists(&self, path: &str) -> Result<bool> {
        let dir = self.node_dir(path);
        Ok(NODE_METADATA_FILES
            .iter()
            .any(|name| dir.join(name).is_file()))
    }

    fn create_group(&self, path: &str) -> Result<()> {
        let path = paths::normalize(path);
        let mut pending = paths::ancestors(&path);
        pending.push(path);
        for group_path in pending {
            if self.node_exists(&group_path)? {
                continue;
            }
            let group = GroupBuilder::new()
                .build(self.storage.clone(), &group_path)
                .map_err(|e| PipelineError::store(group_path.as_str(), e))?;
            group
                .store_metadata()
                .map_err(|e| PipelineError::store(group_path.as_str(), e))?;
            debug!(path = %group_path, "Created zarr group");
        }
        Ok(())
    }

    fn create_array(&self, path: &str, shape: &[u64], chunks: &[u64]) -> Result<()> {
        let path = paths::normalize(path);
        if shape.len() != chunks.len() {
            return Err(PipelineError::Shape(format!(
                "{path}: chunk rank {} does not match array rank {}",
                chunks.len(),
                shape.len()
            )));
        }
        if let Some(parent) = paths::ancestors(&path).pop() {
            self.create_group(&parent)?;
        }
        let array = ArrayBuilder::new(
            shape.to_vec(),
            chunks.to_vec(),
            data_type::uint16(),
            FillValue::from(0u16),
        )
        .build(self.storage.clone(), &path)
        .map_err(|e| PipelineError::store(path.as_str(), e))?;
        array
            .store_metadata()
            .map_err(|e| PipelineError::store(path.as_str(), e))?;
        debug!(path = %path, ?shape, ?chunks, "Created zarr array");
        Ok(())
    }

    fn array_shape(&self, path: &str) -> Result<Vec<u64>> {
        let path = paths::normalize(path);
        let array = Array::open(self.storage.clone(), &path)
            .map_err(|e| PipelineError::store(path.as_str(), e))?;
        Ok(array.shape().to_vec())
    }

    fn read_region(&self, path: &str, region: &[Range<u64>]) -> Result<ArrayD<u16>> {
        let path = paths::normalize(path);
        let array = Array::open(self.storage.clone(), &path)
            .map_err(|e| PipelineError::store(path.as_str(), e))?;
        if region.len() != array.shape().len() {
            return Err(PipelineError::Shape(format!(
                "{path}: region has {} dimensions, array has {}",
                region.len(),
                array.shape().len()
            )));
        }
        let subset = ArraySubset::new_with_ranges(region);
        let elements: Vec<u16> = match array.retrieve_array_subset::<Vec<u16>>(&subset) {
            Ok(elements) => elements,
            // 8-bit acquisitions are widened; anything else keeps the u16 error
            Err(u16_error) => array
                .retrieve_array_subset::<Vec<u8>>(&subset)
                .map(|bytes| bytes.into_iter().map(u16::from).collect())
                .map_err(|_| {
                    PipelineError::store(
                        path.as_str(),
                        format!("{u16_error}; raw data must be uint8 or uint16"),
                    )
                })?,
        };
        let shape: Vec<usize> = region
            .iter()
            .map(|r| r.end.saturating_sub(r.start) as usize)
            .collect();
        ArrayD::from_shape_vec(IxDyn(&shape), elements)
            .map_err(|e| PipelineError::Shape(format!("{path}: {e}")))
    }

    fn write_region(&self, path: &str, offset: &[u64], data: ArrayViewD<'_, u16>) -> Result<()> {
        let path = paths::normalize(path);
        if offset.len() != data.ndim() {
            return Err(PipelineError::Shape(format!(
                "{path}: offset has {} dimensions, block has {}",
                offset.len(),
                data.ndim()
            )));
        }
        let array = Array::open(self.storage.clone(), &path)
            .map_err(|e| PipelineError::store(path.as_str(), e))?;
        let ranges: Vec<Range<u64>> = offset
            .iter()
            .zip(data.shape())
            .map(|(&start, &len)| start..start + len as u64)
            .collect();
        let subset = ArraySubset::new_with_ranges(&ranges);
        // Logical (row-major) order regardless of the view's memory layout.
        let elements: Vec<u16> = data.iter().copied().collect();
        array
            .store_array_subset(&subset, elements)
            .map_err(|e| PipelineError::store(path.as_str(), e))?;
        Ok(())
    }
}
