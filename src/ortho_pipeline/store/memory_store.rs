use std::collections::HashMap;
use std::ops::Range;
use std::sync::RwLock;

use ndarray::{ArrayD, ArrayViewD, IxDyn, Slice};
use tracing::debug;

use crate::ortho_pipeline::common::error::{PipelineError, Result};
use crate::ortho_pipeline::store::array_store::ArrayStore;
use crate::ortho_pipeline::store::paths;

enum Node {
    Group,
    Array(ArrayD<u16>),
}

/// Store keeping every array in memory.
///
/// Useful for tests, benchmarks and small synthetic datasets.
#[derive(Default)]
pub struct InMemoryStore {
    nodes: RwLock<HashMap<String, Node>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) an array, creating its parent groups.
    pub fn insert_array(&self, path: &str, data: ArrayD<u16>) -> Result<()> {
        let path = paths::normalize(path);
        let mut nodes = self.write_lock(&path)?;
        for ancestor in paths::ancestors(&path) {
            nodes.entry(ancestor).or_insert(Node::Group);
        }
        nodes.insert(path, Node::Array(data));
        Ok(())
    }

    /// Copy of a stored array.
    pub fn array(&self, path: &str) -> Result<ArrayD<u16>> {
        let path = paths::normalize(path);
        let nodes = self.read_lock(&path)?;
        match nodes.get(&path) {
            Some(Node::Array(data)) => Ok(data.clone()),
            _ => Err(PipelineError::store(path, "no such array")),
        }
    }

    fn read_lock(
        &self,
        path: &str,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Node>>> {
        self.nodes
            .read()
            .map_err(|_| PipelineError::store(path, "store lock poisoned"))
    }

    fn write_lock(
        &self,
        path: &str,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Node>>> {
        self.nodes
            .write()
            .map_err(|_| PipelineError::store(path, "store lock poisoned"))
    }
}

fn check_region(path: &str, shape: &[usize], region: &[Range<u64>]) -> Result<()> {
    if region.len() != shape.len() {
        return Err(PipelineError::Shape(format!(
            "{path}: region has {} dimensions, array has {}",
            region.len(),
            shape.len()
        )));
    }
    for (range, &len) in region.iter().zip(shape) {
        if range.start > range.end || range.end > len as u64 {
            return Err(PipelineError::Shape(format!(
                "{path}: range {range:?} out of bounds for extent {len}"
            )));
        }
    }
    Ok(())
}

impl ArrayStore for InMemoryStore {
    fn location(&self) -> String {
        "<memory>".to_string()
    }

    fn node_exists(&self, path: &str) -> Result<bool> {
        let path = paths::normalize(path);
        Ok(self.read_lock(&path)?.contains_key(&path))
    }

    fn create_group(&self, path: &str) -> Result<()> {
        let path = paths::normalize(path);
        let mut nodes = self.write_lock(&path)?;
        for ancestor in paths::ancestors(&path) {
            nodes.entry(ancestor).or_insert(Node::Group);
        }
        nodes.entry(path).or_insert(Node::Group);
        Ok(())
    }

    fn create_array(&self, path: &str, shape: &[u64], chunks: &[u64]) -> Result<()> {
        if shape.len() != chunks.len() {
            return Err(PipelineError::Shape(format!(
                "{path}: chunk rank {} does not match array rank {}",
                chunks.len(),
                shape.len()
            )));
        }
        debug!(path, ?shape, "Creating in-memory array");
        let shape: Vec<usize> = shape.iter().map(|&n| n as usize).collect();
        self.insert_array(path, ArrayD::zeros(IxDyn(&shape)))
    }

    fn array_shape(&self, path: &str) -> Result<Vec<u64>> {
        let path = paths::normalize(path);
        let nodes = self.read_lock(&path)?;
        match nodes.get(&path) {
            Some(Node::Array(data)) => Ok(data.shape().iter().map(|&n| n as u64).collect()),
            _ => Err(PipelineError::store(path, "no such array")),
        }
    }

    fn read_region(&self, path: &str, region: &[Range<u64>]) -> Result<ArrayD<u16>> {
        let path = paths::normalize(path);
        let nodes = self.read_lock(&path)?;
        let Some(Node::Array(data)) = nodes.get(&path) else {
            return Err(PipelineError::store(path, "no such array"));
        };
        check_region(&path, data.shape(), region)?;
        let block = data.slice_each_axis(|ax| {
            let range = &region[ax.axis.index()];
            Slice::from(range.start as usize..range.end as usize)
        });
        Ok(block.to_owned())
    }

    fn write_region(&self, path: &str, offset: &[u64], data: ArrayViewD<'_, u16>) -> Result<()> {
        let path = paths::normalize(path);
        let mut nodes = self.write_lock(&path)?;
        let Some(Node::Array(target)) = nodes.get_mut(&path) else {
            return Err(PipelineError::store(path, "no such array"));
        };
        if offset.len() != data.ndim() {
            return Err(PipelineError::Shape(format!(
                "{path}: offset has {} dimensions, block has {}",
                offset.len(),
                data.ndim()
            )));
        }
        let region: Vec<Range<u64>> = offset
            .iter()
            .zip(data.shape())
            .map(|(&start, &len)| start..start + len as u64)
            .collect();
        check_region(&path, target.shape(), &region)?;
        target
            .slice_each_axis_mut(|ax| {
                let range = &region[ax.axis.index()];
                Slice::from(range.start as usize..range.end as usize)
            })
            .assign(&data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, ArrayD};

    #[test]
    fn test_create_and_roundtrip_region() {
        let store = InMemoryStore::new();
        store.create_array("/a/b", &[2, 3, 4], &[1, 3, 4]).unwrap();
        assert!(store.node_exists("/a").unwrap());
        assert!(store.node_exists("/a/b").unwrap());

        let block = Array::from_shape_vec((1, 2, 2), vec![1u16, 2, 3, 4])
            .unwrap()
            .into_dyn();
        store.write_region("/a/b", &[1, 1, 2], block.view()).unwrap();

        let read = store.read_region("/a/b", &[1..2, 1..3, 2..4]).unwrap();
        assert_eq!(read, block);
        let full: ArrayD<u16> = store.array("/a/b").unwrap();
        assert_eq!(full.sum(), 10);
    }

    #[test]
    fn test_out_of_bounds_read_is_shape_error() {
        let store = InMemoryStore::new();
        store.create_array("/x", &[2, 2], &[2, 2]).unwrap();
        let result = store.read_region("/x", &[0..3, 0..2]);
        assert!(matches!(result, Err(PipelineError::Shape(_))));
    }

    #[test]
    fn test_missing_array() {
        let store = InMemoryStore::new();
        assert!(!store.node_exists("/nothing").unwrap());
        assert!(matches!(
            store.array_shape("/nothing"),
            Err(PipelineError::Store { .. })
        ));
    }
}
