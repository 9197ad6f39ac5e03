use std::ops::Range;

use ndarray::{ArrayD, ArrayViewD};

use crate::ortho_pipeline::common::error::Result;

/// Hierarchical store of u16 arrays addressed by group path and index ranges.
///
/// Paths are absolute (`/analysis/max_projections/maxz`). Implementations must
/// be shareable across threads so projections can be computed per channel in
/// parallel.
pub trait ArrayStore: Send + Sync {
    /// Human readable location of the store, used in error messages.
    fn location(&self) -> String;

    fn node_exists(&self, path: &str) -> Result<bool>;

    /// Create a group (and any missing parents). Existing groups are kept.
    fn create_group(&self, path: &str) -> Result<()>;

    /// Create a zero-filled array with the given shape and chunk shape.
    fn create_array(&self, path: &str, shape: &[u64], chunks: &[u64]) -> Result<()>;

    fn array_shape(&self, path: &str) -> Result<Vec<u64>>;

    /// Read the block covered by `region`, one range per dimension. Narrower
    /// unsigned element types are widened to `u16`.
    fn read_region(&self, path: &str, region: &[Range<u64>]) -> Result<ArrayD<u16>>;

    /// Write `data` with its origin at `offset`.
    fn write_region(&self, path: &str, offset: &[u64], data: ArrayViewD<'_, u16>) -> Result<()>;
}
