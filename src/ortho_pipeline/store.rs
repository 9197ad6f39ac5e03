//! Array store module
//!
//! This module provides chunked multi-dimensional array access keyed by
//! (time, channel, z, y, x), backed either by a zarr hierarchy on disk or by
//! memory.

mod array_store;
mod memory_store;
pub mod paths;
mod zarr_store;

pub use array_store::ArrayStore;
pub use memory_store::InMemoryStore;
pub use zarr_store::ZarrStore;
