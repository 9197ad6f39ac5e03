//! Projection engine module
//!
//! Reduces each (time, channel) volume to maximum-intensity projections along
//! z, x and y, plus band-restricted ("sliced") projections along x and y, and
//! persists them next to the raw data.

mod engine;
pub mod reduce;

pub use engine::{ProjectionEngine, ProjectionOutcome, VolumeDims, projected_channel_max};
pub use reduce::{DenseProjection, SliceAxis, project_dense, project_sliced, slice_ranges};
