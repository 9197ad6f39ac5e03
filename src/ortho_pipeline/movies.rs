//! Movie orchestration module
//!
//! Reads persisted projections back from the store, composes one frame per
//! time point and streams the frames into a video encoder.

mod maker;
#[cfg(test)]
mod tests;

pub use maker::{MovieMaker, ProjectionDims, select_composite_pair};
