//! Frame compositor module
//!
//! Assembles per-axis projections into one RGB canvas per time point and
//! annotates it with a timestamp and scale bars.

pub mod frames;
pub mod layout;
pub mod overlay;
mod text;

pub use frames::{ChannelDisplay, OrthoViews, composite_frame, depth_frame, orthomax_frame, sliced_frame, to_rgb_image};
pub use layout::{OrthoLayout, Region, SlicedLayout};
pub use overlay::{Overlays, ScaleBar, ScaleBarOrientation, TimestampStyle, format_timestamp};
