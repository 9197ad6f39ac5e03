//! Orthogonal projection pipeline
//!
//! Reduces 5D (t, c, z, y, x) microscopy volumes to maximum-intensity
//! projections, persists them next to the raw data and renders them as
//! annotated movies: plain and sliced orthogonal views, a depth-coded view
//! and a two-channel composite.

pub mod colormap;
pub mod common;
pub mod compositor;
pub mod config;
pub mod contrast;
pub mod metadata;
pub mod movies;
mod progress;
pub mod projection;
pub mod store;
pub mod video;

pub use common::{ErrorKind, PipelineError, Result};

pub use config::{PipelineConfig, PipelineConfigBuilder};

pub use store::{ArrayStore, InMemoryStore, ZarrStore};

pub use metadata::{
    ChannelDescriptor, DisplayWindow, VoxelDims, load_dataset_channels, load_dataset_channels_with,
};

pub use projection::{ProjectionEngine, ProjectionOutcome, SliceAxis, projected_channel_max};

pub use colormap::{DepthColormap, Palette, build_depth_colormap, colorize_by_depth};

pub use video::{FfmpegEncoder, FrameSink, TiffCompression, TiffSequenceEncoder, VideoEncoder};

pub use movies::MovieMaker;
