//! Video emission module
//!
//! Frames are appended in time order to a [`FrameSink`] opened by a
//! [`VideoEncoder`]. Two encoders are provided: [`FfmpegEncoder`] streams raw
//! frames to an `ffmpeg` process, [`TiffSequenceEncoder`] writes one TIFF per
//! frame.

mod encoder;
mod ffmpeg;
pub mod naming;
mod tiff_sequence;

pub use encoder::{FrameSink, VideoEncoder};
pub use ffmpeg::FfmpegEncoder;
pub use naming::unique_path;
pub use tiff_sequence::{TiffCompression, TiffSequenceEncoder};
