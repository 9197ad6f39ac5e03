use std::path::Path;

use image::RgbImage;

use crate::ortho_pipeline::common::error::{PipelineError, Result};

/// An open movie accepting frames of a fixed size.
pub trait FrameSink {
    fn append_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// Flush and close the movie. Dropping a sink without finalizing may
    /// leave a truncated file behind.
    fn finalize(self) -> Result<()>;
}

pub trait VideoEncoder: Send + Sync {
    type Sink: FrameSink;

    /// Extension appended to movie names, empty when the movie is a directory.
    fn extension(&self) -> &str;

    fn open(&self, path: &Path, width: u32, height: u32, frame_rate: u32) -> Result<Self::Sink>;
}

pub(crate) fn check_frame_size(path: &Path, frame: &RgbImage, width: u32, height: u32) -> Result<()> {
    if frame.dimensions() != (width, height) {
        return Err(PipelineError::Shape(format!(
            "frame of {}x{} does not fit movie {} opened at {width}x{height}",
            frame.width(),
            frame.height(),
            path.display()
        )));
    }
    Ok(())
}
