use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Output, Stdio};

use image::RgbImage;
use tracing::{debug, warn};

use super::encoder::{FrameSink, VideoEncoder, check_frame_size};
use crate::ortho_pipeline::common::error::{PipelineError, Result};

/// Encodes movies by piping raw `rgb24` frames into an `ffmpeg` process.
///
/// The binary must be on `PATH` (or given explicitly); if it cannot be
/// started, opening a movie fails with a video-sink error.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: PathBuf,
    codec: String,
    extension: String,
}

impl Default for FfmpegEncoder {
    /// Motion JPEG in an AVI container.
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
            codec: "mjpeg".to_string(),
            extension: "avi".to_string(),
        }
    }
}

impl FfmpegEncoder {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            ..Self::default()
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    fn command(&self, path: &Path, width: u32, height: u32, frame_rate: u32) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(["-y", "-loglevel", "error"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
            .arg("-s")
            .arg(format!("{width}x{height}"))
            .arg("-r")
            .arg(frame_rate.to_string())
            .args(["-i", "-"])
            .arg("-c:v")
            .arg(&self.codec);
        if self.codec == "mjpeg" {
            command.args(["-q:v", "3", "-pix_fmt", "yuvj420p"]);
        }
        command
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        command
    }
}

impl VideoEncoder for FfmpegEncoder {
    type Sink = FfmpegSink;

    fn extension(&self) -> &str {
        &self.extension
    }

    fn open(&self, path: &Path, width: u32, height: u32, frame_rate: u32) -> Result<FfmpegSink> {
        debug!(path = %path.display(), width, height, frame_rate, "Starting ffmpeg");
        let mut child = self
            .command(path, width, height, frame_rate)
            .spawn()
            .map_err(|e| {
                PipelineError::video_sink(path, format!("cannot start {}: {e}", self.binary.display()))
            })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| PipelineError::video_sink(path, "ffmpeg stdin is not available"))?;

        Ok(FfmpegSink {
            path: path.to_path_buf(),
            width,
            height,
            child: Some(child),
            stdin: Some(stdin),
            frames: 0,
        })
    }
}

pub struct FfmpegSink {
    path: PathBuf,
    width: u32,
    height: u32,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    frames: usize,
}

impl FrameSink for FfmpegSink {
    fn append_frame(&mut self, frame: &RgbImage) -> Result<()> {
        check_frame_size(&self.path, frame, self.width, self.height)?;
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| PipelineError::video_sink(&self.path, "movie already closed"))?;
        if let Err(e) = stdin.write_all(frame.as_raw()) {
            let message = format!("frame {}: {e}", self.frames);
            return Err(match self.reap() {
                Ok(Some(failure)) => PipelineError::video_sink(&self.path, format!("{message}; {failure}")),
                _ => PipelineError::video_sink(&self.path, message),
            });
        }
        self.frames += 1;
        Ok(())
    }

    fn finalize(mut self) -> Result<()> {
        if let Some(failure) = self.reap()? {
            return Err(PipelineError::video_sink(&self.path, failure));
        }
        debug!(path = %self.path.display(), frames = self.frames, "Movie written");
        Ok(())
    }
}

impl FfmpegSink {
    /// Close stdin and wait for ffmpeg. Returns its exit status and stderr
    /// when it failed.
    fn reap(&mut self) -> Result<Option<String>> {
        // closing stdin signals end of stream
        drop(self.stdin.take());
        let Some(child) = self.child.take() else {
            return Ok(None);
        };
        let output = child
            .wait_with_output()
            .map_err(|e| PipelineError::video_sink(&self.path, e))?;
        if output.status.success() {
            return Ok(None);
        }
        Ok(Some(exit_report(&output)))
    }
}

fn exit_report(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("ffmpeg exited with {}: {}", output.status, stderr.trim())
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            warn!(path = %self.path.display(), "Movie dropped before finalize, stopping ffmpeg");
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
