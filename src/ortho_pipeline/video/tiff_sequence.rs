use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::RgbImage;
use tiff::encoder::compression::DeflateLevel;
use tiff::encoder::{Compression, TiffEncoder, colortype};
use tracing::debug;

use super::encoder::{FrameSink, VideoEncoder, check_frame_size};
use crate::ortho_pipeline::common::error::{PipelineError, Result};

/// TIFF compression methods
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    #[default]
    None,
    Lzw,
    DeflateFast,
    DeflateBalanced,
    DeflateBest,
}

impl TiffCompression {
    fn to_tiff(self) -> Compression {
        match self {
            TiffCompression::None => Compression::Uncompressed,
            TiffCompression::Lzw => Compression::Lzw,
            TiffCompression::DeflateFast => Compression::Deflate(DeflateLevel::Fast),
            TiffCompression::DeflateBalanced => Compression::Deflate(DeflateLevel::Balanced),
            TiffCompression::DeflateBest => Compression::Deflate(DeflateLevel::Best),
        }
    }
}

/// Writes every frame as `frame_NNNNNN.tif` into a directory named after the
/// movie. Useful where no `ffmpeg` is installed; the frame rate is recorded
/// only in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TiffSequenceEncoder {
    compression: TiffCompression,
}

impl TiffSequenceEncoder {
    pub fn new(compression: TiffCompression) -> Self {
        Self { compression }
    }
}

impl VideoEncoder for TiffSequenceEncoder {
    type Sink = TiffSequenceSink;

    fn extension(&self) -> &str {
        ""
    }

    fn open(&self, path: &Path, width: u32, height: u32, frame_rate: u32) -> Result<TiffSequenceSink> {
        fs::create_dir_all(path).map_err(|e| PipelineError::video_sink(path, e))?;
        debug!(path = %path.display(), width, height, frame_rate, "Writing TIFF frame sequence");
        Ok(TiffSequenceSink {
            dir: path.to_path_buf(),
            width,
            height,
            compression: self.compression,
            frames: 0,
        })
    }
}

pub struct TiffSequenceSink {
    dir: PathBuf,
    width: u32,
    height: u32,
    compression: TiffCompression,
    frames: usize,
}

impl TiffSequenceSink {
    fn encode(&self, frame: &RgbImage) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut encoder = TiffEncoder::new(Cursor::new(&mut buffer))
            .map_err(|e| PipelineError::video_sink(&self.dir, e))?
            .with_compression(self.compression.to_tiff());
        encoder
            .write_image::<colortype::RGB8>(frame.width(), frame.height(), frame.as_raw())
            .map_err(|e| PipelineError::video_sink(&self.dir, format!("frame {}: {e}", self.frames)))?;
        Ok(buffer)
    }
}

impl FrameSink for TiffSequenceSink {
    fn append_frame(&mut self, frame: &RgbImage) -> Result<()> {
        check_frame_size(&self.dir, frame, self.width, self.height)?;
        let bytes = self.encode(frame)?;
        let path = self.dir.join(format!("frame_{:06}.tif", self.frames));
        fs::write(&path, bytes).map_err(|e| PipelineError::video_sink(&path, e))?;
        self.frames += 1;
        Ok(())
    }

    fn finalize(self) -> Result<()> {
        debug!(path = %self.dir.display(), frames = self.frames, "Frame sequence complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_writes_numbered_frames() {
        let dir = tempfile::tempdir().unwrap();
        let movie = dir.path().join("A_orthomax");
        let mut sink = TiffSequenceEncoder::new(TiffCompression::Lzw)
            .open(&movie, 3, 2, 10)
            .unwrap();

        let frame = RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]));
        sink.append_frame(&frame).unwrap();
        sink.append_frame(&frame).unwrap();
        sink.finalize().unwrap();

        assert!(movie.join("frame_000000.tif").is_file());
        assert!(movie.join("frame_000001.tif").is_file());
        assert!(!movie.join("frame_000002.tif").exists());
    }

    #[test]
    fn test_rejects_wrong_frame_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = TiffSequenceEncoder::default()
            .open(&dir.path().join("m"), 3, 2, 10)
            .unwrap();
        let frame = RgbImage::new(2, 2);
        assert!(matches!(sink.append_frame(&frame), Err(PipelineError::Shape(_))));
    }

    #[test]
    fn test_encoded_frame_decodes() {
        let dir = tempfile::tempdir().unwrap();
        let sink = TiffSequenceEncoder::default()
            .open(&dir.path().join("m"), 2, 1, 10)
            .unwrap();
        let mut frame = RgbImage::new(2, 1);
        frame.put_pixel(1, 0, Rgb([1, 2, 3]));
        let bytes = sink.encode(&frame).unwrap();

        let mut decoder = tiff::decoder::Decoder::new(Cursor::new(bytes)).unwrap();
        assert_eq!(decoder.dimensions().unwrap(), (2, 1));
        let tiff::decoder::DecodingResult::U8(data) = decoder.read_image().unwrap() else {
            panic!("expected 8-bit samples");
        };
        assert_eq!(data, vec![0, 0, 0, 1, 2, 3]);
    }
}
