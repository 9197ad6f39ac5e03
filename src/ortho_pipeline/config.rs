//! Pipeline configuration types

use crate::ortho_pipeline::common::error::{PipelineError, Result};

/// Band width used for sliced projections (83 px * 2.41 um/px ~ 200 um).
pub const DEFAULT_SLICE_DEPTH: usize = 83;

/// Configuration shared by the projection and movie stages
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Resolution level of the raw data to project (`/0/<level>` in the store)
    pub resolution_level: usize,
    /// Width of the bands used for sliced projections
    pub slice_depth: usize,
    /// Physical time between acquired volumes; only affects the timestamp text
    pub imaging_interval_secs: u32,
    /// Output frame rate of every movie
    pub frame_rate: u32,
    /// Width of the black band separating the views of a composite canvas
    pub gap: usize,
    /// Palette used by the plain and sliced orthomax movies
    pub orthomax_palette: String,
    /// Palette used by the depth-coded movie
    pub depth_palette: String,
    /// File extension of the movies, without the dot
    pub video_extension: String,
    /// Whether long loops draw a progress bar
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resolution_level: 0,
            slice_depth: DEFAULT_SLICE_DEPTH,
            imaging_interval_secs: 10,
            frame_rate: 10,
            gap: 20,
            orthomax_palette: "viridis".to_string(),
            depth_palette: "gist_rainbow_r".to_string(),
            video_extension: "avi".to_string(),
            show_progress: true,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.slice_depth == 0 {
            return Err(PipelineError::Configuration(
                "slice depth must be at least 1".to_string(),
            ));
        }
        if self.frame_rate == 0 {
            return Err(PipelineError::Configuration(
                "frame rate must be at least 1".to_string(),
            ));
        }
        if self.video_extension.is_empty() {
            return Err(PipelineError::Configuration(
                "video extension must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for PipelineConfig
#[derive(Default)]
pub struct PipelineConfigBuilder {
    resolution_level: Option<usize>,
    slice_depth: Option<usize>,
    imaging_interval_secs: Option<u32>,
    frame_rate: Option<u32>,
    gap: Option<usize>,
    orthomax_palette: Option<String>,
    depth_palette: Option<String>,
    video_extension: Option<String>,
    show_progress: Option<bool>,
}

impl PipelineConfigBuilder {
    pub fn resolution_level(mut self, level: usize) -> Self {
        self.resolution_level = Some(level);
        self
    }

    pub fn slice_depth(mut self, depth: usize) -> Self {
        self.slice_depth = Some(depth);
        self
    }

    pub fn imaging_interval_secs(mut self, secs: u32) -> Self {
        self.imaging_interval_secs = Some(secs);
        self
    }

    pub fn frame_rate(mut self, fps: u32) -> Self {
        self.frame_rate = Some(fps);
        self
    }

    pub fn gap(mut self, gap: usize) -> Self {
        self.gap = Some(gap);
        self
    }

    pub fn orthomax_palette(mut self, name: impl Into<String>) -> Self {
        self.orthomax_palette = Some(name.into());
        self
    }

    pub fn depth_palette(mut self, name: impl Into<String>) -> Self {
        self.depth_palette = Some(name.into());
        self
    }

    pub fn video_extension(mut self, ext: impl Into<String>) -> Self {
        self.video_extension = Some(ext.into());
        self
    }

    pub fn show_progress(mut self, enable: bool) -> Self {
        self.show_progress = Some(enable);
        self
    }

    pub fn build(self) -> PipelineConfig {
        let default = PipelineConfig::default();
        PipelineConfig {
            resolution_level: self.resolution_level.unwrap_or(default.resolution_level),
            slice_depth: self.slice_depth.unwrap_or(default.slice_depth),
            imaging_interval_secs: self
                .imaging_interval_secs
                .unwrap_or(default.imaging_interval_secs),
            frame_rate: self.frame_rate.unwrap_or(default.frame_rate),
            gap: self.gap.unwrap_or(default.gap),
            orthomax_palette: self.orthomax_palette.unwrap_or(default.orthomax_palette),
            depth_palette: self.depth_palette.unwrap_or(default.depth_palette),
            video_extension: self.video_extension.unwrap_or(default.video_extension),
            show_progress: self.show_progress.unwrap_or(default.show_progress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = PipelineConfig::builder()
            .slice_depth(10)
            .imaging_interval_secs(30)
            .depth_palette("viridis")
            .show_progress(false)
            .build();

        assert_eq!(config.slice_depth, 10);
        assert_eq!(config.imaging_interval_secs, 30);
        assert_eq!(config.depth_palette, "viridis");
        assert!(!config.show_progress);
        assert_eq!(config.frame_rate, 10);
        assert_eq!(config.gap, 20);
        assert_eq!(config.orthomax_palette, "viridis");
    }

    #[test]
    fn test_defaults_validate() {
        let config = PipelineConfig::default();
        assert_eq!(config.slice_depth, DEFAULT_SLICE_DEPTH);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_slice_depth_rejected() {
        let config = PipelineConfig::builder().slice_depth(0).build();
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Configuration(_))
        ));
    }
}
