//! Timestamp and scale-bar annotations.

use ndarray::Array3;
use tracing::debug;

use super::layout::{OrthoLayout, Region, SlicedLayout};
use super::text::{draw_text, draw_text_vertical, fill_rect};
use crate::ortho_pipeline::metadata::VoxelDims;

const WHITE: [u8; 3] = [255, 255, 255];

/// Bar lengths used when the voxel size is unknown.
const DEFAULT_100_UM_PX: usize = 42;
const DEFAULT_1_MM_PX: usize = 416;
const DEFAULT_VOXEL_Z_UM: f64 = 2.0;

/// `MM:SS` for frame `frame_index` taken every `interval_secs` seconds.
pub fn format_timestamp(frame_index: usize, interval_secs: u32) -> String {
    let total = frame_index as u64 * u64::from(interval_secs);
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleBarOrientation {
    Horizontal,
    /// Bar runs downwards from `pos_y`; the label reads bottom to top.
    Vertical,
}

/// Immutable description of one scale bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleBar {
    pub pos_y: usize,
    pub pos_x: usize,
    pub thickness: usize,
    pub length: usize,
    pub label: String,
    pub text_offset: usize,
    pub font_scale: usize,
    pub orientation: ScaleBarOrientation,
}

impl ScaleBar {
    pub fn rect(&self) -> Region {
        match self.orientation {
            ScaleBarOrientation::Horizontal => Region::new(self.pos_y, self.pos_x, self.thickness, self.length),
            ScaleBarOrientation::Vertical => Region::new(self.pos_y, self.pos_x, self.length, self.thickness),
        }
    }

    /// Draw the bar and its label; nothing is painted outside `clip`. A bar
    /// that does not fit inside `clip` is left out together with its label.
    pub fn draw(&self, canvas: &mut Array3<u8>, clip: Region) {
        let bar = self.rect();
        let fits = bar.top >= clip.top
            && bar.left >= clip.left
            && bar.bottom() <= clip.bottom()
            && bar.right() <= clip.right();
        if !fits {
            debug!(label = %self.label, ?bar, ?clip, "Scale bar does not fit, skipped");
            return;
        }
        fill_rect(canvas, bar, clip, WHITE);
        match self.orientation {
            ScaleBarOrientation::Horizontal => {
                draw_text(
                    canvas,
                    &self.label,
                    self.pos_y as isize - 10,
                    (self.pos_x + self.text_offset) as isize,
                    self.font_scale,
                    clip,
                    WHITE,
                );
            }
            ScaleBarOrientation::Vertical => {
                draw_text_vertical(
                    canvas,
                    &self.label,
                    (self.pos_y + self.length).saturating_sub(self.text_offset) as isize,
                    (self.pos_x + self.thickness + 10) as isize,
                    self.font_scale,
                    clip,
                    WHITE,
                );
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampStyle {
    /// Baseline row of the text.
    pub row: usize,
    pub col: usize,
    pub font_scale: usize,
}

/// Every annotation of one movie, each bound to the region it may paint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlays {
    pub interval_secs: u32,
    pub timestamp: TimestampStyle,
    pub timestamp_clip: Region,
    pub scale_bars: Vec<(ScaleBar, Region)>,
}

impl Overlays {
    /// Orthogonal and composite movies: 100 µm bar under XY, z-extent bar in
    /// the empty corner.
    pub fn orthogonal(layout: &OrthoLayout, voxel: Option<VoxelDims>, interval_secs: u32) -> Self {
        let xy = layout.xy_region();
        let length = bar_length(100.0, voxel, DEFAULT_100_UM_PX);
        let xy_bar = ScaleBar {
            pos_y: layout.height().saturating_sub(20),
            pos_x: layout.len_x.saturating_sub(length + 8),
            thickness: 10,
            length,
            label: "100 um".to_string(),
            text_offset: 0,
            font_scale: 2,
            orientation: ScaleBarOrientation::Horizontal,
        };

        let corner = layout.corner_region();
        let voxel_z = voxel.map_or(DEFAULT_VOXEL_Z_UM, |v| v.z);
        let z_bar = ScaleBar {
            pos_y: corner.top,
            pos_x: corner.left,
            thickness: 10,
            length: layout.len_z,
            label: format!("{} um", (layout.len_z as f64 * voxel_z).round() as u64),
            text_offset: 0,
            font_scale: 1,
            orientation: ScaleBarOrientation::Vertical,
        };

        Self {
            interval_secs,
            timestamp: TimestampStyle {
                row: xy.top + 30,
                col: 15,
                font_scale: 3,
            },
            timestamp_clip: xy,
            scale_bars: vec![(xy_bar, xy), (z_bar, corner)],
        }
    }

    /// Depth-coded movies: timestamp on the XZ view, 1 mm bar under XY.
    pub fn depth(layout: &OrthoLayout, voxel: Option<VoxelDims>, interval_secs: u32) -> Self {
        let xy = layout.xy_region();
        Self {
            interval_secs,
            timestamp: TimestampStyle {
                row: 30,
                col: 15,
                font_scale: 3,
            },
            timestamp_clip: layout.xz_region(),
            scale_bars: vec![(millimetre_bar(layout.height(), layout.len_x, voxel), xy)],
        }
    }

    /// Sliced movies: large timestamp on the first band, 1 mm bar on the last.
    pub fn sliced(layout: &SlicedLayout, voxel: Option<VoxelDims>, interval_secs: u32) -> Self {
        let last = layout.band_region(layout.n_slices.saturating_sub(1));
        Self {
            interval_secs,
            timestamp: TimestampStyle {
                row: 150,
                col: 25,
                font_scale: 6,
            },
            timestamp_clip: layout.band_region(0),
            scale_bars: vec![(millimetre_bar(layout.height(), layout.width, voxel), last)],
        }
    }

    pub fn apply(&self, canvas: &mut Array3<u8>, frame_index: usize) {
        draw_text(
            canvas,
            &format_timestamp(frame_index, self.interval_secs),
            self.timestamp.row as isize,
            self.timestamp.col as isize,
            self.timestamp.font_scale,
            self.timestamp_clip,
            WHITE,
        );
        for (bar, clip) in &self.scale_bars {
            bar.draw(canvas, *clip);
        }
    }
}

fn millimetre_bar(height: usize, width: usize, voxel: Option<VoxelDims>) -> ScaleBar {
    let length = bar_length(1000.0, voxel, DEFAULT_1_MM_PX);
    ScaleBar {
        pos_y: height.saturating_sub(76),
        pos_x: width.saturating_sub(length + 52),
        thickness: 30,
        length,
        label: "1 mm".to_string(),
        text_offset: 50,
        font_scale: 3,
        orientation: ScaleBarOrientation::Horizontal,
    }
}

fn bar_length(micrometres: f64, voxel: Option<VoxelDims>, fallback: usize) -> usize {
    match voxel {
        Some(dims) if dims.x > 0.0 => ((micrometres / dims.x).round() as usize).max(1),
        _ => fallback,
    }
}
