use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{Array3, Axis};
use tracing::{info, info_span, instrument, warn};

use crate::ortho_pipeline::{
    colormap::{Palette, build_depth_colormap},
    common::error::{PipelineError, Result},
    compositor::{
        ChannelDisplay, OrthoLayout, OrthoViews, Overlays, SlicedLayout, composite_frame, depth_frame,
        orthomax_frame, sliced_frame, to_rgb_image,
    },
    config::PipelineConfig,
    metadata::ChannelDescriptor,
    progress::progress_bar,
    projection::SliceAxis,
    store::{ArrayStore, paths},
    video::{FfmpegEncoder, FrameSink, VideoEncoder, unique_path},
};

/// Extent of the dense projection arrays, cross-checked between `maxz`,
/// `maxx` and `maxy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionDims {
    pub t: usize,
    pub c: usize,
    pub z: usize,
    pub y: usize,
    pub x: usize,
}

impl ProjectionDims {
    pub fn from_shapes(max_z: &[u64], max_x: &[u64], max_y: &[u64]) -> Result<Self> {
        let ([t, c, 2, y, x], [tx, cx, zx, yx], [ty, cy, zy, xy]) = (max_z, max_x, max_y) else {
            return Err(PipelineError::Shape(format!(
                "unexpected projection shapes maxz {max_z:?}, maxx {max_x:?}, maxy {max_y:?}"
            )));
        };
        if tx != ty || zx != zy {
            return Err(PipelineError::Shape(format!(
                "maxx {max_x:?} and maxy {max_y:?} disagree on time or z extent"
            )));
        }
        if t != tx || c != cx || c != cy || y != yx || x != xy {
            return Err(PipelineError::Shape(format!(
                "maxz {max_z:?} does not match maxx {max_x:?} and maxy {max_y:?}"
            )));
        }
        Ok(Self {
            t: *t as usize,
            c: *c as usize,
            z: *zx as usize,
            y: *y as usize,
            x: *x as usize,
        })
    }

    fn layout(&self, gap: usize) -> OrthoLayout {
        OrthoLayout::new(self.z, self.y, self.x, gap)
    }
}

/// Primary (first non-inverted) and secondary (first inverted) channel of
/// the two-channel composite.
pub fn select_composite_pair(channels: &[ChannelDescriptor]) -> Result<(&ChannelDescriptor, &ChannelDescriptor)> {
    if channels.len() < 2 {
        return Err(PipelineError::Configuration(format!(
            "composite movie needs two channels, got {}",
            channels.len()
        )));
    }
    let primary = channels.iter().find(|ch| !ch.invert_display);
    let secondary = channels.iter().find(|ch| ch.invert_display);
    match (primary, secondary) {
        (Some(primary), Some(secondary)) => Ok((primary, secondary)),
        _ => Err(PipelineError::Configuration(
            "composite movie needs one channel displayed inverted and one not".to_string(),
        )),
    }
}

fn display_of(channel: &ChannelDescriptor) -> ChannelDisplay {
    ChannelDisplay {
        window: channel.window,
        invert: channel.invert_display,
    }
}

/// Renders the movies of one dataset.
pub struct MovieMaker<'s, S: ArrayStore, E: VideoEncoder> {
    store: &'s S,
    encoder: E,
    config: PipelineConfig,
    output_dir: PathBuf,
}

impl<'s, S: ArrayStore> MovieMaker<'s, S, FfmpegEncoder> {
    pub fn new(store: &'s S, config: PipelineConfig, output_dir: impl Into<PathBuf>) -> Self {
        let encoder = FfmpegEncoder::new(config.video_extension.clone());
        Self::with_custom(store, encoder, config, output_dir)
    }
}

impl<'s, S: ArrayStore, E: VideoEncoder> MovieMaker<'s, S, E> {
    pub fn with_custom(store: &'s S, encoder: E, config: PipelineConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            encoder,
            config,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn projection_dims(&self) -> Result<ProjectionDims> {
        for path in [paths::MAX_Z, paths::MAX_X, paths::MAX_Y] {
            if !self.store.node_exists(path)? {
                return Err(PipelineError::Configuration(format!(
                    "{path} missing in {}, compute the max projections first",
                    self.store.location()
                )));
            }
        }
        ProjectionDims::from_shapes(
            &self.store.array_shape(paths::MAX_Z)?,
            &self.store.array_shape(paths::MAX_X)?,
            &self.store.array_shape(paths::MAX_Y)?,
        )
    }

    fn check_channel(&self, dims: &ProjectionDims, channel: &ChannelDescriptor) -> Result<()> {
        if channel.index >= dims.c {
            return Err(PipelineError::Configuration(format!(
                "channel {} has index {} but the projections hold {} channels",
                channel.name, channel.index, dims.c
            )));
        }
        Ok(())
    }

    fn read_views(&self, dims: &ProjectionDims, t: usize, c: usize) -> Result<OrthoViews> {
        let (t, c) = (t as u64, c as u64);
        let (z, y, x) = (dims.z as u64, dims.y as u64, dims.x as u64);

        let planes = self
            .store
            .read_region(paths::MAX_Z, &[t..t + 1, c..c + 1, 0..2, 0..y, 0..x])?
            .into_shape_with_order((2, dims.y, dims.x))
            .map_err(|e| PipelineError::Shape(e.to_string()))?;
        let max_x = self
            .store
            .read_region(paths::MAX_X, &[t..t + 1, c..c + 1, 0..z, 0..y])?
            .into_shape_with_order((dims.z, dims.y))
            .map_err(|e| PipelineError::Shape(e.to_string()))?;
        let max_y = self
            .store
            .read_region(paths::MAX_Y, &[t..t + 1, c..c + 1, 0..z, 0..x])?
            .into_shape_with_order((dims.z, dims.x))
            .map_err(|e| PipelineError::Shape(e.to_string()))?;

        Ok(OrthoViews {
            max_z: planes.index_axis(Axis(0), 0).to_owned(),
            argmax_z: planes.index_axis(Axis(0), 1).to_owned(),
            max_y,
            max_x,
        })
    }

    /// Open a uniquely named movie and append `render(t)` for every time point.
    fn emit_movie<F>(&self, base_name: &str, width: usize, height: usize, frames: usize, render: F) -> Result<PathBuf>
    where
        F: Fn(usize) -> Result<Array3<u8>>,
    {
        fs::create_dir_all(&self.output_dir).map_err(|e| PipelineError::video_sink(&self.output_dir, e))?;
        let path = unique_path(&self.output_dir, base_name, self.encoder.extension());
        let mut sink = self
            .encoder
            .open(&path, width as u32, height as u32, self.config.frame_rate)?;

        let progress = progress_bar(frames, base_name, self.config.show_progress);
        for t in 0..frames {
            let _span = info_span!("frame", movie = base_name, t).entered();
            let frame = render(t).and_then(to_rgb_image).and_then(|image| sink.append_frame(&image));
            frame.map_err(|e| e.with_context(format!("dataset {}, movie {base_name}, t={t}", self.store.location())))?;
            progress.inc(1);
        }
        progress.finish();
        sink.finalize()?;

        info!(path = %path.display(), frames, "Movie written");
        Ok(path)
    }

    /// `<channel>_orthomax`: palette-coloured orthogonal view.
    #[instrument(skip(self, channel), fields(channel = %channel.name))]
    pub fn render_orthomax(&self, channel: &ChannelDescriptor) -> Result<PathBuf> {
        let dims = self.projection_dims()?;
        self.check_channel(&dims, channel)?;
        let palette = Palette::by_name(&self.config.orthomax_palette)?;
        let layout = dims.layout(self.config.gap);
        let overlays = Overlays::orthogonal(&layout, channel.voxel_dims, self.config.imaging_interval_secs);

        self.emit_movie(
            &format!("{}_orthomax", channel.name),
            layout.width(),
            layout.height(),
            dims.t,
            |t| {
                let views = self.read_views(&dims, t, channel.index)?;
                let mut canvas = orthomax_frame(&views, display_of(channel), &palette, &layout)?;
                overlays.apply(&mut canvas, t);
                Ok(canvas)
            },
        )
    }

    /// `<channel>_X_sliced_orthomax` or `<channel>_Y_sliced_orthomax`.
    #[instrument(skip(self, channel), fields(channel = %channel.name))]
    pub fn render_sliced(&self, channel: &ChannelDescriptor, axis: SliceAxis) -> Result<PathBuf> {
        let path = match axis {
            SliceAxis::X => paths::SLICED_MAX_X,
            SliceAxis::Y => paths::SLICED_MAX_Y,
        };
        if !self.store.node_exists(path)? {
            return Err(PipelineError::Configuration(format!(
                "{path} missing in {}, compute the sliced projections first",
                self.store.location()
            )));
        }
        let shape = self.store.array_shape(path)?;
        let [t_len, c_len, n_slices, z, width] = shape[..] else {
            return Err(PipelineError::Shape(format!("{path} has shape {shape:?}, expected 5 dimensions")));
        };
        if channel.index as u64 >= c_len {
            return Err(PipelineError::Configuration(format!(
                "channel {} has index {} but {path} holds {c_len} channels",
                channel.name, channel.index
            )));
        }

        let palette = Palette::by_name(&self.config.orthomax_palette)?;
        let layout = SlicedLayout::new(n_slices as usize, z as usize, width as usize, self.config.gap);
        let overlays = Overlays::sliced(&layout, channel.voxel_dims, self.config.imaging_interval_secs);
        let c = channel.index as u64;

        self.emit_movie(
            &format!("{}_{}_sliced_orthomax", channel.name, axis.label()),
            layout.width,
            layout.height(),
            t_len as usize,
            |t| {
                let t = t as u64;
                let slabs = self
                    .store
                    .read_region(path, &[t..t + 1, c..c + 1, 0..n_slices, 0..z, 0..width])?
                    .into_shape_with_order((layout.n_slices, layout.len_z, layout.width))
                    .map_err(|e| PipelineError::Shape(e.to_string()))?;
                let mut canvas = sliced_frame(slabs.view(), display_of(channel), &palette, &layout)?;
                overlays.apply(&mut canvas, t as usize);
                Ok(canvas)
            },
        )
    }

    /// `<channel>_zdepth_orthomax`: hue encodes the depth of each maximum.
    #[instrument(skip(self, channel), fields(channel = %channel.name))]
    pub fn render_depth(&self, channel: &ChannelDescriptor) -> Result<PathBuf> {
        let dims = self.projection_dims()?;
        self.check_channel(&dims, channel)?;
        let palette = Palette::by_name(&self.config.depth_palette)?;
        let colormap = build_depth_colormap(dims.z, &palette);
        let layout = dims.layout(self.config.gap);
        let overlays = Overlays::depth(&layout, channel.voxel_dims, self.config.imaging_interval_secs);

        self.emit_movie(
            &format!("{}_zdepth_orthomax", channel.name),
            layout.width(),
            layout.height(),
            dims.t,
            |t| {
                let views = self.read_views(&dims, t, channel.index)?;
                let mut canvas = depth_frame(&views, display_of(channel), &colormap, &layout)?;
                overlays.apply(&mut canvas, t);
                Ok(canvas)
            },
        )
    }

    /// `comp_orthomax`: magenta/green overlay of two channels.
    #[instrument(skip(self, channels))]
    pub fn render_composite(&self, channels: &[ChannelDescriptor]) -> Result<PathBuf> {
        let (primary, secondary) = select_composite_pair(channels)?;
        let dims = self.projection_dims()?;
        self.check_channel(&dims, primary)?;
        self.check_channel(&dims, secondary)?;
        let layout = dims.layout(self.config.gap);
        let overlays = Overlays::orthogonal(&layout, primary.voxel_dims, self.config.imaging_interval_secs);
        info!(primary = %primary.name, secondary = %secondary.name, "Composing channels");

        self.emit_movie("comp_orthomax", layout.width(), layout.height(), dims.t, |t| {
            let first = self.read_views(&dims, t, primary.index)?;
            let second = self.read_views(&dims, t, secondary.index)?;
            let mut canvas = composite_frame(&first, primary.window, &second, secondary.window, &layout)?;
            overlays.apply(&mut canvas, t);
            Ok(canvas)
        })
    }

    /// Every movie of the dataset: per channel the plain, sliced (when the
    /// sliced projections exist) and depth-coded movies, then the composite.
    #[instrument(skip(self, channels), fields(dataset = %self.store.location()))]
    pub fn make_all_movies(&self, channels: &[ChannelDescriptor]) -> Result<Vec<PathBuf>> {
        self.config.validate()?;
        self.store.create_group(paths::MOVIES_GROUP)?;
        let has_sliced = self.store.node_exists(paths::SLICED_MAX_X)? && self.store.node_exists(paths::SLICED_MAX_Y)?;
        if !has_sliced {
            warn!("Sliced max projections not found, skipping sliced movies");
        }

        let mut movies = Vec::new();
        for channel in channels {
            movies.push(self.render_orthomax(channel)?);
            if has_sliced {
                movies.push(self.render_sliced(channel, SliceAxis::X)?);
                movies.push(self.render_sliced(channel, SliceAxis::Y)?);
            }
            movies.push(self.render_depth(channel)?);
        }
        match select_composite_pair(channels) {
            Ok(_) => movies.push(self.render_composite(channels)?),
            Err(e) => warn!(error = %e, "Skipping composite movie"),
        }
        info!(count = movies.len(), "Ortho max videos created");
        Ok(movies)
    }
}
