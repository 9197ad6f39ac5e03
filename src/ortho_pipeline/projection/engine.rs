use ndarray::{Array, Array3, Axis, Ix3, s};
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::ortho_pipeline::{
    common::error::{PipelineError, Result},
    config::PipelineConfig,
    progress::progress_bar,
    projection::reduce::{DenseProjection, SliceAxis, project_dense, project_sliced, slice_ranges},
    store::{ArrayStore, paths},
};

/// Whether a projection step did any work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionOutcome {
    Computed,
    /// Outputs were already present; nothing was read or written.
    AlreadyComputed,
}

/// Extent of a raw (t, c, z, y, x) array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeDims {
    pub t: usize,
    pub c: usize,
    pub z: usize,
    pub y: usize,
    pub x: usize,
}

impl VolumeDims {
    pub fn from_shape(shape: &[u64]) -> Result<Self> {
        let [t, c, z, y, x] = shape else {
            return Err(PipelineError::Shape(format!(
                "raw volume must have 5 dimensions (t, c, z, y, x), got {shape:?}"
            )));
        };
        let dims = Self {
            t: *t as usize,
            c: *c as usize,
            z: *z as usize,
            y: *y as usize,
            x: *x as usize,
        };
        if dims.t == 0 || dims.c == 0 {
            return Err(PipelineError::Shape(format!(
                "raw volume has no time points or channels: {shape:?}"
            )));
        }
        if dims.z == 0 || dims.y == 0 || dims.x == 0 {
            return Err(PipelineError::Shape(format!(
                "raw volume has an empty spatial axis: {shape:?}"
            )));
        }
        if dims.z > usize::from(u16::MAX) + 1 {
            return Err(PipelineError::Shape(format!(
                "{} z planes cannot be indexed by the depth map",
                dims.z
            )));
        }
        Ok(dims)
    }
}

/// Computes and persists projections of the raw data held in an [`ArrayStore`].
pub struct ProjectionEngine<'s, S: ArrayStore> {
    store: &'s S,
    config: PipelineConfig,
}

impl<'s, S: ArrayStore> ProjectionEngine<'s, S> {
    pub fn new(store: &'s S, config: PipelineConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn raw_path(&self) -> String {
        paths::resolution_level(self.config.resolution_level)
    }

    fn all_exist(&self, arrays: &[&str]) -> Result<bool> {
        for path in arrays {
            if !self.store.node_exists(path)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Shape of the configured resolution level.
    pub fn volume_dims(&self) -> Result<VolumeDims> {
        let raw_path = self.raw_path();
        if !self.store.node_exists(&raw_path)? {
            return Err(PipelineError::MissingResolutionLevel {
                dataset: self.store.location(),
                level: self.config.resolution_level,
            });
        }
        VolumeDims::from_shape(&self.store.array_shape(&raw_path)?)
    }

    fn read_volume(&self, dims: &VolumeDims, t: usize, c: usize) -> Result<Array3<u16>> {
        let region = [
            t as u64..t as u64 + 1,
            c as u64..c as u64 + 1,
            0..dims.z as u64,
            0..dims.y as u64,
            0..dims.x as u64,
        ];
        let block = self
            .store
            .read_region(&self.raw_path(), &region)?
            .into_shape_with_order((dims.z, dims.y, dims.x))
            .map_err(|e| PipelineError::Shape(e.to_string()))?;
        Ok(block)
    }

    fn context(&self, t: usize, c: usize) -> String {
        format!("dataset {}, t={t}, c={c}", self.store.location())
    }

    /// Dense projections `maxz`, `maxx` and `maxy` of every (t, c).
    #[instrument(skip(self), fields(dataset = %self.store.location()))]
    pub fn compute_dense_projections(&self) -> Result<ProjectionOutcome> {
        self.config.validate()?;
        if self.all_exist(&[paths::MAX_Z, paths::MAX_X, paths::MAX_Y])? {
            info!("Max projections already calculated, skipping calculation");
            return Ok(ProjectionOutcome::AlreadyComputed);
        }

        let dims = self.volume_dims()?;
        info!(?dims, "Computing max projections");
        let (t, c, z, y, x) = (dims.t as u64, dims.c as u64, dims.z as u64, dims.y as u64, dims.x as u64);

        self.store.create_group(paths::MAX_PROJECTIONS_GROUP)?;
        self.store.create_array(paths::MAX_Z, &[t, c, 2, y, x], &[1, c, 2, y, x])?;
        self.store.create_array(paths::MAX_X, &[t, c, z, y], &[1, c, z, y])?;
        self.store.create_array(paths::MAX_Y, &[t, c, z, x], &[1, c, z, x])?;

        let progress = progress_bar(dims.t, "max projections", self.config.show_progress);
        for ti in 0..dims.t {
            let projections = (0..dims.c)
                .into_par_iter()
                .map(|ci| {
                    self.read_volume(&dims, ti, ci)
                        .map(|volume| project_dense(volume.view()))
                        .map_err(|e| e.with_context(self.context(ti, ci)))
                })
                .collect::<Result<Vec<DenseProjection>>>()?;

            let _span = tracing::info_span!("write_projections", t = ti).entered();
            let mut max_z = Array::<u16, _>::zeros((1, dims.c, 2, dims.y, dims.x));
            let mut max_x = Array::<u16, _>::zeros((1, dims.c, dims.z, dims.y));
            let mut max_y = Array::<u16, _>::zeros((1, dims.c, dims.z, dims.x));
            for (ci, projection) in projections.iter().enumerate() {
                max_z.slice_mut(s![0, ci, 0, .., ..]).assign(&projection.max_z);
                max_z.slice_mut(s![0, ci, 1, .., ..]).assign(&projection.argmax_z);
                max_x.slice_mut(s![0, ci, .., ..]).assign(&projection.max_x);
                max_y.slice_mut(s![0, ci, .., ..]).assign(&projection.max_y);
            }
            let origin = ti as u64;
            self.store
                .write_region(paths::MAX_Z, &[origin, 0, 0, 0, 0], max_z.view().into_dyn())
                .and_then(|_| {
                    self.store
                        .write_region(paths::MAX_X, &[origin, 0, 0, 0], max_x.view().into_dyn())
                })
                .and_then(|_| {
                    self.store
                        .write_region(paths::MAX_Y, &[origin, 0, 0, 0], max_y.view().into_dyn())
                })
                .map_err(|e| e.with_context(format!("dataset {}, t={ti}", self.store.location())))?;
            debug!(t = ti, "Wrote max projections");
            progress.inc(1);
        }
        progress.finish();

        info!(time_points = dims.t, channels = dims.c, "Max projections calculated");
        Ok(ProjectionOutcome::Computed)
    }

    /// Band-restricted projections `sliced_maxx` and `sliced_maxy` of every (t, c).
    #[instrument(skip(self), fields(dataset = %self.store.location(), slice_depth = self.config.slice_depth))]
    pub fn compute_sliced_projections(&self) -> Result<ProjectionOutcome> {
        self.config.validate()?;
        if self.all_exist(&[paths::SLICED_MAX_X, paths::SLICED_MAX_Y])? {
            info!("Sliced max projections already calculated, skipping calculation");
            return Ok(ProjectionOutcome::AlreadyComputed);
        }

        let dims = self.volume_dims()?;
        let depth = self.config.slice_depth;
        let n_slices_x = slice_ranges(dims.x, depth).len();
        let n_slices_y = slice_ranges(dims.y, depth).len();
        info!(?dims, n_slices_x, n_slices_y, "Computing sliced max projections");

        let (t, c, z, y, x) = (dims.t as u64, dims.c as u64, dims.z as u64, dims.y as u64, dims.x as u64);
        let (nx, ny) = (n_slices_x as u64, n_slices_y as u64);
        self.store.create_group(paths::SLICED_MAX_PROJECTIONS_GROUP)?;
        self.store
            .create_array(paths::SLICED_MAX_X, &[t, c, nx, z, y], &[1, 1, nx.min(2), z, y])?;
        self.store
            .create_array(paths::SLICED_MAX_Y, &[t, c, ny, z, x], &[1, 1, ny.min(2), z, x])?;

        let progress = progress_bar(dims.t, "sliced max projections", self.config.show_progress);
        for ti in 0..dims.t {
            let slabs = (0..dims.c)
                .into_par_iter()
                .map(|ci| {
                    self.read_volume(&dims, ti, ci)
                        .map(|volume| {
                            (
                                project_sliced(volume.view(), SliceAxis::X, depth),
                                project_sliced(volume.view(), SliceAxis::Y, depth),
                            )
                        })
                        .map_err(|e| e.with_context(self.context(ti, ci)))
                })
                .collect::<Result<Vec<_>>>()?;

            let _span = tracing::info_span!("write_sliced_projections", t = ti).entered();
            for (ci, (sliced_x, sliced_y)) in slabs.into_iter().enumerate() {
                let origin = [ti as u64, ci as u64, 0, 0, 0];
                write_slab(self.store, paths::SLICED_MAX_X, &origin, sliced_x)
                    .and_then(|_| write_slab(self.store, paths::SLICED_MAX_Y, &origin, sliced_y))
                    .map_err(|e| e.with_context(self.context(ti, ci)))?;
            }
            progress.inc(1);
        }
        progress.finish();

        info!(time_points = dims.t, channels = dims.c, "Sliced max projections calculated");
        Ok(ProjectionOutcome::Computed)
    }
}

fn write_slab<S: ArrayStore>(store: &S, path: &str, origin: &[u64], slab: Array<u16, Ix3>) -> Result<()> {
    let block = slab.insert_axis(Axis(0)).insert_axis(Axis(0));
    store.write_region(path, origin, block.view().into_dyn())
}

/// Brightest projected value of one channel over every time point.
///
/// Serves as the display maximum of channels whose metadata omits one, so
/// `maxz` must already be computed.
pub fn projected_channel_max<S: ArrayStore>(store: &S, channel: usize) -> Result<u16> {
    if !store.node_exists(paths::MAX_Z)? {
        return Err(PipelineError::Configuration(format!(
            "{} has no max projections to derive a display maximum from",
            store.location()
        )));
    }
    let shape = store.array_shape(paths::MAX_Z)?;
    let [t, c, _, y, x] = shape.as_slice() else {
        return Err(PipelineError::Shape(format!("maxz must have 5 dimensions, got {shape:?}")));
    };
    if channel as u64 >= *c {
        return Err(PipelineError::Shape(format!(
            "channel {channel} is out of range for maxz with {c} channels"
        )));
    }
    let channel = channel as u64;
    let region = [0..*t, channel..channel + 1, 0..1, 0..*y, 0..*x];
    let plane = store.read_region(paths::MAX_Z, &region)?;
    Ok(plane.iter().copied().max().unwrap_or(0))
}
