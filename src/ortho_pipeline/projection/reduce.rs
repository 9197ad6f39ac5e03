//! Maximum-intensity reduction kernels over a single (z, y, x) volume

use std::ops::Range;

use ndarray::{Array2, Array3, ArrayView3, Axis, Zip, s};

/// Projections of one (z, y, x) volume.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseProjection {
    /// Maximum over z, shape (Y, X).
    pub max_z: Array2<u16>,
    /// z at which `max_z` was first reached, shape (Y, X).
    pub argmax_z: Array2<u16>,
    /// Maximum over x, shape (Z, Y).
    pub max_x: Array2<u16>,
    /// Maximum over y, shape (Z, X).
    pub max_y: Array2<u16>,
}

/// Spatial axis partitioned into bands and collapsed within each band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceAxis {
    X,
    Y,
}

impl SliceAxis {
    /// Axis index inside a (z, y, x) volume.
    fn volume_axis(self) -> Axis {
        match self {
            SliceAxis::X => Axis(2),
            SliceAxis::Y => Axis(1),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SliceAxis::X => "X",
            SliceAxis::Y => "Y",
        }
    }
}

fn max_over(volume: &ArrayView3<'_, u16>, axis: Axis) -> Array2<u16> {
    volume.fold_axis(axis, 0u16, |&acc, &v| acc.max(v))
}

/// Per-pixel maximum over z and the lowest z reaching it.
///
/// `volume` must have at least one z plane.
pub fn max_and_argmax_z(volume: ArrayView3<'_, u16>) -> (Array2<u16>, Array2<u16>) {
    let mut max = volume.index_axis(Axis(0), 0).to_owned();
    let mut argmax = Array2::<u16>::zeros(max.raw_dim());
    for (z, plane) in volume.axis_iter(Axis(0)).enumerate().skip(1) {
        let z = z as u16;
        // Strictly greater: ties keep the earlier plane.
        Zip::from(&mut max)
            .and(&mut argmax)
            .and(&plane)
            .for_each(|m, a, &v| {
                if v > *m {
                    *m = v;
                    *a = z;
                }
            });
    }
    (max, argmax)
}

pub fn project_dense(volume: ArrayView3<'_, u16>) -> DenseProjection {
    let (max_z, argmax_z) = max_and_argmax_z(volume.view());
    DenseProjection {
        max_z,
        argmax_z,
        max_x: max_over(&volume, Axis(2)),
        max_y: max_over(&volume, Axis(1)),
    }
}

/// Contiguous bands of width `depth` covering `0..len`; the last may be shorter.
pub fn slice_ranges(len: usize, depth: usize) -> Vec<Range<usize>> {
    if depth == 0 {
        return Vec::new();
    }
    (0..len.div_ceil(depth))
        .map(|k| k * depth..((k + 1) * depth).min(len))
        .collect()
}

/// Band-restricted projections, shape (nSlices, Z, Y) for [`SliceAxis::X`]
/// and (nSlices, Z, X) for [`SliceAxis::Y`].
pub fn project_sliced(volume: ArrayView3<'_, u16>, axis: SliceAxis, depth: usize) -> Array3<u16> {
    let (len_z, len_y, len_x) = volume.dim();
    let (len, kept) = match axis {
        SliceAxis::X => (len_x, len_y),
        SliceAxis::Y => (len_y, len_x),
    };
    let ranges = slice_ranges(len, depth);
    let mut out = Array3::<u16>::zeros((ranges.len(), len_z, kept));
    for (k, range) in ranges.into_iter().enumerate() {
        let band = match axis {
            SliceAxis::X => volume.slice(s![.., .., range]),
            SliceAxis::Y => volume.slice(s![.., range, ..]),
        };
        out.index_axis_mut(Axis(0), k)
            .assign(&max_over(&band, axis.volume_axis()));
    }
    out
}
