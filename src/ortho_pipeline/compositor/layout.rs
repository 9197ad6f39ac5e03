//! Canvas geometry of the orthogonal and sliced views

use ndarray::{Array2, ArrayView2, ArrayView3, ArrayViewMut3, Axis, s};

use crate::ortho_pipeline::common::error::{PipelineError, Result};

/// Axis-aligned rectangle on a canvas, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub top: usize,
    pub left: usize,
    pub height: usize,
    pub width: usize,
}

impl Region {
    pub fn new(top: usize, left: usize, height: usize, width: usize) -> Self {
        Self {
            top,
            left,
            height,
            width,
        }
    }

    pub fn bottom(&self) -> usize {
        self.top + self.height
    }

    pub fn right(&self) -> usize {
        self.left + self.width
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.top && row < self.bottom() && col >= self.left && col < self.right()
    }
}

/// Orthogonal view: XZ on top-left, XY bottom-left, YZ bottom-right.
///
/// ```text
/// +------+---+------+
/// |  XZ  |   |      |
/// +------+---+------+   <- gap rows
/// |  XY  |   |  YZ  |
/// +------+---+------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrthoLayout {
    pub len_z: usize,
    pub len_y: usize,
    pub len_x: usize,
    pub gap: usize,
}

impl OrthoLayout {
    pub fn new(len_z: usize, len_y: usize, len_x: usize, gap: usize) -> Self {
        Self {
            len_z,
            len_y,
            len_x,
            gap,
        }
    }

    pub fn height(&self) -> usize {
        self.len_y + self.len_z + self.gap
    }

    pub fn width(&self) -> usize {
        self.len_x + self.len_z + self.gap
    }

    /// Y projection, z flipped so the top of the volume is up.
    pub fn xz_region(&self) -> Region {
        Region::new(0, 0, self.len_z, self.len_x)
    }

    pub fn xy_region(&self) -> Region {
        Region::new(self.len_z + self.gap, 0, self.len_y, self.len_x)
    }

    /// X projection, transposed to (y, z).
    pub fn yz_region(&self) -> Region {
        Region::new(self.len_z + self.gap, self.len_x + self.gap, self.len_y, self.len_z)
    }

    /// Top-right corner not covered by any projection.
    pub fn corner_region(&self) -> Region {
        Region::new(0, self.len_x + self.gap, self.len_z, self.len_z)
    }

    /// Fail unless the projections are (Y, X), (Z, X) and (Z, Y).
    pub fn check_shapes(
        &self,
        max_z: (usize, usize),
        max_y: (usize, usize),
        max_x: (usize, usize),
    ) -> Result<()> {
        check_dim("XY projection", max_z, (self.len_y, self.len_x))?;
        check_dim("Y projection", max_y, (self.len_z, self.len_x))?;
        check_dim("X projection", max_x, (self.len_z, self.len_y))
    }

    /// Place the three raw projections on a zero canvas.
    pub fn compose_raw(
        &self,
        max_z: ArrayView2<'_, u16>,
        max_y: ArrayView2<'_, u16>,
        max_x: ArrayView2<'_, u16>,
    ) -> Result<Array2<u16>> {
        self.check_shapes(max_z.dim(), max_y.dim(), max_x.dim())?;

        let mut canvas = Array2::<u16>::zeros((self.height(), self.width()));
        region_mut2(&mut canvas, self.xz_region()).assign(&max_y.slice(s![..;-1, ..]));
        region_mut2(&mut canvas, self.xy_region()).assign(&max_z);
        region_mut2(&mut canvas, self.yz_region()).assign(&max_x.t());
        Ok(canvas)
    }
}

/// Sliced view: every band flipped in z and stacked vertically with gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlicedLayout {
    pub n_slices: usize,
    pub len_z: usize,
    pub width: usize,
    pub gap: usize,
}

impl SlicedLayout {
    pub fn new(n_slices: usize, len_z: usize, width: usize, gap: usize) -> Self {
        Self {
            n_slices,
            len_z,
            width,
            gap,
        }
    }

    pub fn height(&self) -> usize {
        self.len_z * self.n_slices + self.gap * self.n_slices.saturating_sub(1)
    }

    pub fn band_region(&self, index: usize) -> Region {
        Region::new(index * (self.len_z + self.gap), 0, self.len_z, self.width)
    }

    /// Stack raw (nSlices, Z, W) band projections onto a zero canvas.
    pub fn compose_raw(&self, slabs: ArrayView3<'_, u16>) -> Result<Array2<u16>> {
        let expected = (self.n_slices, self.len_z, self.width);
        if slabs.dim() != expected {
            return Err(PipelineError::Shape(format!(
                "sliced projections {:?} do not match layout {expected:?}",
                slabs.dim()
            )));
        }
        let mut canvas = Array2::<u16>::zeros((self.height(), self.width));
        for (index, band) in slabs.axis_iter(Axis(0)).enumerate() {
            region_mut2(&mut canvas, self.band_region(index)).assign(&band.slice(s![..;-1, ..]));
        }
        Ok(canvas)
    }
}

fn check_dim(what: &str, actual: (usize, usize), expected: (usize, usize)) -> Result<()> {
    if actual != expected {
        return Err(PipelineError::Shape(format!(
            "{what} is {actual:?}, layout expects {expected:?}"
        )));
    }
    Ok(())
}

fn region_mut2(canvas: &mut Array2<u16>, region: Region) -> ndarray::ArrayViewMut2<'_, u16> {
    canvas.slice_mut(s![region.top..region.bottom(), region.left..region.right()])
}

/// Mutable (rows, cols, 3) view of `region` on an RGB canvas.
pub(crate) fn region_mut3(canvas: &mut ndarray::Array3<u8>, region: Region) -> ArrayViewMut3<'_, u8> {
    canvas.slice_mut(s![region.top..region.bottom(), region.left..region.right(), ..])
}
