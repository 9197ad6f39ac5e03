//! Depth-to-colour lookup and depth colorization

use ndarray::{Array2, Array3, ArrayView2, Axis, Zip};

use crate::ortho_pipeline::colormap::palette::Palette;
use crate::ortho_pipeline::common::error::{PipelineError, Result};

/// Gray level assigned to slice `index` of `depth_count`.
///
/// Slices are spread linearly over 0..=255 so the first and last slice get
/// the palette extremes. This is `round(i / (Z - 1) * 255)`, not the older
/// `round(i / Z * 255)` scheme, which never reaches 255 and therefore shifts
/// every hue (Z = 4 gives 0, 85, 170, 255 here against 0, 64, 128, 191).
pub fn depth_gray_level(index: usize, depth_count: usize) -> u8 {
    if depth_count <= 1 {
        return 0;
    }
    (index as f64 / (depth_count - 1) as f64 * 255.0).round() as u8
}

/// One RGB colour per z slice.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthColormap {
    colors: Array2<u8>,
}

impl DepthColormap {
    pub fn len(&self) -> usize {
        self.colors.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn color(&self, depth: usize) -> [u8; 3] {
        let row = self.colors.row(depth);
        [row[0], row[1], row[2]]
    }
}

pub fn build_depth_colormap(depth_count: usize, palette: &Palette) -> DepthColormap {
    let mut colors = Array2::<u8>::zeros((depth_count, 3));
    for (index, mut row) in colors.rows_mut().into_iter().enumerate() {
        let [r, g, b] = palette.color(depth_gray_level(index, depth_count));
        row[0] = r;
        row[1] = g;
        row[2] = b;
    }
    DepthColormap { colors }
}

#[inline]
fn shade(gray: u8, color: &[u8; 3], pixel: &mut ndarray::ArrayViewMut1<'_, u8>) {
    let scale = f64::from(gray) / 255.0;
    for k in 0..3 {
        pixel[k] = (scale * f64::from(color[k])) as u8;
    }
}

/// Colour a top-down projection by the depth at which each maximum was found.
///
/// `gray` is the contrast-adjusted (and, for inverted channels, inverted)
/// projection; `depth` holds the z index per pixel. Output is (H, W, 3).
pub fn colorize_by_depth(
    gray: ArrayView2<'_, u8>,
    depth: ArrayView2<'_, u16>,
    colormap: &DepthColormap,
) -> Result<Array3<u8>> {
    if gray.dim() != depth.dim() {
        return Err(PipelineError::Shape(format!(
            "grayscale image {:?} and depth map {:?} differ",
            gray.dim(),
            depth.dim()
        )));
    }
    if let Some(&bad) = depth.iter().find(|&&d| usize::from(d) >= colormap.len()) {
        return Err(PipelineError::Shape(format!(
            "depth index {bad} outside colormap of {} slices",
            colormap.len()
        )));
    }

    let (height, width) = gray.dim();
    let mut out = Array3::<u8>::zeros((height, width, 3));
    Zip::from(out.lanes_mut(Axis(2)))
        .and(&gray)
        .and(&depth)
        .par_for_each(|mut pixel, &g, &d| shade(g, &colormap.color(usize::from(d)), &mut pixel));
    Ok(out)
}

/// Colour a side projection whose own `depth_axis` is z, so every pixel at
/// position z along that axis receives `colormap[z]`.
pub fn colorize_along_axis(
    gray: ArrayView2<'_, u8>,
    depth_axis: Axis,
    colormap: &DepthColormap,
) -> Result<Array3<u8>> {
    if gray.len_of(depth_axis) > colormap.len() {
        return Err(PipelineError::Shape(format!(
            "side view has {} z positions but colormap only {}",
            gray.len_of(depth_axis),
            colormap.len()
        )));
    }

    let (height, width) = gray.dim();
    let mut out = Array3::<u8>::zeros((height, width, 3));
    Zip::indexed(out.lanes_mut(Axis(2)))
        .and(&gray)
        .for_each(|(row, col), mut pixel, &g| {
            let z = if depth_axis == Axis(0) { row } else { col };
            shade(g, &colormap.color(z), &mut pixel);
        });
    Ok(out)
}
