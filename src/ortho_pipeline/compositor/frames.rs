//! Per-mode frame assembly: raw projections in, display-ready RGB canvas out.

use image::RgbImage;
use ndarray::{Array, Array2, Array3, ArrayBase, ArrayView2, ArrayView3, Axis, Data, Dimension, Zip, s};

use super::layout::{OrthoLayout, SlicedLayout, region_mut3};
use crate::ortho_pipeline::colormap::{DepthColormap, Palette, apply_palette, colorize_along_axis, colorize_by_depth};
use crate::ortho_pipeline::common::error::{PipelineError, Result};
use crate::ortho_pipeline::contrast::{adjust_contrast, invert};
use crate::ortho_pipeline::metadata::DisplayWindow;

/// The four projections of one channel at one time point.
#[derive(Debug, Clone, PartialEq)]
pub struct OrthoViews {
    /// (Y, X)
    pub max_z: Array2<u16>,
    /// (Y, X) z index of each maximum
    pub argmax_z: Array2<u16>,
    /// (Z, X)
    pub max_y: Array2<u16>,
    /// (Z, Y)
    pub max_x: Array2<u16>,
}

/// Display settings of one channel.
#[derive(Debug, Clone, Copy)]
pub struct ChannelDisplay {
    pub window: DisplayWindow,
    pub invert: bool,
}

fn gray<S, D>(raw: &ArrayBase<S, D>, display: ChannelDisplay) -> Array<u8, D>
where
    S: Data<Elem = u16>,
    D: Dimension,
{
    let mut out = adjust_contrast(raw, &display.window);
    if display.invert {
        invert(&mut out);
    }
    out
}

/// Palette-coloured canvas with every pixel whose raw value is zero black,
/// gap bands included.
fn palette_canvas(raw: &Array2<u16>, display: ChannelDisplay, palette: &Palette) -> Array3<u8> {
    let mut rgb = apply_palette(gray(raw, display).view(), palette);
    mask_where(&mut rgb, raw.view(), |&v| v == 0);
    rgb
}

fn mask_where<A>(rgb: &mut Array3<u8>, reference: ArrayView2<'_, A>, is_masked: impl Fn(&A) -> bool + Sync)
where
    A: Sync,
{
    Zip::from(rgb.lanes_mut(Axis(2)))
        .and(&reference)
        .par_for_each(|mut pixel, value| {
            if is_masked(value) {
                pixel.fill(0);
            }
        });
}

/// Orthogonal maximum-intensity frame coloured with a single palette.
pub fn orthomax_frame(
    views: &OrthoViews,
    display: ChannelDisplay,
    palette: &Palette,
    layout: &OrthoLayout,
) -> Result<Array3<u8>> {
    let raw = layout.compose_raw(views.max_z.view(), views.max_y.view(), views.max_x.view())?;
    Ok(palette_canvas(&raw, display, palette))
}

/// Stacked slab projections coloured with a single palette.
pub fn sliced_frame(
    slabs: ArrayView3<'_, u16>,
    display: ChannelDisplay,
    palette: &Palette,
    layout: &SlicedLayout,
) -> Result<Array3<u8>> {
    let raw = layout.compose_raw(slabs)?;
    Ok(palette_canvas(&raw, display, palette))
}

/// Orthogonal frame where hue encodes depth.
///
/// The XY view takes the colour of the slice holding each maximum; the side
/// views colour every row (XZ) or column (YZ) by its own z. Nothing is masked.
pub fn depth_frame(
    views: &OrthoViews,
    display: ChannelDisplay,
    colormap: &DepthColormap,
    layout: &OrthoLayout,
) -> Result<Array3<u8>> {
    layout.check_shapes(views.max_z.dim(), views.max_y.dim(), views.max_x.dim())?;

    let xy = colorize_by_depth(gray(&views.max_z, display).view(), views.argmax_z.view(), colormap)?;
    let xz = colorize_along_axis(gray(&views.max_y, display).view(), Axis(0), colormap)?;
    let yz = colorize_along_axis(gray(&views.max_x.t(), display).view(), Axis(1), colormap)?;

    let mut canvas = Array3::<u8>::zeros((layout.height(), layout.width(), 3));
    region_mut3(&mut canvas, layout.xz_region()).assign(&xz.slice(s![..;-1, .., ..]));
    region_mut3(&mut canvas, layout.xy_region()).assign(&xy);
    region_mut3(&mut canvas, layout.yz_region()).assign(&yz);
    Ok(canvas)
}

/// Two-channel overlay: primary in red and blue, inverted secondary in green.
/// Pixels where the contrast-adjusted primary is zero are black.
pub fn composite_frame(
    primary: &OrthoViews,
    primary_window: DisplayWindow,
    secondary: &OrthoViews,
    secondary_window: DisplayWindow,
    layout: &OrthoLayout,
) -> Result<Array3<u8>> {
    let raw_primary = layout.compose_raw(primary.max_z.view(), primary.max_y.view(), primary.max_x.view())?;
    let raw_secondary =
        layout.compose_raw(secondary.max_z.view(), secondary.max_y.view(), secondary.max_x.view())?;

    let magenta = adjust_contrast(&raw_primary, &primary_window);
    let mut green = adjust_contrast(&raw_secondary, &secondary_window);
    invert(&mut green);

    let mut canvas = Array3::<u8>::zeros((layout.height(), layout.width(), 3));
    Zip::from(canvas.lanes_mut(Axis(2)))
        .and(&magenta)
        .and(&green)
        .par_for_each(|mut pixel, &m, &g| {
            if m != 0 {
                pixel[0] = m;
                pixel[1] = g;
                pixel[2] = m;
            }
        });
    Ok(canvas)
}

/// Hand a finished (H, W, 3) canvas over as an [`RgbImage`].
pub fn to_rgb_image(canvas: Array3<u8>) -> Result<RgbImage> {
    let (height, width, channels) = canvas.dim();
    if channels != 3 {
        return Err(PipelineError::Shape(format!("canvas has {channels} channels, expected 3")));
    }
    let pixels = match canvas.as_slice() {
        Some(contiguous) => contiguous.to_vec(),
        None => canvas.iter().copied().collect(),
    };
    RgbImage::from_raw(width as u32, height as u32, pixels)
        .ok_or_else(|| PipelineError::Shape(format!("cannot build a {width}x{height} RGB image")))
}
