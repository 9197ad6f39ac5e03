//! Colour lookup module
//!
//! Named continuous palettes and the depth colorizer that turns a grayscale
//! projection plus a depth map into a colour raster whose brightness follows
//! intensity and whose hue follows depth.

pub mod depth;
pub mod palette;

pub use depth::{
    DepthColormap, build_depth_colormap, colorize_along_axis, colorize_by_depth, depth_gray_level,
};
pub use palette::{Palette, apply_palette};
