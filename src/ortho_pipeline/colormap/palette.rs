//! Named continuous palettes sampled into 256-entry RGB tables

use ndarray::{Array3, ArrayView2, Axis, Zip};

use crate::ortho_pipeline::common::error::{PipelineError, Result};

type Anchor = (f64, [f64; 3]);

// Matplotlib viridis sampled at 1/8 steps.
const VIRIDIS: &[Anchor] = &[
    (0.000, [0.267004, 0.004874, 0.329415]),
    (0.125, [0.278826, 0.175490, 0.483397]),
    (0.250, [0.229739, 0.322361, 0.545706]),
    (0.375, [0.172719, 0.448791, 0.557885]),
    (0.500, [0.127568, 0.566949, 0.550556]),
    (0.625, [0.157851, 0.683765, 0.501686]),
    (0.750, [0.369214, 0.788888, 0.382914]),
    (0.875, [0.678489, 0.863742, 0.189503]),
    (1.000, [0.993248, 0.906157, 0.143936]),
];

// Matplotlib gist_rainbow segment data.
const GIST_RAINBOW: &[Anchor] = &[
    (0.000, [1.00, 0.00, 0.16]),
    (0.030, [1.00, 0.00, 0.00]),
    (0.215, [1.00, 1.00, 0.00]),
    (0.400, [0.00, 1.00, 0.00]),
    (0.586, [0.00, 1.00, 1.00]),
    (0.770, [0.00, 0.00, 1.00]),
    (0.954, [1.00, 0.00, 1.00]),
    (1.000, [1.00, 0.00, 0.75]),
];

const GRAY: &[Anchor] = &[(0.0, [0.0, 0.0, 0.0]), (1.0, [1.0, 1.0, 1.0])];

fn anchors(base: &str) -> Option<&'static [Anchor]> {
    match base {
        "viridis" => Some(VIRIDIS),
        "gist_rainbow" => Some(GIST_RAINBOW),
        "gray" | "grey" => Some(GRAY),
        _ => None,
    }
}

fn interpolate(anchors: &[Anchor], x: f64) -> [u8; 3] {
    let upper = anchors
        .iter()
        .position(|(pos, _)| *pos >= x)
        .unwrap_or(anchors.len() - 1)
        .max(1);
    let (x0, c0) = anchors[upper - 1];
    let (x1, c1) = anchors[upper];
    let t = if x1 > x0 { ((x - x0) / (x1 - x0)).clamp(0.0, 1.0) } else { 0.0 };
    let mut rgb = [0u8; 3];
    for (k, out) in rgb.iter_mut().enumerate() {
        let v = c0[k] + (c1[k] - c0[k]) * t;
        *out = (v * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    rgb
}

/// A continuous palette indexed by 8-bit gray level.
///
/// Names follow matplotlib; a `_r` suffix reverses any palette.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    name: String,
    table: Vec<[u8; 3]>,
}

impl Palette {
    pub fn by_name(name: &str) -> Result<Self> {
        let (base, reversed) = match name.strip_suffix("_r") {
            Some(base) => (base, true),
            None => (name, false),
        };
        let anchors = anchors(base).ok_or_else(|| PipelineError::UnknownPalette(name.to_string()))?;
        let mut table: Vec<[u8; 3]> = (0..=255u16)
            .map(|level| interpolate(anchors, f64::from(level) / 255.0))
            .collect();
        if reversed {
            table.reverse();
        }
        Ok(Self {
            name: name.to_string(),
            table,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn color(&self, gray: u8) -> [u8; 3] {
        self.table[usize::from(gray)]
    }
}

/// Map every gray level of `image` through `palette`, giving an (H, W, 3) raster.
pub fn apply_palette(image: ArrayView2<'_, u8>, palette: &Palette) -> Array3<u8> {
    let (height, width) = image.dim();
    let mut out = Array3::<u8>::zeros((height, width, 3));
    Zip::from(out.lanes_mut(Axis(2)))
        .and(&image)
        .for_each(|mut pixel, &gray| {
            let [r, g, b] = palette.color(gray);
            pixel[0] = r;
            pixel[1] = g;
            pixel[2] = b;
        });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_gist_rainbow_extremes() {
        let palette = Palette::by_name("gist_rainbow").unwrap();
        assert_eq!(palette.color(0), [255, 0, 41]);
        assert_eq!(palette.color(255), [255, 0, 191]);
    }

    #[test]
    fn test_reversed_palette() {
        let forward = Palette::by_name("viridis").unwrap();
        let reversed = Palette::by_name("viridis_r").unwrap();
        for level in 0..=255u8 {
            assert_eq!(reversed.color(level), forward.color(255 - level));
        }
        assert_eq!(reversed.name(), "viridis_r");
    }

    #[test]
    fn test_viridis_endpoints() {
        let palette = Palette::by_name("viridis").unwrap();
        assert_eq!(palette.color(0), [68, 1, 84]);
        assert_eq!(palette.color(255), [253, 231, 37]);
    }

    #[test]
    fn test_unknown_palette() {
        assert!(matches!(
            Palette::by_name("jet"),
            Err(PipelineError::UnknownPalette(_))
        ));
    }

    #[test]
    fn test_apply_palette() {
        let palette = Palette::by_name("gray").unwrap();
        let out = apply_palette(array![[0u8, 128]].view(), &palette);
        assert_eq!(out.dim(), (1, 2, 3));
        assert_eq!(out[[0, 1, 0]], 128);
        assert_eq!(out[[0, 0, 2]], 0);
    }
}
