//! Intensity normalisation into the 8-bit display range

use ndarray::{Array, ArrayBase, Data, Dimension};

use crate::ortho_pipeline::metadata::DisplayWindow;

/// Map one raw intensity through a display window.
///
/// Values are clipped to the window, rebased to its minimum and scaled so the
/// maximum lands on 255; the fractional part is truncated.
#[inline]
pub fn adjust_value(value: f64, window: &DisplayWindow) -> u8 {
    let (min, max) = (window.min(), window.max());
    let rebased = (value.clamp(min, max) - min).max(0.0);
    (rebased / (max - min) * 255.0) as u8
}

/// Contrast-adjust a raster of any numeric element type into `u8`.
///
/// [`DisplayWindow`] guarantees `min < max`, so the division is always defined.
pub fn adjust_contrast<S, A, D>(image: &ArrayBase<S, D>, window: &DisplayWindow) -> Array<u8, D>
where
    S: Data<Elem = A>,
    A: Copy + Into<f64>,
    D: Dimension,
{
    image.mapv(|v| adjust_value(v.into(), window))
}

/// `255 - v`, used for channels displayed inverted.
pub fn invert<D: Dimension>(image: &mut Array<u8, D>) {
    image.mapv_inplace(|v| 255 - v);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ortho_pipeline::common::error::PipelineError;
    use ndarray::array;

    #[test]
    fn test_linear_mapping_and_clipping() {
        let window = DisplayWindow::new(100.0, 200.0).unwrap();
        let image = array![[0u16, 100, 150], [200, 250, 199]];
        let adjusted = adjust_contrast(&image, &window);
        // 150 -> 127.5 and 199 -> 252.45 truncate
        assert_eq!(adjusted, array![[0u8, 0, 127], [255, 255, 252]]);
    }

    #[test]
    fn test_output_saturates_for_any_input() {
        let window = DisplayWindow::new(-5.0, 5.0).unwrap();
        for value in [-1e9, -5.0, -4.999, 0.0, 4.999, 5.0, 1e9] {
            let adjusted = adjust_value(value, &window);
            if value <= -5.0 {
                assert_eq!(adjusted, 0);
            }
            if value >= 5.0 {
                assert_eq!(adjusted, 255);
            }
        }
        // rescale an adjusted image back to raw units and adjust again
        let image = array![[0.0f64, 2.5, 10.0]];
        let adjusted = adjust_contrast(&image, &window);
        let rescaled = adjusted.mapv(|v| f64::from(v) / 255.0 * 10.0 - 5.0);
        let again = adjust_contrast(&rescaled, &window);
        assert_eq!(again[[0, 2]], 255);
        assert!(again[[0, 0]] <= adjusted[[0, 0]]);
    }

    #[test]
    fn test_degenerate_window_is_unrepresentable() {
        assert!(matches!(
            DisplayWindow::new(10.0, 10.0),
            Err(PipelineError::DegenerateWindow { .. })
        ));
        assert!(DisplayWindow::new(10.0, 9.0).is_err());
    }

    #[test]
    fn test_invert() {
        let mut image = array![[0u8, 55, 255]];
        invert(&mut image);
        assert_eq!(image, array![[255u8, 200, 0]]);
    }
}
