//! Bitmap text rendering on RGB canvases using the 8x8 legacy font.

use font8x8::legacy::BASIC_LEGACY;
use ndarray::Array3;

use super::layout::Region;

pub(crate) const GLYPH_SIZE: usize = 8;

pub(crate) fn fill_rect(canvas: &mut Array3<u8>, rect: Region, clip: Region, color: [u8; 3]) {
    let (height, width, _) = canvas.dim();
    let top = rect.top.max(clip.top);
    let left = rect.left.max(clip.left);
    let bottom = rect.bottom().min(clip.bottom()).min(height);
    let right = rect.right().min(clip.right()).min(width);
    for row in top..bottom {
        for col in left..right {
            put(canvas, row, col, color);
        }
    }
}

/// Draw `text` left to right. `(baseline_row, left_col)` is the bottom-left
/// corner of the first glyph; pixels outside `clip` are dropped.
pub(crate) fn draw_text(
    canvas: &mut Array3<u8>,
    text: &str,
    baseline_row: isize,
    left_col: isize,
    scale: usize,
    clip: Region,
    color: [u8; 3],
) {
    let cell = (GLYPH_SIZE * scale) as isize;
    let top = baseline_row - cell;
    for (index, glyph) in glyphs(text).enumerate() {
        let origin_col = left_col + index as isize * cell;
        for_each_set_pixel(glyph, scale, |gx, gy| {
            plot(canvas, top + gy as isize, origin_col + gx as isize, clip, color);
        });
    }
}

/// Draw `text` rotated a quarter turn counter-clockwise, reading bottom to
/// top. `(bottom_row, left_col)` is where the first glyph starts.
pub(crate) fn draw_text_vertical(
    canvas: &mut Array3<u8>,
    text: &str,
    bottom_row: isize,
    left_col: isize,
    scale: usize,
    clip: Region,
    color: [u8; 3],
) {
    let cell = (GLYPH_SIZE * scale) as isize;
    for (index, glyph) in glyphs(text).enumerate() {
        let advance = index as isize * cell;
        for_each_set_pixel(glyph, scale, |gx, gy| {
            plot(
                canvas,
                bottom_row - 1 - advance - gx as isize,
                left_col + gy as isize,
                clip,
                color,
            );
        });
    }
}

fn glyphs(text: &str) -> impl Iterator<Item = [u8; 8]> + '_ {
    text.chars().map(|ch| {
        let code = ch as usize;
        if code < BASIC_LEGACY.len() {
            BASIC_LEGACY[code]
        } else {
            BASIC_LEGACY[b'?' as usize]
        }
    })
}

/// Visit every set pixel of a glyph scaled by `scale`, in glyph-local
/// (column, row) coordinates. Bit 0 of each row byte is the leftmost pixel.
fn for_each_set_pixel(glyph: [u8; 8], scale: usize, mut visit: impl FnMut(usize, usize)) {
    for (row, bits) in glyph.iter().enumerate() {
        for col in 0..GLYPH_SIZE {
            if bits & (1 << col) == 0 {
                continue;
            }
            for dy in 0..scale {
                for dx in 0..scale {
                    visit(col * scale + dx, row * scale + dy);
                }
            }
        }
    }
}

fn plot(canvas: &mut Array3<u8>, row: isize, col: isize, clip: Region, color: [u8; 3]) {
    if row < 0 || col < 0 {
        return;
    }
    let (row, col) = (row as usize, col as usize);
    let (height, width, _) = canvas.dim();
    if row < height && col < width && clip.contains(row, col) {
        put(canvas, row, col, color);
    }
}

fn put(canvas: &mut Array3<u8>, row: usize, col: usize, color: [u8; 3]) {
    for (channel, value) in color.into_iter().enumerate() {
        canvas[[row, col, channel]] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 3] = [255, 255, 255];

    fn lit(canvas: &Array3<u8>) -> Vec<(usize, usize)> {
        let (height, width, _) = canvas.dim();
        let mut out = Vec::new();
        for row in 0..height {
            for col in 0..width {
                if canvas[[row, col, 0]] != 0 {
                    out.push((row, col));
                }
            }
        }
        out
    }

    #[test]
    fn test_text_stays_above_baseline() {
        let mut canvas = Array3::<u8>::zeros((40, 40, 3));
        draw_text(&mut canvas, "0", 20, 4, 2, Region::new(0, 0, 40, 40), WHITE);
        let pixels = lit(&canvas);
        assert!(!pixels.is_empty());
        assert!(pixels.iter().all(|&(r, c)| (4..20).contains(&r) && (4..20).contains(&c)));
    }

    #[test]
    fn test_text_is_clipped() {
        let mut canvas = Array3::<u8>::zeros((40, 40, 3));
        let clip = Region::new(0, 0, 12, 40);
        draw_text(&mut canvas, "88", 20, 0, 2, clip, WHITE);
        assert!(lit(&canvas).iter().all(|&(r, _)| r < 12));
    }

    #[test]
    fn test_text_off_canvas_is_ignored() {
        let mut canvas = Array3::<u8>::zeros((8, 8, 3));
        draw_text(&mut canvas, "A", 4, -20, 3, Region::new(0, 0, 8, 8), WHITE);
        draw_text_vertical(&mut canvas, "A", 100, 100, 1, Region::new(0, 0, 8, 8), WHITE);
        assert!(lit(&canvas).is_empty());
    }

    #[test]
    fn test_vertical_text_extent() {
        let mut canvas = Array3::<u8>::zeros((40, 20, 3));
        draw_text_vertical(&mut canvas, "um", 30, 2, 1, Region::new(0, 0, 40, 20), WHITE);
        let pixels = lit(&canvas);
        assert!(!pixels.is_empty());
        assert!(pixels.iter().all(|&(r, c)| (14..30).contains(&r) && (2..10).contains(&c)));
    }

    #[test]
    fn test_fill_rect_respects_clip() {
        let mut canvas = Array3::<u8>::zeros((10, 10, 3));
        fill_rect(&mut canvas, Region::new(2, 2, 6, 6), Region::new(0, 0, 5, 10), WHITE);
        let pixels = lit(&canvas);
        assert_eq!(pixels.len(), 3 * 6);
    }
}
