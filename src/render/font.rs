//! Glyph generation and text runs for label rendering.
//!
//! Uses the Spleen 12×24 bitmap font, nearest-neighbor scaled to the
//! element's font size. Bold weight is emulated with a one-pixel
//! horizontal smear, which reads well at thermal-head resolution.

use spleen_font::{FONT_12X24, PSF2Font};

use super::canvas::Canvas;
use image::Rgba;

/// Native glyph cell of the Spleen face we ship.
const BASE_WIDTH: usize = 12;
const BASE_HEIGHT: usize = 24;

/// A rasterized line of text: 1-byte-per-pixel mask, row-major.
pub struct TextRun {
    pub mask: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

/// Glyph cell width for a given pixel height, keeping the face's 1:2
/// aspect.
fn char_width_for(px_height: usize) -> usize {
    (px_height * BASE_WIDTH / BASE_HEIGHT).max(1)
}

/// Measure a single-line string at the given font size.
pub fn measure(text: &str, font_size: f32) -> (f32, f32) {
    let height = px_height(font_size);
    let width = char_width_for(height) * text.chars().count();
    (width as f32, height as f32)
}

fn px_height(font_size: f32) -> usize {
    (font_size.round().max(1.0)) as usize
}

/// Fetch one glyph from the Spleen face at its native 12×24 cell.
/// Characters missing from the face render as a hollow box.
fn base_glyph(ch: char) -> Vec<u8> {
    let mut glyph = vec![0u8; BASE_WIDTH * BASE_HEIGHT];
    let mut spleen = PSF2Font::new(FONT_12X24).unwrap();
    let utf8 = ch.to_string();

    if let Some(rows) = spleen.glyph_for_utf8(utf8.as_bytes()) {
        for (row_y, row) in rows.enumerate() {
            for (col_x, on) in row.enumerate() {
                let idx = row_y * BASE_WIDTH + col_x;
                if idx < glyph.len() {
                    glyph[idx] = if on { 1 } else { 0 };
                }
            }
        }
    } else {
        draw_box(&mut glyph, BASE_WIDTH, BASE_HEIGHT);
    }
    glyph
}

/// Scale a bitmap from src dimensions to dst dimensions using nearest
/// neighbor.
fn scale_bitmap(src: &[u8], src_w: usize, src_h: usize, dst: &mut [u8], dst_w: usize, dst_h: usize) {
    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let sx = dx * src_w / dst_w;
            let sy = dy * src_h / dst_h;
            dst[dy * dst_w + dx] = src[sy * src_w + sx];
        }
    }
}

/// Draw a box outline, the fallback for unknown characters.
fn draw_box(glyph: &mut [u8], width: usize, height: usize) {
    for x in 0..width {
        glyph[x] = 1;
        glyph[(height - 1) * width + x] = 1;
    }
    for y in 0..height {
        glyph[y * width] = 1;
        glyph[y * width + width - 1] = 1;
    }
}

/// Rasterize a single-line string into a mask at the given font size.
///
/// `bold` smears each glyph one pixel to the right, thickening vertical
/// strokes the way the original printed labels.
pub fn line_bitmap(text: &str, font_size: f32, bold: bool) -> TextRun {
    let height = px_height(font_size);
    let char_w = char_width_for(height);
    let count = text.chars().count();
    let width = (char_w * count).max(1);
    let mut mask = vec![0u8; width * height];

    for (i, ch) in text.chars().enumerate() {
        let base = base_glyph(ch);
        let mut scaled = vec![0u8; char_w * height];
        scale_bitmap(&base, BASE_WIDTH, BASE_HEIGHT, &mut scaled, char_w, height);

        let origin_x = i * char_w;
        for gy in 0..height {
            for gx in 0..char_w {
                if scaled[gy * char_w + gx] == 0 {
                    continue;
                }
                let idx = gy * width + origin_x + gx;
                mask[idx] = 1;
                if bold && origin_x + gx + 1 < width {
                    mask[idx + 1] = 1;
                }
            }
        }
    }

    TextRun {
        mask,
        width,
        height,
    }
}

/// Draw a single-line string with its top-left corner at `(x, y)` in the
/// canvas's current user space. Text is not wrapped or clipped to any box.
pub fn draw_text(
    canvas: &mut Canvas,
    text: &str,
    x: f32,
    y: f32,
    font_size: f32,
    bold: bool,
    color: Rgba<u8>,
) {
    if text.is_empty() {
        return;
    }
    let run = line_bitmap(text, font_size, bold);
    canvas.blit_mask(&run.mask, run.width, run.height, x, y, color);
}

// ============================================================================
// TESTS
// ============================================================================
