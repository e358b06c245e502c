//! Built-in 5x7 bitmap font for token names and labels.
//!
//! Lowercase letters render as uppercase; characters without a glyph render
//! as `?`.

use super::blend::blend_at;
use super::surface::PixelRect;
use image::{Rgba, RgbaImage};

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const GLYPH_SPACING: u32 = 1;

fn glyph_rows(ch: char) -> [u8; 7] {
    match ch.to_ascii_uppercase() {
        ' ' => [0x00; 7],
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '_' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1F],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '!' => [0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04],
        '#' => [0x0A, 0x0A, 0x1F, 0x0A, 0x1F, 0x0A, 0x0A],
        '\'' => [0x0C, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00],
        _ => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
    }
}

/// Unscaled pixel size of `text` when drawn at scale 1.
pub fn text_size(text: &str) -> (u32, u32) {
    let count = text.chars().count() as u32;
    if count == 0 {
        return (0, 0);
    }
    (
        count * GLYPH_WIDTH + (count - 1) * GLYPH_SPACING,
        GLYPH_HEIGHT,
    )
}

/// Largest integer scale at which `text` fits in `bounds`, or `None`.
pub fn fit_scale(text: &str, bounds: PixelRect) -> Option<u32> {
    let (width, height) = text_size(text);
    if width == 0 {
        return None;
    }
    let scale = (bounds.width / width).min(bounds.height / height);
    (scale > 0).then_some(scale)
}

/// Draws `text` with its top-left corner at `(left, top)`.
pub fn draw_text(
    image: &mut RgbaImage,
    left: i64,
    top: i64,
    text: &str,
    scale: u32,
    color: Rgba<u8>,
) {
    let scale = i64::from(scale.max(1));
    let advance = i64::from(GLYPH_WIDTH + GLYPH_SPACING) * scale;

    for (index, ch) in text.chars().enumerate() {
        let origin_x = left + index as i64 * advance;
        for (row, bits) in glyph_rows(ch).iter().enumerate() {
            for column in 0..GLYPH_WIDTH {
                if bits & (0x10 >> column) == 0 {
                    continue;
                }
                let px = origin_x + i64::from(column) * scale;
                let py = top + row as i64 * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        blend_at(image, px + dx, py + dy, color);
                    }
                }
            }
        }
    }
}

/// Number of glyphs that fit in `width` pixels at scale 1.
fn glyphs_in_width(width: u32) -> usize {
    ((width + GLYPH_SPACING) / (GLYPH_WIDTH + GLYPH_SPACING)) as usize
}

/// Shortens `text` to fit `width` pixels at scale 1, ending with `.` when
/// there is room for it. Returns `None` when not even one glyph fits.
pub fn truncate_to_width(text: &str, width: u32) -> Option<String> {
    let room = glyphs_in_width(width);
    if room == 0 || text.is_empty() {
        return None;
    }
    let count = text.chars().count();
    if count <= room {
        return Some(text.to_string());
    }
    if room == 1 {
        return text.chars().next().map(String::from);
    }
    let mut shortened: String = text.chars().take(room - 1).collect();
    shortened.push('.');
    Some(shortened)
}

/// Draws `text` centered in `bounds` at the largest scale that fits.
///
/// Text too wide for scale 1 is truncated. Returns `false` when nothing
/// could be drawn.
pub fn draw_text_centered(
    image: &mut RgbaImage,
    bounds: PixelRect,
    text: &str,
    color: Rgba<u8>,
) -> bool {
    let (text, scale) = match fit_scale(text, bounds) {
        Some(scale) => (text.to_string(), scale),
        None => {
            if bounds.height < GLYPH_HEIGHT {
                return false;
            }
            match truncate_to_width(text, bounds.width) {
                Some(shortened) => (shortened, 1),
                None => return false,
            }
        }
    };
    let (width, height) = text_size(&text);
    let left = bounds.left + i64::from((bounds.width - width * scale) / 2);
    let top = bounds.top + i64::from((bounds.height - height * scale) / 2);
    draw_text(image, left, top, &text, scale, color);
    true
}
