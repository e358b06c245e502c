//! Source-over alpha compositing.
//!
//! # Responsibility
//! - Composite one RGBA8 color over another with 16-bit intermediate precision.
//! - Provide the single write primitive (`blend_at`) used by every drawing
//!   routine in the crate.
//!
//! # Invariants
//! - Channel values are alpha-weighted on the way in and the composite is
//!   written back as-is. For opaque destinations (the common case for map
//!   backgrounds) this is exact non-premultiplied source-over.
//! - Out-of-bounds writes are ignored, never clamped onto the edge.

use image::{Rgba, RgbaImage};

const MAX16: u32 = 0xffff;

/// Composites `top` over `bottom`.
///
/// `out_c = top_c * top_a + bottom_c * bottom_a * (1 - top_a)` and
/// `out_a = top_a + bottom_a * (1 - top_a)`, computed on 16-bit scaled values
/// and truncated back to 8 bits.
pub fn blend(top: Rgba<u8>, bottom: Rgba<u8>) -> Rgba<u8> {
    let top_a = widen(top[3]);
    if top_a == MAX16 {
        return top;
    }
    if top_a == 0 {
        return bottom;
    }

    let bottom_a = widen(bottom[3]);
    let remaining = MAX16 - top_a;

    let mut out = [0u8; 4];
    for channel in 0..3 {
        let top_c = widen(top[channel]) * top_a / MAX16;
        let bottom_c = widen(bottom[channel]) * bottom_a / MAX16;
        out[channel] = narrow(top_c + bottom_c * remaining / MAX16);
    }
    out[3] = narrow(top_a + bottom_a * remaining / MAX16);
    Rgba(out)
}

/// Reads the pixel at `(x, y)`, blends `color` over it and writes it back.
///
/// Coordinates outside the image are silently skipped.
pub fn blend_at(image: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x < 0 || y < 0 || x >= i64::from(image.width()) || y >= i64::from(image.height()) {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    let bottom = *image.get_pixel(x, y);
    image.put_pixel(x, y, blend(color, bottom));
}

/// Scales the alpha of `color` by an 8-bit coverage value.
pub fn with_coverage(color: Rgba<u8>, coverage: u8) -> Rgba<u8> {
    let alpha = u16::from(color[3]) * u16::from(coverage) / 255;
    Rgba([color[0], color[1], color[2], alpha as u8])
}

fn widen(value: u8) -> u32 {
    u32::from(value) * 0x101
}

fn narrow(value: u32) -> u8 {
    (value.min(MAX16) >> 8) as u8
}

#[cfg(test)]
mod tests {
    use super::{blend, blend_at, with_coverage};
    use image::{Rgba, RgbaImage};

    fn assert_close(actual: Rgba<u8>, expected: [u8; 4]) {
        for channel in 0..4 {
            let diff = i16::from(actual[channel]) - i16::from(expected[channel]);
            assert!(
                diff.abs() <= 1,
                "channel {channel}: got {:?}, expected {:?}",
                actual,
                expected
            );
        }
    }

    #[test]
    fn half_red_over_half_green() {
        let out = blend(Rgba([255, 0, 0, 128]), Rgba([0, 255, 0, 128]));
        assert_close(out, [128, 63, 0, 192]);
    }

    #[test]
    fn opaque_top_replaces_bottom() {
        let top = Rgba([10, 20, 30, 255]);
        assert_eq!(blend(top, Rgba([200, 200, 200, 255])), top);
    }

    #[test]
    fn transparent_top_keeps_bottom() {
        let bottom = Rgba([1, 2, 3, 4]);
        assert_eq!(blend(Rgba([255, 255, 255, 0]), bottom), bottom);
    }

    #[test]
    fn translucent_black_over_white_is_grey() {
        let out = blend(Rgba([0, 0, 0, 128]), Rgba([255, 255, 255, 255]));
        assert_close(out, [127, 127, 127, 255]);
    }

    #[test]
    fn coverage_on_transparent_canvas_becomes_alpha() {
        let mut image = RgbaImage::new(1, 1);
        blend_at(&mut image, 0, 0, with_coverage(Rgba([255, 255, 255, 255]), 51));
        assert_close(*image.get_pixel(0, 0), [51, 51, 51, 51]);
    }

    #[test]
    fn blend_at_ignores_out_of_bounds() {
        let mut image = RgbaImage::new(2, 2);
        blend_at(&mut image, -1, 0, Rgba([255, 0, 0, 255]));
        blend_at(&mut image, 0, 2, Rgba([255, 0, 0, 255]));
        assert!(image.pixels().all(|pixel| pixel[3] == 0));
    }
}
