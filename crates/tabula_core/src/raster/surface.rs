//! Rectangle-level drawing helpers built on `blend_at`.

use super::blend::blend_at;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

/// Axis-aligned pixel rectangle. The origin may be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub left: i64,
    pub top: i64,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(left: i64, top: i64, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> i64 {
        self.left + i64::from(self.width)
    }

    pub fn bottom(&self) -> i64 {
        self.top + i64::from(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Shrinks the rectangle by `margin` on every side, saturating at zero size.
    pub fn inset(&self, margin: u32) -> Self {
        Self {
            left: self.left + i64::from(margin),
            top: self.top + i64::from(margin),
            width: self.width.saturating_sub(margin * 2),
            height: self.height.saturating_sub(margin * 2),
        }
    }

    /// Moves the rectangle into a frame whose origin is `origin`.
    pub fn relative_to(&self, origin: &PixelRect) -> Self {
        Self {
            left: self.left - origin.left,
            top: self.top - origin.top,
            ..*self
        }
    }
}

/// Copies `frame` out of `source`. Parts of the frame outside the source
/// (including negative origins) become transparent padding.
pub fn crop_padded(source: &RgbaImage, frame: PixelRect) -> RgbaImage {
    let mut out = RgbaImage::new(frame.width, frame.height);
    let x_start = frame.left.max(0);
    let y_start = frame.top.max(0);
    let x_end = frame.right().min(i64::from(source.width()));
    let y_end = frame.bottom().min(i64::from(source.height()));

    for y in y_start..y_end {
        for x in x_start..x_end {
            let pixel = *source.get_pixel(x as u32, y as u32);
            out.put_pixel((x - frame.left) as u32, (y - frame.top) as u32, pixel);
        }
    }
    out
}

/// Blends a flat color over every pixel of `rect`.
pub fn fill_rect(image: &mut RgbaImage, rect: PixelRect, color: Rgba<u8>) {
    for y in rect.top..rect.bottom() {
        for x in rect.left..rect.right() {
            blend_at(image, x, y, color);
        }
    }
}

/// Replaces the pixels of `rect` with the same pixels from `source`.
///
/// Both images must share a coordinate frame; pixels outside either image
/// are skipped.
pub fn restore_rect(image: &mut RgbaImage, source: &RgbaImage, rect: PixelRect) {
    let x_start = rect.left.max(0);
    let y_start = rect.top.max(0);
    let x_end = rect
        .right()
        .min(i64::from(image.width().min(source.width())));
    let y_end = rect
        .bottom()
        .min(i64::from(image.height().min(source.height())));

    for y in y_start..y_end {
        for x in x_start..x_end {
            let (x, y) = (x as u32, y as u32);
            image.put_pixel(x, y, *source.get_pixel(x, y));
        }
    }
}

/// Blends `overlay` onto `image` with its top-left corner at `(left, top)`.
pub fn overlay_at(image: &mut RgbaImage, overlay: &RgbaImage, left: i64, top: i64) {
    for (x, y, pixel) in overlay.enumerate_pixels() {
        blend_at(image, left + i64::from(x), top + i64::from(y), *pixel);
    }
}

/// Resizes `source` (bilinear) to fit inside `bounds` keeping its aspect ratio, and
/// returns it together with the rectangle it should be drawn at (centered).
pub fn fit_into(source: &RgbaImage, bounds: PixelRect) -> Option<(RgbaImage, PixelRect)> {
    if bounds.is_empty() || source.width() == 0 || source.height() == 0 {
        return None;
    }
    let scale = f64::min(
        f64::from(bounds.width) / f64::from(source.width()),
        f64::from(bounds.height) / f64::from(source.height()),
    );
    let width = ((f64::from(source.width()) * scale).round() as u32).max(1);
    let height = ((f64::from(source.height()) * scale).round() as u32).max(1);
    let resized = imageops::resize(source, width, height, FilterType::Triangle);
    let placed = PixelRect::new(
        bounds.left + i64::from((bounds.width - width) / 2),
        bounds.top + i64::from((bounds.height - height) / 2),
        width,
        height,
    );
    Some((resized, placed))
}
