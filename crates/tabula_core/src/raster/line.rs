//! Anti-aliased line drawing (Wu's algorithm).
//!
//! # Invariants
//! - Both endpoints are always plotted at full coverage.
//! - Axis-aligned lines are never anti-aliased.
//! - In the general case every intermediate step plots a pixel pair along the
//!   minor axis whose coverages sum to exactly 255.

use super::blend::{blend_at, with_coverage};
use image::{Rgba, RgbaImage};

/// Coverage of the perpendicular neighbours of an exact 45 degree diagonal.
pub const DIAGONAL_NEIGHBOUR_COVERAGE: u8 = 51;

/// Integer pixel position on a drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelPoint {
    pub x: i64,
    pub y: i64,
}

impl PixelPoint {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Draws an anti-aliased line from `from` to `to` (inclusive).
pub fn draw_line(image: &mut RgbaImage, from: PixelPoint, to: PixelPoint, color: Rgba<u8>) {
    let mut plot = |x: i64, y: i64, coverage: u8| {
        blend_at(image, x, y, with_coverage(color, coverage));
    };

    // Always walk downwards so only the x direction varies.
    let (start, end) = if from.y > to.y { (to, from) } else { (from, to) };
    let (mut x, mut y) = (start.x, start.y);

    plot(x, y, 255);
    if start == end {
        return;
    }

    let x_dir = if end.x >= start.x { 1 } else { -1 };
    let dx = (end.x - start.x).abs();
    let dy = end.y - start.y;

    if dy == 0 {
        for _ in 0..dx {
            x += x_dir;
            plot(x, y, 255);
        }
        return;
    }

    if dx == 0 {
        for _ in 0..dy {
            y += 1;
            plot(x, y, 255);
        }
        return;
    }

    if dx == dy {
        for _ in 0..dx {
            x += x_dir;
            y += 1;
            plot(x, y, 255);
            plot(x - x_dir, y, DIAGONAL_NEIGHBOUR_COVERAGE);
            plot(x, y - 1, DIAGONAL_NEIGHBOUR_COVERAGE);
        }
        return;
    }

    let mut error: u8 = 0;
    if dy > dx {
        let error_adjust = ((dx << 8) / dy) as u8;
        for _ in 1..dy {
            let (next, wrapped) = error.overflowing_add(error_adjust);
            error = next;
            if wrapped {
                x += x_dir;
            }
            y += 1;
            plot(x, y, 255 - error);
            plot(x + x_dir, y, error);
        }
    } else {
        let error_adjust = ((dy << 8) / dx) as u8;
        for _ in 1..dx {
            let (next, wrapped) = error.overflowing_add(error_adjust);
            error = next;
            if wrapped {
                y += 1;
            }
            x += x_dir;
            plot(x, y, 255 - error);
            plot(x, y + 1, error);
        }
    }

    plot(end.x, end.y, 255);
}
