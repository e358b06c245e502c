//! Pixel-level drawing primitives.
//!
//! # Responsibility
//! - Alpha compositing (`blend`), anti-aliased lines (`line`), rectangle and
//!   image helpers (`surface`) and a bitmap font (`text`).
//!
//! # Invariants
//! - Every pixel mutation goes through `blend::blend_at`, except whole-pixel
//!   copies (`crop_padded`, `restore_rect`).
//! - Drawing never panics on coordinates outside the surface.

pub mod blend;
pub mod line;
pub mod surface;
pub mod text;

pub use blend::{blend, blend_at, with_coverage};
pub use line::{draw_line, PixelPoint};
pub use surface::PixelRect;
