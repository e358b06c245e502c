//! Map rendering.
//!
//! # Responsibility
//! - Composite tabulas into rasters (`compositor`).
//! - Resolve token glyphs through an injected capability (`glyph`).
//! - Fingerprint render inputs for external caches (`fingerprint`).
//!
//! # Invariants
//! - Rendering owns no networking and no global caches.

pub mod compositor;
pub mod fingerprint;
pub mod glyph;

pub use compositor::{
    background_dimensions, encode_png, Compositor, RenderError, RenderOptions,
};
pub use fingerprint::render_fingerprint;
pub use glyph::{DirectoryGlyphResolver, GlyphError, GlyphResolver, NoGlyphs};
