//! Glyph resolution capability for token images.
//!
//! # Responsibility
//! - Define the injected lookup the compositor uses for token glyphs.
//! - Provide a directory-backed resolver for local deployments and tests.
//!
//! # Invariants
//! - `NotFound` means "no such glyph" and is never retried.
//! - `Fetch` means a transient failure; callers fall back and log.

use image::RgbaImage;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::ErrorKind;
use std::path::PathBuf;

static GLYPH_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-]{1,64}$").expect("valid glyph name regex"));

/// Glyph lookup failures.
#[derive(Debug)]
pub enum GlyphError {
    /// The glyph does not exist.
    NotFound(String),
    /// The glyph may exist but could not be fetched or decoded right now.
    Fetch { name: String, message: String },
}

impl Display for GlyphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "glyph not found: {name}"),
            Self::Fetch { name, message } => write!(f, "failed to fetch glyph `{name}`: {message}"),
        }
    }
}

impl Error for GlyphError {}

/// Resolves a glyph reference (emoji name, custom image id) to pixels.
pub trait GlyphResolver {
    fn resolve(&self, name: &str) -> Result<RgbaImage, GlyphError>;
}

/// Resolver that knows no glyphs; every token renders as its name.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGlyphs;

impl GlyphResolver for NoGlyphs {
    fn resolve(&self, name: &str) -> Result<RgbaImage, GlyphError> {
        Err(GlyphError::NotFound(name.to_string()))
    }
}

/// Resolves `<dir>/<name>.png`.
#[derive(Debug, Clone)]
pub struct DirectoryGlyphResolver {
    dir: PathBuf,
}

impl DirectoryGlyphResolver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl GlyphResolver for DirectoryGlyphResolver {
    fn resolve(&self, name: &str) -> Result<RgbaImage, GlyphError> {
        let trimmed = name.trim().trim_matches(':');
        if !GLYPH_NAME_RE.is_match(trimmed) {
            return Err(GlyphError::NotFound(name.to_string()));
        }

        let path = self.dir.join(format!("{trimmed}.png"));
        let bytes = std::fs::read(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => GlyphError::NotFound(name.to_string()),
            _ => GlyphError::Fetch {
                name: name.to_string(),
                message: err.to_string(),
            },
        })?;

        image::load_from_memory(&bytes)
            .map(|decoded| decoded.to_rgba8())
            .map_err(|err| GlyphError::Fetch {
                name: name.to_string(),
                message: err.to_string(),
            })
    }
}
