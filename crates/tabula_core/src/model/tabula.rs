//! Tabula (battle map) domain model.
//!
//! # Responsibility
//! - Define the map record: background, grid geometry, masks, tokens, marks.
//! - Provide the only mutation helpers for overlays, so keyed uniqueness holds.
//!
//! # Invariants
//! - `dpi` must be non-zero and finite before the map can be rendered.
//! - Mask names are unique per tabula; compositing order is ascending `order`
//!   with ties broken by name.
//! - Tokens are unique per `(context, name)`; placing again replaces.
//! - Marks are unique per `(context, point)`.
//! - Mutations are in-memory only; callers persist explicitly.

use super::color::Color;
use super::user::UserId;
use crate::raster::PixelRect;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type TabulaId = Uuid;

/// Grid cell coordinate (column, row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

impl GridPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Named rectangular overlay that occludes, tints or (when `clear`) discloses.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    pub name: String,
    pub order: u32,
    pub color: Color,
    pub rect: PixelRect,
    pub clear: bool,
}

/// Per-context marker placed on the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub point: GridPoint,
    pub color: Color,
    /// Edge length in grid cells.
    pub size: u32,
    /// Glyph reference handed to the glyph resolver (emoji or custom image).
    pub glyph: Option<String>,
    /// Free text drawn under the glyph.
    pub label: Option<String>,
}

impl Token {
    pub fn new(point: GridPoint, color: Color) -> Self {
        Self {
            point,
            color,
            size: 1,
            glyph: None,
            label: None,
        }
    }
}

/// Key of a token inside a tabula.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenKey {
    pub context: String,
    pub name: String,
}

impl TokenKey {
    pub fn new(context: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            name: name.into(),
        }
    }
}

/// Validation errors for tabula invariants.
#[derive(Debug, Clone, PartialEq)]
pub enum TabulaValidationError {
    EmptyName,
    EmptyBackground,
    InvalidDpi(f64),
    EmptyMaskName,
    EmptyTokenName,
    InvalidTokenSize { name: String, size: u32 },
}

impl Display for TabulaValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "tabula name cannot be empty"),
            Self::EmptyBackground => write!(f, "tabula background image is empty"),
            Self::InvalidDpi(dpi) => write!(f, "dpi must be finite and not negative, got {dpi}"),
            Self::EmptyMaskName => write!(f, "mask name cannot be empty"),
            Self::EmptyTokenName => write!(f, "token name cannot be empty"),
            Self::InvalidTokenSize { name, size } => {
                write!(f, "token `{name}` has invalid size {size}; expected >= 1")
            }
        }
    }
}

impl Error for TabulaValidationError {}

/// A battle map and everything drawn on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Tabula {
    pub id: TabulaId,
    pub owner: UserId,
    pub name: String,
    /// Encoded background image (PNG).
    pub background: Vec<u8>,
    pub offset_x: i32,
    pub offset_y: i32,
    /// Grid cell edge length in pixels. Zero means "not aligned yet".
    pub dpi: f64,
    pub grid_color: Option<Color>,
    masks: Vec<Mask>,
    tokens: BTreeMap<TokenKey, Token>,
    marks: BTreeMap<String, BTreeMap<GridPoint, Color>>,
}

impl Tabula {
    /// Creates an unaligned tabula with a generated id.
    pub fn new(owner: UserId, name: impl Into<String>, background: Vec<u8>) -> Self {
        Self::with_id(Uuid::new_v4(), owner, name, background)
    }

    /// Creates an unaligned tabula with a caller-provided id (load paths).
    pub fn with_id(
        id: TabulaId,
        owner: UserId,
        name: impl Into<String>,
        background: Vec<u8>,
    ) -> Self {
        Self {
            id,
            owner,
            name: name.into(),
            background,
            offset_x: 0,
            offset_y: 0,
            dpi: 0.0,
            grid_color: None,
            masks: Vec::new(),
            tokens: BTreeMap::new(),
            marks: BTreeMap::new(),
        }
    }

    /// Checks structural invariants before persistence.
    pub fn validate(&self) -> Result<(), TabulaValidationError> {
        if self.name.trim().is_empty() {
            return Err(TabulaValidationError::EmptyName);
        }
        if self.background.is_empty() {
            return Err(TabulaValidationError::EmptyBackground);
        }
        if !self.dpi.is_finite() || self.dpi < 0.0 {
            return Err(TabulaValidationError::InvalidDpi(self.dpi));
        }
        if self.masks.iter().any(|mask| mask.name.trim().is_empty()) {
            return Err(TabulaValidationError::EmptyMaskName);
        }
        for (key, token) in &self.tokens {
            if key.name.trim().is_empty() {
                return Err(TabulaValidationError::EmptyTokenName);
            }
            if token.size == 0 {
                return Err(TabulaValidationError::InvalidTokenSize {
                    name: key.name.clone(),
                    size: token.size,
                });
            }
        }
        Ok(())
    }

    pub fn is_aligned(&self) -> bool {
        self.dpi.is_finite() && self.dpi > 0.0
    }

    /// Effective grid line color (opaque black unless configured).
    pub fn grid_color(&self) -> Color {
        self.grid_color.unwrap_or(Color::BLACK)
    }

    /// Pixel rectangle covered by a `size`-cell square anchored at `point`.
    pub fn cell_rect(&self, point: GridPoint, size: u32) -> PixelRect {
        let left = self.column_x(f64::from(point.x));
        let top = self.row_y(f64::from(point.y));
        let right = self.column_x(f64::from(point.x) + f64::from(size));
        let bottom = self.row_y(f64::from(point.y) + f64::from(size));
        PixelRect::new(
            left,
            top,
            (right - left).max(0) as u32,
            (bottom - top).max(0) as u32,
        )
    }

    /// Pixel x of grid column `column` (may be fractional).
    pub fn column_x(&self, column: f64) -> i64 {
        (f64::from(self.offset_x) + column * self.dpi).round() as i64
    }

    /// Pixel y of grid row `row` (may be fractional).
    pub fn row_y(&self, row: f64) -> i64 {
        (f64::from(self.offset_y) + row * self.dpi).round() as i64
    }

    /// Masks as stored (insertion order).
    pub fn masks(&self) -> &[Mask] {
        &self.masks
    }

    /// Masks in compositing order: ascending `order`, ties by name.
    pub fn masks_in_order(&self) -> Vec<&Mask> {
        let mut ordered: Vec<&Mask> = self.masks.iter().collect();
        ordered.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        ordered
    }

    /// Order value that places a new mask above every existing one.
    pub fn next_mask_order(&self) -> u32 {
        self.masks
            .iter()
            .map(|mask| mask.order.saturating_add(1))
            .max()
            .unwrap_or(0)
    }

    /// Inserts or replaces a mask by name. Returns the replaced mask.
    pub fn set_mask(&mut self, mask: Mask) -> Option<Mask> {
        match self.masks.iter_mut().find(|m| m.name == mask.name) {
            Some(existing) => Some(std::mem::replace(existing, mask)),
            None => {
                self.masks.push(mask);
                None
            }
        }
    }

    pub fn remove_mask(&mut self, name: &str) -> Option<Mask> {
        let index = self.masks.iter().position(|mask| mask.name == name)?;
        Some(self.masks.remove(index))
    }

    /// Places a token, replacing any token with the same `(context, name)`.
    pub fn place_token(
        &mut self,
        context: impl Into<String>,
        name: impl Into<String>,
        token: Token,
    ) -> Option<Token> {
        self.tokens.insert(TokenKey::new(context, name), token)
    }

    pub fn remove_token(&mut self, context: &str, name: &str) -> Option<Token> {
        self.tokens.remove(&TokenKey::new(context, name))
    }

    pub fn token(&self, context: &str, name: &str) -> Option<&Token> {
        self.tokens.get(&TokenKey::new(context, name))
    }

    /// All tokens across contexts, ordered by key.
    pub fn tokens(&self) -> impl Iterator<Item = (&TokenKey, &Token)> {
        self.tokens.iter()
    }

    /// Tokens visible in `context`, ordered by name.
    pub fn tokens_in<'a>(
        &'a self,
        context: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a Token)> {
        self.tokens
            .iter()
            .filter(move |(key, _)| key.context == context)
            .map(|(key, token)| (key.name.as_str(), token))
    }

    /// Colors a single square in `context`, replacing any previous mark there.
    pub fn set_mark(&mut self, context: impl Into<String>, point: GridPoint, color: Color) {
        self.marks
            .entry(context.into())
            .or_default()
            .insert(point, color);
    }

    /// Removes all marks of `context`. Returns how many were removed.
    pub fn clear_marks(&mut self, context: &str) -> usize {
        self.marks.remove(context).map_or(0, |marks| marks.len())
    }

    /// Marks of `context`, ordered by point.
    pub fn marks_in(&self, context: &str) -> impl Iterator<Item = (&GridPoint, &Color)> {
        self.marks.get(context).into_iter().flat_map(|marks| marks.iter())
    }

    /// All marks across contexts.
    pub fn marks(&self) -> impl Iterator<Item = (&str, &GridPoint, &Color)> {
        self.marks.iter().flat_map(|(context, marks)| {
            marks
                .iter()
                .map(move |(point, color)| (context.as_str(), point, color))
        })
    }
}
