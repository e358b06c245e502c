//! Tabula use-case service.
//!
//! # Responsibility
//! - Import backgrounds, edit grid geometry and overlays, and render maps.
//! - Address maps by `(owner, name)` the way users refer to them.
//!
//! # Invariants
//! - Imports reject backgrounds that do not decode.
//! - Every mutation is load, apply, save; a failed apply saves nothing.

use crate::model::color::Color;
use crate::model::tabula::{GridPoint, Mask, Tabula, Token};
use crate::model::user::UserId;
use crate::raster::PixelRect;
use crate::render::compositor::MIN_RENDER_DPI;
use crate::render::{encode_png, render_fingerprint, Compositor, RenderError};
use crate::repo::tabula_repo::{TabulaRepository, TabulaSummary};
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for tabula use-cases.
#[derive(Debug)]
pub enum TabulaServiceError {
    /// Caller input rejected before any write.
    InvalidInput(String),
    TabulaNotFound(String),
    MaskNotFound(String),
    TokenNotFound { context: String, name: String },
    Repo(RepoError),
    Render(RenderError),
}

impl Display for TabulaServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "{message}"),
            Self::TabulaNotFound(name) => write!(f, "no map named `{name}`"),
            Self::MaskNotFound(name) => write!(f, "no mask named `{name}`"),
            Self::TokenNotFound { context, name } => {
                write!(f, "no token `{name}` in context `{context}`")
            }
            Self::Repo(err) => write!(f, "{err}"),
            Self::Render(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TabulaServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Render(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for TabulaServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::InvalidInput(err.to_string()),
            other => Self::Repo(other),
        }
    }
}

impl From<RenderError> for TabulaServiceError {
    fn from(value: RenderError) -> Self {
        Self::Render(value)
    }
}

/// Mask definition supplied by callers.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskSpec {
    pub name: String,
    pub color: Color,
    pub rect: PixelRect,
    pub clear: bool,
    /// Compositing order; `None` stacks the mask above every existing one.
    pub order: Option<u32>,
}

/// Tabula service facade over a repository implementation.
pub struct TabulaService<R: TabulaRepository> {
    repo: R,
}

impl<R: TabulaRepository> TabulaService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Stores a new map for `owner` from encoded image bytes.
    pub fn import_tabula(
        &self,
        owner: UserId,
        name: &str,
        background: Vec<u8>,
    ) -> Result<Tabula, TabulaServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TabulaServiceError::InvalidInput(
                "map name cannot be empty".to_string(),
            ));
        }
        let decoded = image::load_from_memory(&background).map_err(RenderError::Background)?;
        let (width, height) = (decoded.width(), decoded.height());

        let tabula = Tabula::new(owner, name, background);
        self.repo.create_tabula(&tabula)?;
        info!(
            "event=tabula_import module=service status=ok tabula={} width={width} height={height}",
            tabula.id
        );
        self.get_tabula(owner, name)
    }

    pub fn get_tabula(&self, owner: UserId, name: &str) -> Result<Tabula, TabulaServiceError> {
        self.repo
            .find_tabula(owner, name)?
            .ok_or_else(|| TabulaServiceError::TabulaNotFound(name.trim().to_string()))
    }

    pub fn list_tabulas(&self, owner: UserId) -> Result<Vec<TabulaSummary>, TabulaServiceError> {
        Ok(self.repo.list_tabulas(owner)?)
    }

    pub fn delete_tabula(&self, owner: UserId, name: &str) -> Result<(), TabulaServiceError> {
        let tabula = self.get_tabula(owner, name)?;
        Ok(self.repo.delete_tabula(tabula.id)?)
    }

    /// Sets grid size and offsets directly. A `dpi` of 0 marks the map unaligned.
    pub fn set_grid(
        &self,
        owner: UserId,
        name: &str,
        dpi: f64,
        offset_x: i32,
        offset_y: i32,
    ) -> Result<Tabula, TabulaServiceError> {
        if !dpi.is_finite() || dpi < 0.0 || (dpi > 0.0 && dpi < MIN_RENDER_DPI) {
            return Err(TabulaServiceError::InvalidInput(format!(
                "grid size must be 0 or at least {MIN_RENDER_DPI} px, got {dpi}"
            )));
        }
        self.update(owner, name, |tabula| {
            tabula.dpi = dpi;
            tabula.offset_x = offset_x;
            tabula.offset_y = offset_y;
            Ok(tabula.clone())
        })
    }

    /// Sets the grid line color; `None` restores the default.
    pub fn set_grid_color(
        &self,
        owner: UserId,
        name: &str,
        color: Option<Color>,
    ) -> Result<(), TabulaServiceError> {
        self.update(owner, name, |tabula| {
            tabula.grid_color = color;
            Ok(())
        })
    }

    /// Adds or replaces a mask by name and returns the stored mask.
    pub fn add_mask(
        &self,
        owner: UserId,
        name: &str,
        spec: MaskSpec,
    ) -> Result<Mask, TabulaServiceError> {
        let mask_name = spec.name.trim().to_string();
        if mask_name.is_empty() {
            return Err(TabulaServiceError::InvalidInput(
                "mask name cannot be empty".to_string(),
            ));
        }
        if spec.rect.is_empty() {
            return Err(TabulaServiceError::InvalidInput(format!(
                "mask `{mask_name}` covers no pixels"
            )));
        }
        self.update(owner, name, |tabula| {
            let mask = Mask {
                order: spec.order.unwrap_or_else(|| tabula.next_mask_order()),
                name: mask_name,
                color: spec.color,
                rect: spec.rect,
                clear: spec.clear,
            };
            tabula.set_mask(mask.clone());
            Ok(mask)
        })
    }

    pub fn remove_mask(
        &self,
        owner: UserId,
        name: &str,
        mask_name: &str,
    ) -> Result<Mask, TabulaServiceError> {
        self.update(owner, name, |tabula| {
            tabula
                .remove_mask(mask_name.trim())
                .ok_or_else(|| TabulaServiceError::MaskNotFound(mask_name.trim().to_string()))
        })
    }

    /// Places a token, replacing any token with the same context and name.
    /// Returns the replaced token.
    pub fn place_token(
        &self,
        owner: UserId,
        name: &str,
        context: &str,
        token_name: &str,
        token: Token,
    ) -> Result<Option<Token>, TabulaServiceError> {
        let token_name = token_name.trim();
        if token_name.is_empty() {
            return Err(TabulaServiceError::InvalidInput(
                "token name cannot be empty".to_string(),
            ));
        }
        if token.size == 0 {
            return Err(TabulaServiceError::InvalidInput(format!(
                "token `{token_name}` must cover at least one square"
            )));
        }
        self.update(owner, name, |tabula| {
            Ok(tabula.place_token(context, token_name, token))
        })
    }

    pub fn remove_token(
        &self,
        owner: UserId,
        name: &str,
        context: &str,
        token_name: &str,
    ) -> Result<Token, TabulaServiceError> {
        self.update(owner, name, |tabula| {
            tabula.remove_token(context, token_name.trim()).ok_or_else(|| {
                TabulaServiceError::TokenNotFound {
                    context: context.to_string(),
                    name: token_name.trim().to_string(),
                }
            })
        })
    }

    pub fn set_mark(
        &self,
        owner: UserId,
        name: &str,
        context: &str,
        point: GridPoint,
        color: Color,
    ) -> Result<(), TabulaServiceError> {
        self.update(owner, name, |tabula| {
            tabula.set_mark(context, point, color);
            Ok(())
        })
    }

    /// Removes every mark of `context`; returns how many were removed.
    pub fn clear_marks(
        &self,
        owner: UserId,
        name: &str,
        context: &str,
    ) -> Result<usize, TabulaServiceError> {
        self.update(owner, name, |tabula| Ok(tabula.clear_marks(context)))
    }

    /// Renders a map (or a crop of it) to PNG bytes.
    pub fn render_png(
        &self,
        compositor: &Compositor<'_>,
        owner: UserId,
        name: &str,
        context: &str,
        crop: Option<PixelRect>,
    ) -> Result<Vec<u8>, TabulaServiceError> {
        let tabula = self.get_tabula(owner, name)?;
        let image = compositor.render(&tabula, context, crop)?;
        Ok(encode_png(&image)?)
    }

    /// Cache key for [`Self::render_png`] with the same arguments.
    pub fn render_fingerprint(
        &self,
        owner: UserId,
        name: &str,
        context: &str,
        crop: Option<PixelRect>,
    ) -> Result<String, TabulaServiceError> {
        let tabula = self.get_tabula(owner, name)?;
        Ok(render_fingerprint(&tabula, context, crop))
    }

    fn update<T>(
        &self,
        owner: UserId,
        name: &str,
        apply: impl FnOnce(&mut Tabula) -> Result<T, TabulaServiceError>,
    ) -> Result<T, TabulaServiceError> {
        let mut tabula = self.get_tabula(owner, name)?;
        let output = apply(&mut tabula)?;
        self.repo.save_tabula(&tabula)?;
        Ok(output)
    }
}
