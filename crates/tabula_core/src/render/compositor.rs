//! Layered map compositor.
//!
//! # Responsibility
//! - Produce a full or cropped raster of a tabula for one context.
//! - Layer, in fixed order: background, grid, marks, masks, tokens.
//!
//! # Invariants
//! - Output is a pure function of the tabula, context, crop and resolved
//!   glyphs; the same inputs give byte-identical pixels.
//! - Precondition failures (zero DPI, undecodable background) and deadline
//!   overruns return an error, never a partial image.
//! - Glyph failures never fail a render; the token falls back to its name.

use super::glyph::{GlyphError, GlyphResolver};
use crate::model::tabula::{Tabula, Token};
use crate::raster::surface::{crop_padded, fill_rect, fit_into, overlay_at, restore_rect};
use crate::raster::text::draw_text_centered;
use crate::raster::{draw_line, PixelPoint, PixelRect};
use image::{ImageError, ImageFormat, ImageReader, RgbaImage};
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Cursor;
use std::time::{Duration, Instant};

/// Smallest grid cell the compositor will draw; finer grids are rejected.
pub const MIN_RENDER_DPI: f64 = 1.0;
/// Gap between a token's square edge and its glyph or text.
pub const TOKEN_INSET_PX: u32 = 2;

/// Render failures.
#[derive(Debug)]
pub enum RenderError {
    ZeroDpi,
    InvalidDpi(f64),
    Background(ImageError),
    EmptyFrame,
    TimedOut { stage: &'static str },
    Encode(ImageError),
}

impl Display for RenderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroDpi => write!(f, "map has no grid size yet (dpi is 0); align it first"),
            Self::InvalidDpi(dpi) => write!(f, "cannot render grid with dpi {dpi}"),
            Self::Background(err) => write!(f, "background image is not drawable: {err}"),
            Self::EmptyFrame => write!(f, "render area is empty"),
            Self::TimedOut { stage } => write!(f, "render timed out while drawing {stage}"),
            Self::Encode(err) => write!(f, "failed to encode image: {err}"),
        }
    }
}

impl Error for RenderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Background(err) | Self::Encode(err) => Some(err),
            _ => None,
        }
    }
}

/// Per-call render limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub deadline: Option<Instant>,
}

impl RenderOptions {
    /// Options whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
        }
    }
}

/// Renders tabulas using an injected glyph resolver.
pub struct Compositor<'g> {
    glyphs: &'g dyn GlyphResolver,
    options: RenderOptions,
}

impl<'g> Compositor<'g> {
    pub fn new(glyphs: &'g dyn GlyphResolver) -> Self {
        Self {
            glyphs,
            options: RenderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Renders `tabula` as seen from `context`, optionally limited to `crop`
    /// (image pixel coordinates, negative origins allowed).
    pub fn render(
        &self,
        tabula: &Tabula,
        context: &str,
        crop: Option<PixelRect>,
    ) -> Result<RgbaImage, RenderError> {
        let started_at = Instant::now();
        check_dpi(tabula.dpi)?;

        let background = image::load_from_memory(&tabula.background)
            .map_err(RenderError::Background)?
            .to_rgba8();
        let frame = crop.unwrap_or_else(|| {
            PixelRect::new(0, 0, background.width(), background.height())
        });
        if frame.is_empty() {
            return Err(RenderError::EmptyFrame);
        }

        let mut canvas = crop_padded(&background, frame);
        self.checkpoint("background")?;

        draw_grid(&mut canvas, tabula, frame);
        self.checkpoint("grid")?;

        for (point, color) in tabula.marks_in(context) {
            let cell = tabula.cell_rect(*point, 1).relative_to(&frame);
            fill_rect(&mut canvas, cell, color.to_rgba());
        }
        self.checkpoint("marks")?;

        let masks = tabula.masks_in_order();
        let disclosed = masks.iter().any(|mask| mask.clear).then(|| canvas.clone());
        for mask in masks {
            let rect = mask.rect.relative_to(&frame);
            match (&disclosed, mask.clear) {
                (Some(base), true) => restore_rect(&mut canvas, base, rect),
                _ => fill_rect(&mut canvas, rect, mask.color.to_rgba()),
            }
        }
        self.checkpoint("masks")?;

        for (name, token) in tabula.tokens_in(context) {
            self.draw_token(&mut canvas, tabula, frame, name, token);
            self.checkpoint("tokens")?;
        }

        debug!(
            "event=render module=render status=ok tabula={} context={} width={} height={} duration_ms={}",
            tabula.id,
            context,
            frame.width,
            frame.height,
            started_at.elapsed().as_millis()
        );
        Ok(canvas)
    }

    fn checkpoint(&self, stage: &'static str) -> Result<(), RenderError> {
        match self.options.deadline {
            Some(deadline) if Instant::now() > deadline => {
                warn!("event=render module=render status=error error_code=timeout stage={stage}");
                Err(RenderError::TimedOut { stage })
            }
            _ => Ok(()),
        }
    }

    fn draw_token(
        &self,
        canvas: &mut RgbaImage,
        tabula: &Tabula,
        frame: PixelRect,
        name: &str,
        token: &Token,
    ) {
        let square = tabula.cell_rect(token.point, token.size).relative_to(&frame);
        fill_rect(canvas, square, token.color.to_rgba());

        let inner = square.inset(TOKEN_INSET_PX);
        let ink = token.color.contrasting().to_rgba();

        if let Some(glyph) = token.glyph.as_deref().and_then(|g| self.resolve_glyph(g)) {
            let (glyph_area, label_area) = match token.label.as_deref() {
                Some(_) => split_for_label(inner),
                None => (inner, None),
            };
            if let Some((resized, placed)) = fit_into(&glyph, glyph_area) {
                overlay_at(canvas, &resized, placed.left, placed.top);
            }
            if let (Some(label), Some(area)) = (token.label.as_deref(), label_area) {
                draw_text_centered(canvas, area, label, ink);
            }
            return;
        }

        draw_text_centered(canvas, inner, name, ink);
    }

    fn resolve_glyph(&self, name: &str) -> Option<RgbaImage> {
        match self.glyphs.resolve(name) {
            Ok(image) => Some(image),
            Err(GlyphError::NotFound(_)) => {
                debug!("event=glyph_fallback module=render status=not_found glyph={name}");
                None
            }
            Err(err) => {
                warn!("event=glyph_fallback module=render status=error glyph={name} error={err}");
                None
            }
        }
    }
}

/// Encodes a rendered image as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, RenderError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(RenderError::Encode)?;
    Ok(bytes)
}

/// Reads the pixel dimensions of an encoded background without decoding it.
pub fn background_dimensions(background: &[u8]) -> Result<(u32, u32), RenderError> {
    ImageReader::new(Cursor::new(background))
        .with_guessed_format()
        .map_err(|err| RenderError::Background(ImageError::IoError(err)))?
        .into_dimensions()
        .map_err(RenderError::Background)
}

fn check_dpi(dpi: f64) -> Result<(), RenderError> {
    if dpi == 0.0 {
        return Err(RenderError::ZeroDpi);
    }
    if !dpi.is_finite() || dpi < MIN_RENDER_DPI {
        return Err(RenderError::InvalidDpi(dpi));
    }
    Ok(())
}

fn draw_grid(canvas: &mut RgbaImage, tabula: &Tabula, frame: PixelRect) {
    let color = tabula.grid_color().to_rgba();
    let last_x = i64::from(canvas.width()) - 1;
    let last_y = i64::from(canvas.height()) - 1;

    let mut column = ((frame.left - i64::from(tabula.offset_x)) as f64 / tabula.dpi).floor();
    loop {
        let x = tabula.column_x(column);
        if x >= frame.right() {
            break;
        }
        if x >= frame.left {
            let local = x - frame.left;
            draw_line(canvas, PixelPoint::new(local, 0), PixelPoint::new(local, last_y), color);
        }
        column += 1.0;
    }

    let mut row = ((frame.top - i64::from(tabula.offset_y)) as f64 / tabula.dpi).floor();
    loop {
        let y = tabula.row_y(row);
        if y >= frame.bottom() {
            break;
        }
        if y >= frame.top {
            let local = y - frame.top;
            draw_line(canvas, PixelPoint::new(0, local), PixelPoint::new(last_x, local), color);
        }
        row += 1.0;
    }
}

/// Splits a token's inner area into a glyph area (top 3/4) and a label strip.
fn split_for_label(inner: PixelRect) -> (PixelRect, Option<PixelRect>) {
    let label_height = inner.height / 4;
    if label_height == 0 {
        return (inner, None);
    }
    let glyph = PixelRect::new(inner.left, inner.top, inner.width, inner.height - label_height);
    let label = PixelRect::new(inner.left, glyph.bottom(), inner.width, label_height);
    (glyph, Some(label))
}
