//! Tabula repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Load and save whole tabulas: the map row plus masks, tokens and marks.
//!
//! # Invariants
//! - Write paths call `Tabula::validate()` before touching SQL.
//! - `save_tabula` replaces every overlay row in one transaction, so a failed
//!   save leaves the previous version intact.
//! - Read paths reject malformed rows instead of masking them.

use super::{bool_to_int, is_constraint_violation, RepoError, RepoResult};
use crate::model::color::Color;
use crate::model::tabula::{GridPoint, Mask, Tabula, TabulaId, Token};
use crate::model::user::UserId;
use crate::raster::PixelRect;
use log::info;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const TABULA_SELECT_SQL: &str = "SELECT
    uuid,
    owner_uuid,
    name,
    background,
    offset_x,
    offset_y,
    dpi,
    grid_color
FROM tabulas";

/// Lightweight listing entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TabulaSummary {
    pub id: TabulaId,
    pub name: String,
    pub dpi: f64,
}

/// Repository interface for tabula persistence.
pub trait TabulaRepository {
    fn create_tabula(&self, tabula: &Tabula) -> RepoResult<TabulaId>;
    fn save_tabula(&self, tabula: &Tabula) -> RepoResult<()>;
    fn get_tabula(&self, id: TabulaId) -> RepoResult<Option<Tabula>>;
    fn find_tabula(&self, owner: UserId, name: &str) -> RepoResult<Option<Tabula>>;
    fn list_tabulas(&self, owner: UserId) -> RepoResult<Vec<TabulaSummary>>;
    fn delete_tabula(&self, id: TabulaId) -> RepoResult<()>;
}

/// SQLite-backed tabula repository.
pub struct SqliteTabulaRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTabulaRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn write_overlays(&self, tabula: &Tabula) -> RepoResult<()> {
        let id = tabula.id.to_string();
        for table in ["masks", "tokens", "marks"] {
            self.conn.execute(
                &format!("DELETE FROM {table} WHERE tabula_uuid = ?1;"),
                [&id],
            )?;
        }

        let mut insert_mask = self.conn.prepare(
            "INSERT INTO masks (
                tabula_uuid, name, sort_order, color,
                rect_left, rect_top, rect_width, rect_height, is_clear
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
        )?;
        for mask in tabula.masks() {
            insert_mask.execute(params![
                id,
                mask.name,
                mask.order,
                mask.color.to_hex(),
                mask.rect.left,
                mask.rect.top,
                mask.rect.width,
                mask.rect.height,
                bool_to_int(mask.clear),
            ])?;
        }

        let mut insert_token = self.conn.prepare(
            "INSERT INTO tokens (
                tabula_uuid, context, name, grid_x, grid_y, color, size, glyph, label
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
        )?;
        for (key, token) in tabula.tokens() {
            insert_token.execute(params![
                id,
                key.context,
                key.name,
                token.point.x,
                token.point.y,
                token.color.to_hex(),
                token.size,
                token.glyph,
                token.label,
            ])?;
        }

        let mut insert_mark = self.conn.prepare(
            "INSERT INTO marks (tabula_uuid, context, grid_x, grid_y, color)
             VALUES (?1, ?2, ?3, ?4, ?5);",
        )?;
        for (context, point, color) in tabula.marks() {
            insert_mark.execute(params![id, context, point.x, point.y, color.to_hex()])?;
        }

        Ok(())
    }

    fn load_overlays(&self, tabula: &mut Tabula) -> RepoResult<()> {
        let id = tabula.id.to_string();

        let mut masks = self.conn.prepare(
            "SELECT name, sort_order, color, rect_left, rect_top, rect_width, rect_height, is_clear
             FROM masks WHERE tabula_uuid = ?1 ORDER BY sort_order ASC, name ASC;",
        )?;
        let mut rows = masks.query([&id])?;
        while let Some(row) = rows.next()? {
            tabula.set_mask(Mask {
                name: row.get("name")?,
                order: row.get("sort_order")?,
                color: parse_color(row, "color")?,
                rect: PixelRect::new(
                    row.get("rect_left")?,
                    row.get("rect_top")?,
                    row.get("rect_width")?,
                    row.get("rect_height")?,
                ),
                clear: parse_bool(row, "is_clear")?,
            });
        }

        let mut tokens = self.conn.prepare(
            "SELECT context, name, grid_x, grid_y, color, size, glyph, label
             FROM tokens WHERE tabula_uuid = ?1;",
        )?;
        let mut rows = tokens.query([&id])?;
        while let Some(row) = rows.next()? {
            let token = Token {
                point: GridPoint::new(row.get("grid_x")?, row.get("grid_y")?),
                color: parse_color(row, "color")?,
                size: row.get("size")?,
                glyph: row.get("glyph")?,
                label: row.get("label")?,
            };
            let context: String = row.get("context")?;
            let name: String = row.get("name")?;
            tabula.place_token(context, name, token);
        }

        let mut marks = self.conn.prepare(
            "SELECT context, grid_x, grid_y, color FROM marks WHERE tabula_uuid = ?1;",
        )?;
        let mut rows = marks.query([&id])?;
        while let Some(row) = rows.next()? {
            let context: String = row.get("context")?;
            let point = GridPoint::new(row.get("grid_x")?, row.get("grid_y")?);
            tabula.set_mark(context, point, parse_color(row, "color")?);
        }

        Ok(())
    }

    fn load_one(&self, sql: &str, params: impl rusqlite::Params) -> RepoResult<Option<Tabula>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let mut tabula = parse_tabula_row(row)?;
        drop(rows);
        self.load_overlays(&mut tabula)?;
        tabula.validate()?;
        Ok(Some(tabula))
    }
}

impl TabulaRepository for SqliteTabulaRepository<'_> {
    fn create_tabula(&self, tabula: &Tabula) -> RepoResult<TabulaId> {
        tabula.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO tabulas (
                uuid, owner_uuid, name, background, offset_x, offset_y, dpi, grid_color
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                tabula.id.to_string(),
                tabula.owner.to_string(),
                tabula.name.trim(),
                tabula.background,
                tabula.offset_x,
                tabula.offset_y,
                tabula.dpi,
                tabula.grid_color.map(Color::to_hex),
            ],
        )
        .map_err(|err| {
            if is_constraint_violation(&err) {
                RepoError::Duplicate(format!("tabula named `{}`", tabula.name.trim()))
            } else {
                err.into()
            }
        })?;
        self.write_overlays(tabula)?;
        tx.commit()?;

        info!(
            "event=tabula_create module=repo status=ok tabula={} bytes={}",
            tabula.id,
            tabula.background.len()
        );
        Ok(tabula.id)
    }

    fn save_tabula(&self, tabula: &Tabula) -> RepoResult<()> {
        tabula.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE tabulas
             SET
                name = ?1,
                background = ?2,
                offset_x = ?3,
                offset_y = ?4,
                dpi = ?5,
                grid_color = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?7;",
            params![
                tabula.name.trim(),
                tabula.background,
                tabula.offset_x,
                tabula.offset_y,
                tabula.dpi,
                tabula.grid_color.map(Color::to_hex),
                tabula.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "tabula",
                id: tabula.id.to_string(),
            });
        }
        self.write_overlays(tabula)?;
        tx.commit()?;

        info!(
            "event=tabula_save module=repo status=ok tabula={} dpi={} offset_x={} offset_y={}",
            tabula.id, tabula.dpi, tabula.offset_x, tabula.offset_y
        );
        Ok(())
    }

    fn get_tabula(&self, id: TabulaId) -> RepoResult<Option<Tabula>> {
        self.load_one(
            &format!("{TABULA_SELECT_SQL} WHERE uuid = ?1;"),
            [id.to_string()],
        )
    }

    fn find_tabula(&self, owner: UserId, name: &str) -> RepoResult<Option<Tabula>> {
        self.load_one(
            &format!("{TABULA_SELECT_SQL} WHERE owner_uuid = ?1 AND name = ?2;"),
            params![owner.to_string(), name.trim()],
        )
    }

    fn list_tabulas(&self, owner: UserId) -> RepoResult<Vec<TabulaSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, name, dpi FROM tabulas WHERE owner_uuid = ?1 ORDER BY name ASC;",
        )?;
        let mut rows = stmt.query([owner.to_string()])?;
        let mut summaries = Vec::new();
        while let Some(row) = rows.next()? {
            summaries.push(TabulaSummary {
                id: parse_uuid(row, "uuid")?,
                name: row.get("name")?,
                dpi: row.get("dpi")?,
            });
        }
        Ok(summaries)
    }

    fn delete_tabula(&self, id: TabulaId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tabulas WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "tabula",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_tabula_row(row: &Row<'_>) -> RepoResult<Tabula> {
    let id = parse_uuid(row, "uuid")?;
    let owner = parse_uuid(row, "owner_uuid")?;
    let name: String = row.get("name")?;
    let mut tabula = Tabula::with_id(id, owner, name, row.get("background")?);
    tabula.offset_x = row.get("offset_x")?;
    tabula.offset_y = row.get("offset_y")?;
    tabula.dpi = row.get("dpi")?;
    tabula.grid_color = row
        .get::<_, Option<String>>("grid_color")?
        .map(|text| {
            text.parse::<Color>()
                .map_err(|err| RepoError::InvalidData(format!("tabulas.grid_color: {err}")))
        })
        .transpose()?;
    Ok(tabula)
}

pub(crate) fn parse_uuid(row: &Row<'_>, column: &str) -> RepoResult<Uuid> {
    let text: String = row.get(column)?;
    Uuid::parse_str(&text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{text}` in column {column}")))
}

fn parse_color(row: &Row<'_>, column: &str) -> RepoResult<Color> {
    let text: String = row.get(column)?;
    text.parse()
        .map_err(|err| RepoError::InvalidData(format!("column {column}: {err}")))
}

fn parse_bool(row: &Row<'_>, column: &str) -> RepoResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean `{other}` in column {column}"
        ))),
    }
}
