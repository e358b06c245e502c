//! Content fingerprint of every render input.
//!
//! External image caches key rendered output by this value; two renders with
//! equal fingerprints produce identical pixels (given the same glyphs).

use crate::model::tabula::Tabula;
use crate::raster::PixelRect;
use sha2::{Digest, Sha256};

/// Bumped whenever compositing output changes for identical inputs.
pub const RENDER_VERSION: u32 = 1;

/// Hex SHA-256 over background, geometry, masks, marks and tokens of `context`.
pub fn render_fingerprint(tabula: &Tabula, context: &str, crop: Option<PixelRect>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(RENDER_VERSION.to_le_bytes());
    write_bytes(&mut hasher, &tabula.background);
    hasher.update(tabula.offset_x.to_le_bytes());
    hasher.update(tabula.offset_y.to_le_bytes());
    hasher.update(tabula.dpi.to_bits().to_le_bytes());
    hasher.update(tabula.grid_color().0);

    match crop {
        Some(rect) => {
            hasher.update([1u8]);
            write_rect(&mut hasher, rect);
        }
        None => hasher.update([0u8]),
    }

    for mask in tabula.masks_in_order() {
        write_str(&mut hasher, &mask.name);
        hasher.update(mask.order.to_le_bytes());
        hasher.update(mask.color.0);
        write_rect(&mut hasher, mask.rect);
        hasher.update([u8::from(mask.clear)]);
    }

    write_str(&mut hasher, context);
    for (point, color) in tabula.marks_in(context) {
        hasher.update(point.x.to_le_bytes());
        hasher.update(point.y.to_le_bytes());
        hasher.update(color.0);
    }
    for (name, token) in tabula.tokens_in(context) {
        write_str(&mut hasher, name);
        hasher.update(token.point.x.to_le_bytes());
        hasher.update(token.point.y.to_le_bytes());
        hasher.update(token.color.0);
        hasher.update(token.size.to_le_bytes());
        write_str(&mut hasher, token.glyph.as_deref().unwrap_or(""));
        write_str(&mut hasher, token.label.as_deref().unwrap_or(""));
    }

    hex::encode(hasher.finalize())
}

fn write_bytes(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn write_str(hasher: &mut Sha256, value: &str) {
    write_bytes(hasher, value.as_bytes());
}

fn write_rect(hasher: &mut Sha256, rect: PixelRect) {
    hasher.update(rect.left.to_le_bytes());
    hasher.update(rect.top.to_le_bytes());
    hasher.update(rect.width.to_le_bytes());
    hasher.update(rect.height.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::render_fingerprint;
    use crate::model::color::Color;
    use crate::model::tabula::{GridPoint, Tabula, Token};
    use uuid::Uuid;

    fn tabula() -> Tabula {
        let mut tabula = Tabula::new(Uuid::new_v4(), "keep", vec![1, 2, 3]);
        tabula.dpi = 50.0;
        tabula
    }

    #[test]
    fn equal_inputs_give_equal_fingerprints() {
        let tabula = tabula();
        assert_eq!(
            render_fingerprint(&tabula, "room", None),
            render_fingerprint(&tabula.clone(), "room", None)
        );
    }

    #[test]
    fn tokens_only_affect_their_own_context() {
        let mut tabula = tabula();
        let before_room = render_fingerprint(&tabula, "room", None);
        let before_other = render_fingerprint(&tabula, "other", None);

        tabula.place_token("room", "orc", Token::new(GridPoint::new(1, 1), Color::RED));

        assert_ne!(render_fingerprint(&tabula, "room", None), before_room);
        assert_eq!(render_fingerprint(&tabula, "other", None), before_other);
    }

    #[test]
    fn dpi_change_changes_fingerprint() {
        let mut tabula = tabula();
        let before = render_fingerprint(&tabula, "room", None);
        tabula.dpi = 50.5;
        assert_ne!(render_fingerprint(&tabula, "room", None), before);
    }
}
