mod common;

use common::{png_bytes, solid_png, WHITE};
use image::{Rgba, RgbaImage};
use std::time::Duration;
use tabula_core::raster::PixelRect;
use tabula_core::render::{encode_png, render_fingerprint, RenderOptions};
use tabula_core::{
    Color, Compositor, DirectoryGlyphResolver, GridPoint, Mask, NoGlyphs, RenderError, Tabula,
    Token,
};
use uuid::Uuid;

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);

fn aligned_tabula() -> Tabula {
    let mut tabula = Tabula::new(Uuid::new_v4(), "arena", solid_png(40, 40, WHITE));
    tabula.dpi = 10.0;
    tabula
}

fn mask(name: &str, order: u32, color: Color, rect: PixelRect, clear: bool) -> Mask {
    Mask {
        name: name.to_string(),
        order,
        color,
        rect,
        clear,
    }
}

#[test]
fn grid_lines_follow_dpi_and_offset() {
    let mut tabula = aligned_tabula();
    tabula.offset_x = 3;
    let image = Compositor::new(&NoGlyphs).render(&tabula, "", None).unwrap();

    assert_eq!(image.dimensions(), (40, 40));
    assert_eq!(*image.get_pixel(13, 5), BLACK);
    assert_eq!(*image.get_pixel(10, 5), WHITE);
    assert_eq!(*image.get_pixel(5, 10), BLACK);
    assert_eq!(*image.get_pixel(15, 15), WHITE);
}

#[test]
fn translucent_grid_color_is_blended() {
    let mut tabula = aligned_tabula();
    tabula.grid_color = Some(Color::rgba(0, 0, 0, 128));
    let image = Compositor::new(&NoGlyphs).render(&tabula, "", None).unwrap();

    let pixel = image.get_pixel(10, 5);
    assert!((126..=128).contains(&pixel[0]), "got {pixel:?}");
    assert_eq!(pixel[3], 255);
}

#[test]
fn masks_paint_in_ascending_order_regardless_of_insertion() {
    let mut tabula = aligned_tabula();
    let area = PixelRect::new(12, 12, 6, 6);
    tabula.set_mask(mask("top", 5, Color::RED, area, false));
    tabula.set_mask(mask("under", 1, Color::rgba(0, 0, 255, 255), area, false));

    let image = Compositor::new(&NoGlyphs).render(&tabula, "", None).unwrap();
    assert_eq!(*image.get_pixel(15, 15), RED);
}

#[test]
fn clear_mask_discloses_pre_mask_layers() {
    let mut tabula = aligned_tabula();
    tabula.set_mark("table", GridPoint::new(1, 1), Color::rgba(0, 255, 0, 255));
    tabula.set_mask(mask("fog", 1, Color::BLACK, PixelRect::new(0, 0, 40, 40), false));
    tabula.set_mask(mask("window", 2, Color::CLEAR, PixelRect::new(12, 12, 6, 6), true));

    let image = Compositor::new(&NoGlyphs)
        .render(&tabula, "table", None)
        .unwrap();
    assert_eq!(*image.get_pixel(15, 15), GREEN);
    assert_eq!(*image.get_pixel(5, 5), BLACK);
    assert_eq!(*image.get_pixel(25, 25), BLACK);
}

#[test]
fn marks_and_tokens_only_render_in_their_context() {
    let mut tabula = aligned_tabula();
    tabula.set_mark("other", GridPoint::new(1, 1), Color::RED);
    tabula.place_token("other", "orc", Token::new(GridPoint::new(2, 2), Color::RED));

    let image = Compositor::new(&NoGlyphs)
        .render(&tabula, "table", None)
        .unwrap();
    assert_eq!(*image.get_pixel(15, 15), WHITE);
    assert_eq!(*image.get_pixel(25, 25), WHITE);
}

#[test]
fn missing_glyph_falls_back_to_a_plain_token() {
    let mut tabula = aligned_tabula();
    let mut token = Token::new(GridPoint::new(1, 1), Color::RED);
    token.glyph = Some("nowhere".to_string());
    tabula.place_token("table", "A", token);

    let image = Compositor::new(&NoGlyphs)
        .render(&tabula, "table", None)
        .unwrap();
    assert_eq!(*image.get_pixel(11, 11), RED);
    assert_eq!(*image.get_pixel(10, 10), RED);
}

#[test]
fn long_token_name_is_truncated_not_dropped() {
    let mut tabula = Tabula::new(Uuid::new_v4(), "hall", solid_png(100, 100, WHITE));
    tabula.dpi = 50.0;
    tabula.place_token(
        "table",
        "goblin_king",
        Token::new(GridPoint::new(0, 0), Color::rgba(0, 0, 255, 255)),
    );

    let image = Compositor::new(&NoGlyphs)
        .render(&tabula, "table", None)
        .unwrap();
    let ink = (2..48)
        .flat_map(|y| (2..48).map(move |x| (x, y)))
        .filter(|&(x, y)| *image.get_pixel(x, y) == WHITE)
        .count();
    assert!(ink > 0, "token name left no ink");
    assert_eq!(*image.get_pixel(3, 3), Rgba([0, 0, 255, 255]));
}

#[test]
fn resolved_glyph_is_fitted_inside_the_token() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("orc.png"),
        png_bytes(&RgbaImage::from_pixel(4, 4, GREEN)),
    )
    .unwrap();
    let glyphs = DirectoryGlyphResolver::new(dir.path());

    let mut tabula = aligned_tabula();
    let mut token = Token::new(GridPoint::new(1, 1), Color::RED);
    token.size = 2;
    token.glyph = Some(":orc:".to_string());
    tabula.place_token("table", "orc", token);

    let image = Compositor::new(&glyphs)
        .render(&tabula, "table", None)
        .unwrap();
    assert_eq!(*image.get_pixel(20, 20), GREEN);
    assert_eq!(*image.get_pixel(12, 12), GREEN);
    assert_eq!(*image.get_pixel(11, 11), RED);
}

#[test]
fn negative_crop_is_padded_with_transparency() {
    let tabula = aligned_tabula();
    let image = Compositor::new(&NoGlyphs)
        .render(&tabula, "", Some(PixelRect::new(-20, -20, 40, 40)))
        .unwrap();

    assert_eq!(image.dimensions(), (40, 40));
    assert_eq!(image.get_pixel(5, 5)[3], 0);
    assert_eq!(*image.get_pixel(25, 25), WHITE);
    // Image column 0 is a grid line.
    assert_eq!(*image.get_pixel(20, 25), BLACK);
}

#[test]
fn zero_and_tiny_dpi_fail_before_drawing() {
    let mut tabula = aligned_tabula();
    tabula.dpi = 0.0;
    let compositor = Compositor::new(&NoGlyphs);
    assert!(matches!(
        compositor.render(&tabula, "", None),
        Err(RenderError::ZeroDpi)
    ));

    tabula.dpi = 0.25;
    assert!(matches!(
        compositor.render(&tabula, "", None),
        Err(RenderError::InvalidDpi(_))
    ));
}

#[test]
fn undecodable_background_fails() {
    let mut tabula = Tabula::new(Uuid::new_v4(), "broken", vec![1, 2, 3]);
    tabula.dpi = 10.0;
    assert!(matches!(
        Compositor::new(&NoGlyphs).render(&tabula, "", None),
        Err(RenderError::Background(_))
    ));
}

#[test]
fn expired_deadline_returns_timeout_not_an_image() {
    let tabula = aligned_tabula();
    let compositor =
        Compositor::new(&NoGlyphs).with_options(RenderOptions::with_timeout(Duration::ZERO));
    assert!(matches!(
        compositor.render(&tabula, "", None),
        Err(RenderError::TimedOut { .. })
    ));
}

#[test]
fn rendering_is_deterministic() {
    let mut tabula = aligned_tabula();
    tabula.place_token("table", "hero", Token::new(GridPoint::new(2, 1), Color::RED));
    tabula.set_mask(mask("fog", 0, Color::rgba(0, 0, 0, 200), PixelRect::new(0, 30, 40, 10), false));
    let compositor = Compositor::new(&NoGlyphs);

    let first = encode_png(&compositor.render(&tabula, "table", None).unwrap()).unwrap();
    let second = encode_png(&compositor.render(&tabula, "table", None).unwrap()).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        render_fingerprint(&tabula, "table", None),
        render_fingerprint(&tabula.clone(), "table", None)
    );
}
