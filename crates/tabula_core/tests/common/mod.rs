#![allow(dead_code)]

use image::{ImageFormat, Rgba, RgbaImage};
use rusqlite::Connection;
use std::io::Cursor;
use tabula_core::{SqliteUserRepository, User, UserRepository};

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// PNG bytes of a solid `width`×`height` image.
pub fn solid_png(width: u32, height: u32, color: Rgba<u8>) -> Vec<u8> {
    png_bytes(&RgbaImage::from_pixel(width, height, color))
}

pub fn png_bytes(image: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn create_user(conn: &Connection, handle: &str) -> User {
    let user = User::new(handle);
    SqliteUserRepository::new(conn).create_user(&user).unwrap();
    user
}
