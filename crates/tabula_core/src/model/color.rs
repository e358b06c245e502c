//! RGBA color value shared by masks, tokens, marks and grid lines.

use image::Rgba;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static HEX_COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#?([0-9a-fA-F]{2})([0-9a-fA-F]{2})([0-9a-fA-F]{2})([0-9a-fA-F]{2})?$")
        .expect("valid hex color regex")
});

/// Straight (non-premultiplied) RGBA8 color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const BLACK: Color = Color([0, 0, 0, 255]);
    pub const WHITE: Color = Color([255, 255, 255, 255]);
    pub const RED: Color = Color([255, 0, 0, 255]);
    pub const CLEAR: Color = Color([0, 0, 0, 0]);

    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba(self.0)
    }

    /// Black or white, whichever reads better on top of this color.
    pub fn contrasting(self) -> Self {
        let [r, g, b, _] = self.0;
        let luma = 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
        if luma > 128_000 {
            Self::BLACK
        } else {
            Self::WHITE
        }
    }

    /// Canonical `#rrggbbaa` form.
    pub fn to_hex(self) -> String {
        let [r, g, b, a] = self.0;
        format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Rejected color text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorParseError(pub String);

impl Display for ColorParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid color `{}`; expected #rrggbb, #rrggbbaa or a named color",
            self.0
        )
    }
}

impl Error for ColorParseError {}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let named = match trimmed.to_ascii_lowercase().as_str() {
            "black" => Some(Self::BLACK),
            "white" => Some(Self::WHITE),
            "red" => Some(Self::RED),
            "green" => Some(Self::rgba(0, 128, 0, 255)),
            "blue" => Some(Self::rgba(0, 0, 255, 255)),
            "yellow" => Some(Self::rgba(255, 255, 0, 255)),
            "clear" | "transparent" => Some(Self::CLEAR),
            _ => None,
        };
        if let Some(color) = named {
            return Ok(color);
        }

        let captures = HEX_COLOR_RE
            .captures(trimmed)
            .ok_or_else(|| ColorParseError(trimmed.to_string()))?;
        let channel = |index: usize| -> u8 {
            captures
                .get(index)
                .and_then(|m| u8::from_str_radix(m.as_str(), 16).ok())
                .unwrap_or(255)
        };
        Ok(Self([channel(1), channel(2), channel(3), channel(4)]))
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::Color;

    #[test]
    fn parses_hex_with_and_without_alpha() {
        assert_eq!(
            "#ff8000".parse::<Color>().expect("rgb"),
            Color::rgba(255, 128, 0, 255)
        );
        assert_eq!(
            "10203040".parse::<Color>().expect("rgba without hash"),
            Color::rgba(0x10, 0x20, 0x30, 0x40)
        );
    }

    #[test]
    fn parses_named_colors_case_insensitively() {
        assert_eq!(" Black ".parse::<Color>().expect("named"), Color::BLACK);
        assert_eq!("clear".parse::<Color>().expect("named"), Color::CLEAR);
    }

    #[test]
    fn rejects_garbage() {
        let err = "#12345".parse::<Color>().expect_err("too short");
        assert!(err.to_string().contains("#12345"));
    }

    #[test]
    fn hex_form_round_trips() {
        let color = Color::rgba(1, 2, 3, 4);
        assert_eq!(color.to_hex(), "#01020304");
        assert_eq!(color.to_hex().parse::<Color>().expect("round trip"), color);
    }

    #[test]
    fn contrasting_picks_readable_text_color() {
        assert_eq!(Color::WHITE.contrasting(), Color::BLACK);
        assert_eq!(Color::BLACK.contrasting(), Color::WHITE);
    }
}
