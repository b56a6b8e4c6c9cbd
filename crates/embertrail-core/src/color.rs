use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("color `{0}` must start with `#`")]
    MissingHash(String),
    #[error("color `{0}` must have 3 or 6 hex digits")]
    BadLength(String),
    #[error("color `{0}` contains a non-hex digit")]
    BadDigit(String),
}

/// Opaque sRGB color, written as `#rgb` or `#rrggbb` in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// The trail orange used by the portfolio theme.
    pub const EMBER: Color = Color::rgb(0xFF, 0x6B, 0x35);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Channels scaled to `0.0..=1.0`.
    pub fn to_unit(self) -> [f32; 3] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        ]
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let digits = value
            .strip_prefix('#')
            .ok_or_else(|| ColorError::MissingHash(value.to_string()))?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError::BadDigit(value.to_string()));
        }
        let channel = |hex: &str| u8::from_str_radix(hex, 16).map_err(|_| ColorError::BadDigit(value.to_string()));
        match digits.len() {
            3 => {
                let expand = |i: usize| channel(&digits[i..=i].repeat(2));
                Ok(Color::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(Color::rgb(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            _ => Err(ColorError::BadLength(value.to_string())),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_forms() {
        assert_eq!("#FF6B35".parse::<Color>().unwrap(), Color::EMBER);
        assert_eq!("#ff6b35".parse::<Color>().unwrap(), Color::EMBER);
        assert_eq!("#f80".parse::<Color>().unwrap(), Color::rgb(0xFF, 0x88, 0x00));
    }

    #[test]
    fn rejects_malformed_colors() {
        assert!(matches!("FF6B35".parse::<Color>(), Err(ColorError::MissingHash(_))));
        assert!(matches!("#FF6B3".parse::<Color>(), Err(ColorError::BadLength(_))));
        assert!(matches!("#GG6B35".parse::<Color>(), Err(ColorError::BadDigit(_))));
        assert!(matches!("#".parse::<Color>(), Err(ColorError::BadLength(_))));
    }

    #[test]
    fn formats_as_uppercase_hex() {
        assert_eq!(Color::rgb(1, 2, 255).to_hex(), "#0102FF");
    }
}
