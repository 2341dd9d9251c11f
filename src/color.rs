//! RGB color values and their text renderings.
//!
//! [`Color`] is the unit of output of the whole pipeline: one per sampled
//! frame. [`ColorFormat`] selects how a color is rendered when printed,
//! either as a `#rrggbb` hex string or as comma-separated `r,g,b` components.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use image::Rgb;

use crate::error::SpectrographError;

/// An 8-bit-per-channel RGB color.
///
/// # Example
///
/// ```
/// use spectrograph::Color;
///
/// let color = Color::new(0x33, 0x66, 0x99);
/// assert_eq!(color.to_hex(), "#336699");
/// assert_eq!(color.to_rgb_string(), "51,102,153");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Color {
    /// Red component.
    pub r: u8,
    /// Green component.
    pub g: u8,
    /// Blue component.
    pub b: u8,
}

impl Color {
    /// Create a color from its components.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Components as an `[r, g, b]` array.
    pub const fn components(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Lowercase `#rrggbb` rendering. Always seven characters.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// `r,g,b` rendering with decimal components.
    pub fn to_rgb_string(self) -> String {
        format!("{},{},{}", self.r, self.g, self.b)
    }

    /// Render according to `format`.
    pub fn format(self, format: ColorFormat) -> String {
        match format {
            ColorFormat::Hex => self.to_hex(),
            ColorFormat::Rgb => self.to_rgb_string(),
        }
    }

    /// Parse a `#rrggbb` string. The leading `#` is optional and case is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SpectrographError::InvalidColor`] for anything that is not
    /// six hex digits.
    pub fn from_hex(value: &str) -> Result<Self, SpectrographError> {
        let trimmed = value.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if digits.len() != 6 || !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(SpectrographError::InvalidColor(value.to_string()));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|_| SpectrographError::InvalidColor(value.to_string()))
        };

        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = SpectrographError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_hex(value)
    }
}

impl From<Rgb<u8>> for Color {
    fn from(pixel: Rgb<u8>) -> Self {
        let [r, g, b] = pixel.0;
        Self { r, g, b }
    }
}

impl From<Color> for Rgb<u8> {
    fn from(color: Color) -> Self {
        Rgb(color.components())
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

/// Text rendering used when a [`Spectrograph`](crate::Spectrograph) is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorFormat {
    /// `#rrggbb`. This is the default.
    #[default]
    Hex,
    /// `r,g,b` decimal components.
    Rgb,
}

impl FromStr for ColorFormat {
    type Err = SpectrographError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hex" => Ok(ColorFormat::Hex),
            "rgb" => Ok(ColorFormat::Rgb),
            _ => Err(SpectrographError::InvalidColorFormat(value.to_string())),
        }
    }
}

impl Display for ColorFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ColorFormat::Hex => f.write_str("hex"),
            ColorFormat::Rgb => f.write_str("rgb"),
        }
    }
}
