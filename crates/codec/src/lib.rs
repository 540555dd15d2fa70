//! Sector codec for pixel-frontier.
//!
//! This crate contains:
//! - Byte cursors for LOD blobs
//! - Run-length encoding of palette-index grids
//! - Dominant-color downsampling and the four-level LOD pyramid
//! - Shared types (Color, ColorIndex, sector geometry)

mod binary;
mod downsample;
mod error;
pub mod lod;
pub mod rle;

pub use binary::{BinaryReader, BinaryWriter};
pub use downsample::{dominant_color, downsample};
pub use error::CodecError;
pub use lod::{LodLevel, LodPyramid, decode_level, encode_level};

/// Index into the fixed palette.
pub type ColorIndex = u8;

/// Empty cell.
pub const BACKGROUND: ColorIndex = 0;

/// Side length of a sector in world pixels.
pub const SECTOR_SIZE: usize = 256;

/// Cells per sector at level 0.
pub const SECTOR_CELLS: usize = SECTOR_SIZE * SECTOR_SIZE;

/// RGB color emitted to the paint surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` or `rrggbb`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Linear blend toward `other`; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Color::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_hex() {
        let c = Color::from_hex("#ff4500").unwrap();
        assert_eq!(c, Color::new(0xff, 0x45, 0x00));
        assert_eq!(c.to_string(), "#ff4500");
        assert_eq!(Color::from_hex("12345"), None);
        assert_eq!(Color::from_hex("zz0000"), None);
    }

    #[test]
    fn test_color_lerp() {
        let black = Color::new(0, 0, 0);
        let white = Color::new(255, 255, 255);
        assert_eq!(black.lerp(white, 0.0), black);
        assert_eq!(black.lerp(white, 1.0), white);
        assert_eq!(black.lerp(white, 2.0), white);
        assert_eq!(black.lerp(white, 0.5), Color::new(128, 128, 128));
    }
}
