//! Fixed color palette.

use codec::{Color, ColorIndex};

use crate::error::CanvasError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    pub fn new(colors: Vec<Color>) -> Self {
        Self { colors }
    }

    /// Parse `#rrggbb` entries; unparsable entries become black.
    pub fn from_hex<S: AsRef<str>>(entries: &[S]) -> Self {
        Self::new(
            entries
                .iter()
                .map(|s| Color::from_hex(s.as_ref()).unwrap_or_default())
                .collect(),
        )
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Color for an index; out-of-range indices fall back to entry 0.
    #[inline]
    pub fn color(&self, index: ColorIndex) -> Color {
        self.colors
            .get(index as usize)
            .or_else(|| self.colors.first())
            .copied()
            .unwrap_or_default()
    }

    pub fn check(&self, index: ColorIndex) -> Result<(), CanvasError> {
        if (index as usize) < self.colors.len() {
            Ok(())
        } else {
            Err(CanvasError::ColorOutOfRange {
                color: index,
                palette_size: self.colors.len(),
            })
        }
    }
}
