//! Canvas error types.

use codec::CodecError;
use thiserror::Error;

use crate::coords::SectorCoord;

/// Errors surfaced by the canvas core.
///
/// None of these are fatal: viewport errors resolve to the last good viewport,
/// codec errors become cache misses, and write errors reject a single pixel.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CanvasError {
    #[error("Invalid viewport: {0}")]
    InvalidViewport(String),

    #[error("Local coordinate ({x}, {y}) outside sector bounds")]
    LocalOutOfRange { x: u16, y: u16 },

    #[error("Color index {color} outside palette of {palette_size}")]
    ColorOutOfRange { color: u8, palette_size: usize },

    #[error("Sector {0} is not open for drawing")]
    SectorLocked(SectorCoord),

    #[error(transparent)]
    Codec(#[from] CodecError),
}
