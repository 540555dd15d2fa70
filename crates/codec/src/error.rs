//! Codec error types.

use thiserror::Error;

/// Errors that can occur while encoding, decoding or downsampling a sector grid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Corrupt LOD data: expected {expected} cells, decoded {actual}")]
    CorruptData { expected: usize, actual: usize },

    #[error("RLE stream has odd length {0}")]
    OddLength(usize),

    #[error("Zero-length run at byte offset {0}")]
    ZeroRun(usize),

    #[error("Invalid downsample factor {factor} for grid side {side}")]
    InvalidFactor { factor: usize, side: usize },

    #[error("Grid holds {actual} cells, expected {expected}")]
    GridSize { expected: usize, actual: usize },
}

impl CodecError {
    /// Whether the error means the blob itself is unusable and should be regenerated.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            CodecError::CorruptData { .. } | CodecError::OddLength(_) | CodecError::ZeroRun(_)
        )
    }
}
