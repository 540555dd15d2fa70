//! LOD pyramid levels.
//!
//! Level `L` of a sector is a `(S >> L)`-sided grid where every cell is the
//! dominant color of a `2^L x 2^L` block of the level-0 grid. Every level is
//! derived from level 0 directly, never from the previous level.

use bytes::Bytes;

use crate::downsample::downsample;
use crate::error::CodecError;
use crate::rle;
use crate::{ColorIndex, SECTOR_CELLS, SECTOR_SIZE};

/// One level of the pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LodLevel {
    L0 = 0,
    L1 = 1,
    L2 = 2,
    L3 = 3,
}

impl LodLevel {
    pub const ALL: [LodLevel; 4] = [LodLevel::L0, LodLevel::L1, LodLevel::L2, LodLevel::L3];
    pub const COARSEST: LodLevel = LodLevel::L3;

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(LodLevel::L0),
            1 => Some(LodLevel::L1),
            2 => Some(LodLevel::L2),
            3 => Some(LodLevel::L3),
            _ => None,
        }
    }

    #[inline]
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Side of a level-0 block that maps to one cell of this level.
    #[inline]
    pub fn factor(self) -> usize {
        1 << self.index()
    }

    /// Grid side at this level.
    #[inline]
    pub fn side(self) -> usize {
        SECTOR_SIZE >> self.index()
    }

    #[inline]
    pub fn cells(self) -> usize {
        self.side() * self.side()
    }

    /// Next coarser level, if any.
    pub fn coarser(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }
}

impl std::fmt::Display for LodLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{}", self.index())
    }
}

/// Downsample a level-0 sector grid to `level` and run-length encode it.
pub fn encode_level(cells: &[ColorIndex], level: LodLevel) -> Result<Bytes, CodecError> {
    if cells.len() != SECTOR_CELLS {
        return Err(CodecError::GridSize {
            expected: SECTOR_CELLS,
            actual: cells.len(),
        });
    }
    if level == LodLevel::L0 {
        return Ok(rle::encode(cells));
    }
    let reduced = downsample(cells, SECTOR_SIZE, level.factor())?;
    Ok(rle::encode(&reduced))
}

/// Decode a blob produced for `level`.
pub fn decode_level(data: &[u8], level: LodLevel) -> Result<Vec<ColorIndex>, CodecError> {
    rle::decode(data, level.side())
}

/// All four encoded levels of one sector.
#[derive(Debug, Clone)]
pub struct LodPyramid {
    levels: [Bytes; 4],
}

impl LodPyramid {
    pub fn build(cells: &[ColorIndex]) -> Result<Self, CodecError> {
        Ok(Self {
            levels: [
                encode_level(cells, LodLevel::L0)?,
                encode_level(cells, LodLevel::L1)?,
                encode_level(cells, LodLevel::L2)?,
                encode_level(cells, LodLevel::L3)?,
            ],
        })
    }

    pub fn level(&self, level: LodLevel) -> &Bytes {
        &self.levels[level.index() as usize]
    }

    /// Total encoded size across levels.
    pub fn encoded_bytes(&self) -> usize {
        self.levels.iter().map(Bytes::len).sum()
    }
}
