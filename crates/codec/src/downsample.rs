//! Dominant-color downsampling.
//!
//! Each output cell is the most frequent color of its `factor x factor` input
//! block. Background (index 0) only wins when the whole block is background,
//! and ties resolve to the lowest color index so the result does not depend on
//! scan order.

use crate::error::CodecError;
use crate::{BACKGROUND, ColorIndex};

/// Per-color tally reused across blocks.
struct Vote {
    counts: [u32; 256],
    touched: Vec<ColorIndex>,
}

impl Vote {
    fn new() -> Self {
        Self {
            counts: [0; 256],
            touched: Vec::with_capacity(64),
        }
    }

    #[inline]
    fn add(&mut self, color: ColorIndex) {
        if color == BACKGROUND {
            return;
        }
        let slot = &mut self.counts[color as usize];
        if *slot == 0 {
            self.touched.push(color);
        }
        *slot += 1;
    }

    /// Winner of the current vote; resets the tally.
    fn finish(&mut self) -> ColorIndex {
        let mut best = BACKGROUND;
        let mut best_count = 0u32;
        for &color in &self.touched {
            let count = self.counts[color as usize];
            if count > best_count || (count == best_count && color < best) {
                best = color;
                best_count = count;
            }
            self.counts[color as usize] = 0;
        }
        self.touched.clear();
        best
    }
}

/// Downsample a `side x side` grid by `factor`, producing `(side / factor)^2` cells.
pub fn downsample(
    cells: &[ColorIndex],
    side: usize,
    factor: usize,
) -> Result<Vec<ColorIndex>, CodecError> {
    check_grid(cells, side)?;
    if factor == 0 || !factor.is_power_of_two() || side % factor != 0 {
        return Err(CodecError::InvalidFactor { factor, side });
    }
    if factor == 1 {
        return Ok(cells.to_vec());
    }

    let out_side = side / factor;
    let mut out = Vec::with_capacity(out_side * out_side);
    let mut vote = Vote::new();
    for by in 0..out_side {
        for bx in 0..out_side {
            for y in by * factor..(by + 1) * factor {
                let row = &cells[y * side + bx * factor..y * side + (bx + 1) * factor];
                for &color in row {
                    vote.add(color);
                }
            }
            out.push(vote.finish());
        }
    }
    Ok(out)
}

/// Dominant color of an entire grid under the same voting rules.
pub fn dominant_color(cells: &[ColorIndex]) -> ColorIndex {
    let mut vote = Vote::new();
    for &color in cells {
        vote.add(color);
    }
    vote.finish()
}

fn check_grid(cells: &[ColorIndex], side: usize) -> Result<(), CodecError> {
    let expected = side * side;
    if cells.len() != expected {
        return Err(CodecError::GridSize {
            expected,
            actual: cells.len(),
        });
    }
    Ok(())
}
