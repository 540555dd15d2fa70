//! Run-length encoding of palette-index grids.
//!
//! A stream is a sequence of `(color, run)` byte pairs with `run` in `1..=255`.
//! Runs longer than 255 are split into consecutive pairs of the same color.

use bytes::Bytes;

use crate::binary::{BinaryReader, BinaryWriter};
use crate::error::CodecError;
use crate::ColorIndex;

/// Longest run a single pair can express.
pub const MAX_RUN: usize = u8::MAX as usize;

/// Encode cells in scan order.
pub fn encode(cells: &[ColorIndex]) -> Bytes {
    let mut writer = BinaryWriter::with_capacity(64);
    let Some((&first, rest)) = cells.split_first() else {
        return writer.finish();
    };

    let mut color = first;
    let mut run = 1usize;
    for &cell in rest {
        if cell == color && run < MAX_RUN {
            run += 1;
        } else {
            writer.put_pair(color, run as u8);
            color = cell;
            run = 1;
        }
    }
    writer.put_pair(color, run as u8);
    writer.finish()
}

/// Decode a stream that must expand to exactly `side * side` cells.
pub fn decode(data: &[u8], side: usize) -> Result<Vec<ColorIndex>, CodecError> {
    let expected = side * side;
    if data.len() % 2 != 0 {
        return Err(CodecError::OddLength(data.len()));
    }

    let mut reader = BinaryReader::new(Bytes::copy_from_slice(data));
    let mut cells = Vec::with_capacity(expected);
    let mut total = 0usize;
    loop {
        let offset = reader.offset();
        let Some((color, run)) = reader.try_get_pair() else {
            break;
        };
        if run == 0 {
            return Err(CodecError::ZeroRun(offset));
        }
        total += run as usize;
        if total > expected {
            return Err(CodecError::CorruptData {
                expected,
                actual: total + run_total(&mut reader),
            });
        }
        cells.resize(total, color);
    }

    if total != expected {
        return Err(CodecError::CorruptData {
            expected,
            actual: total,
        });
    }
    Ok(cells)
}

fn run_total(reader: &mut BinaryReader) -> usize {
    let mut total = 0;
    while let Some((_, run)) = reader.try_get_pair() {
        total += run as usize;
    }
    total
}
