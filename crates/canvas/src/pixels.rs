//! Live pixel grids.
//!
//! Each sector that has been written to or loaded owns a dense level-0 grid plus
//! a bitset of occupied cells. The bitset is the live set that sector pixel
//! counts are verified against.

use std::collections::HashMap;

use codec::{BACKGROUND, ColorIndex, SECTOR_CELLS};
use fixedbitset::FixedBitSet;

use crate::coords::{LocalCoord, Pixel, SectorCoord};

/// How a single write changed its cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteEffect {
    /// Empty cell became non-empty.
    Added,
    /// Non-empty cell changed color.
    Overwritten,
    /// Non-empty cell was erased.
    Cleared,
    /// Same color as before.
    Unchanged,
}

impl WriteEffect {
    /// Whether the sector's pixels (and so its LOD levels) changed.
    #[inline]
    pub fn is_change(self) -> bool {
        self != WriteEffect::Unchanged
    }
}

/// Dense grid for one sector.
#[derive(Debug, Clone)]
pub struct SectorPixels {
    cells: Vec<ColorIndex>,
    occupied: FixedBitSet,
    /// False when the grid was created by a write before the sector's stored
    /// pixels were loaded; its live count then undercounts the truth.
    complete: bool,
}

impl SectorPixels {
    pub fn new(complete: bool) -> Self {
        Self {
            cells: vec![BACKGROUND; SECTOR_CELLS],
            occupied: FixedBitSet::with_capacity(SECTOR_CELLS),
            complete,
        }
    }

    #[inline]
    pub fn get(&self, local: LocalCoord) -> ColorIndex {
        self.cells[local.index()]
    }

    pub fn set(&mut self, local: LocalCoord, color: ColorIndex) -> WriteEffect {
        let index = local.index();
        let previous = self.cells[index];
        if previous == color {
            return WriteEffect::Unchanged;
        }
        self.cells[index] = color;
        self.occupied.set(index, color != BACKGROUND);
        match (previous == BACKGROUND, color == BACKGROUND) {
            (true, false) => WriteEffect::Added,
            (false, true) => WriteEffect::Cleared,
            _ => WriteEffect::Overwritten,
        }
    }

    /// Exact number of non-empty cells.
    #[inline]
    pub fn live_count(&self) -> usize {
        self.occupied.count_ones(..)
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    #[inline]
    pub fn cells(&self) -> &[ColorIndex] {
        &self.cells
    }

    /// Non-empty cells in row-major order.
    pub fn iter_occupied(&self) -> impl Iterator<Item = (LocalCoord, ColorIndex)> + '_ {
        self.occupied
            .ones()
            .map(|index| (LocalCoord::from_index(index), self.cells[index]))
    }
}

/// All resident sector grids.
#[derive(Debug, Default)]
pub struct PixelStore {
    sectors: HashMap<SectorCoord, SectorPixels>,
}

impl PixelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one pixel. A grid created by this call is marked complete only if
    /// `complete_if_new` is set.
    pub fn write(&mut self, pixel: &Pixel, complete_if_new: bool) -> WriteEffect {
        self.sectors
            .entry(pixel.sector)
            .or_insert_with(|| SectorPixels::new(complete_if_new))
            .set(pixel.local, pixel.color)
    }

    #[inline]
    pub fn sector(&self, sector: SectorCoord) -> Option<&SectorPixels> {
        self.sectors.get(&sector)
    }

    /// Replace a sector's grid with authoritative pixels. Returns the live count.
    pub fn replace_sector(&mut self, sector: SectorCoord, pixels: impl IntoIterator<Item = Pixel>) -> usize {
        let mut grid = SectorPixels::new(true);
        for pixel in pixels {
            debug_assert_eq!(pixel.sector, sector);
            grid.set(pixel.local, pixel.color);
        }
        let count = grid.live_count();
        self.sectors.insert(sector, grid);
        count
    }

    /// Copy of a sector's level-0 grid, for off-thread encoding.
    pub fn snapshot(&self, sector: SectorCoord) -> Option<Vec<ColorIndex>> {
        self.sectors.get(&sector).map(|grid| grid.cells().to_vec())
    }

    /// Number of resident grids.
    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(x: u16, y: u16) -> LocalCoord {
        LocalCoord::new(x, y).unwrap()
    }

    #[test]
    fn test_write_effects() {
        let mut grid = SectorPixels::new(true);
        assert_eq!(grid.set(local(1, 1), 3), WriteEffect::Added);
        assert_eq!(grid.set(local(1, 1), 3), WriteEffect::Unchanged);
        assert_eq!(grid.set(local(1, 1), 4), WriteEffect::Overwritten);
        assert_eq!(grid.live_count(), 1);
        assert_eq!(grid.set(local(1, 1), 0), WriteEffect::Cleared);
        assert_eq!(grid.live_count(), 0);
        assert_eq!(grid.set(local(2, 2), 0), WriteEffect::Unchanged);
    }

    #[test]
    fn test_store_tracks_live_count() {
        let mut store = PixelStore::new();
        let sector = SectorCoord::new(-2, 5);
        for x in 0..10 {
            store.write(&Pixel::new(sector, local(x, 0), 1), true);
        }
        store.write(&Pixel::new(sector, local(0, 0), 2), true);
        let grid = store.sector(sector).unwrap();
        assert_eq!(grid.live_count(), 10);
        assert!(grid.is_complete());
        assert_eq!(grid.get(local(0, 0)), 2);
        assert!(store.sector(SectorCoord::ORIGIN).is_none());
    }

    #[test]
    fn test_iter_occupied_row_major() {
        let mut grid = SectorPixels::new(true);
        grid.set(local(5, 1), 7);
        grid.set(local(9, 0), 6);
        let cells: Vec<_> = grid.iter_occupied().collect();
        assert_eq!(cells, vec![(local(9, 0), 6), (local(5, 1), 7)]);
    }

    #[test]
    fn test_replace_sector() {
        let mut store = PixelStore::new();
        let sector = SectorCoord::new(1, 1);
        store.write(&Pixel::new(sector, local(0, 0), 9), false);
        assert!(!store.sector(sector).unwrap().is_complete());

        let count = store.replace_sector(
            sector,
            [Pixel::new(sector, local(3, 3), 1), Pixel::new(sector, local(4, 3), 2)],
        );
        assert_eq!(count, 2);
        assert!(store.sector(sector).unwrap().is_complete());
        assert_eq!(store.sector(sector).unwrap().get(local(0, 0)), 0);
        assert_eq!(store.snapshot(sector).unwrap().len(), SECTOR_CELLS);
    }
}
