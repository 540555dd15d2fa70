//! Persistence and realtime seam.

use std::collections::{BTreeMap, BTreeSet};

use codec::{BACKGROUND, ColorIndex};
use tokio::sync::mpsc;

use crate::bounds::SectorRect;
use crate::coords::{LocalCoord, Pixel, SectorCoord};
use crate::registry::SectorSnapshot;

/// External pixel storage with push notifications.
pub trait CanvasStore {
    /// Every stored pixel in the sectors covered by `rect`.
    fn load_pixels_in_rect(&self, rect: &SectorRect) -> Vec<Pixel>;

    fn load_sector_states(&self) -> Vec<SectorSnapshot>;

    /// Pixels written elsewhere from now on.
    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Pixel>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sectors: BTreeMap<SectorCoord, BTreeMap<LocalCoord, ColorIndex>>,
    active: BTreeSet<SectorCoord>,
    subscribers: Vec<mpsc::UnboundedSender<Pixel>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a pixel and notify subscribers. Returns the number notified.
    pub fn put_pixel(&mut self, pixel: Pixel) -> usize {
        self.insert(pixel);
        self.subscribers.retain(|tx| tx.send(pixel).is_ok());
        self.subscribers.len()
    }

    /// Store a pixel without notifying anyone.
    pub fn insert(&mut self, pixel: Pixel) {
        let cells = self.sectors.entry(pixel.sector).or_default();
        if pixel.color == BACKGROUND {
            cells.remove(&pixel.local);
        } else {
            cells.insert(pixel.local, pixel.color);
        }
    }

    pub fn set_active(&mut self, sector: SectorCoord) {
        self.active.insert(sector);
    }

    pub fn pixel_count(&self, sector: SectorCoord) -> u32 {
        self.sectors.get(&sector).map_or(0, |cells| cells.len() as u32)
    }
}

impl CanvasStore for MemoryStore {
    fn load_pixels_in_rect(&self, rect: &SectorRect) -> Vec<Pixel> {
        self.sectors
            .iter()
            .filter(|(sector, _)| rect.contains(**sector))
            .flat_map(|(sector, cells)| {
                cells
                    .iter()
                    .map(move |(local, color)| Pixel::new(*sector, *local, *color))
            })
            .collect()
    }

    fn load_sector_states(&self) -> Vec<SectorSnapshot> {
        let sectors: BTreeSet<_> = self.sectors.keys().chain(self.active.iter()).copied().collect();
        sectors
            .into_iter()
            .map(|sector| SectorSnapshot {
                sector,
                pixel_count: self.pixel_count(sector),
                active: self.active.contains(&sector),
            })
            .collect()
    }

    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Pixel> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }
}
