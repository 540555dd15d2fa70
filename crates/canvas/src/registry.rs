//! Sector registry and the frontier expansion state machine.
//!
//! A sector is `Unknown` until first referenced, then `Inactive` (known but
//! locked) or `Active` (drawable). Activation is one-way: nothing in this module
//! ever clears the active flag, so the active set only grows.

use std::collections::HashMap;

use codec::SECTOR_CELLS;
use tracing::debug;

use crate::bounds::SectorRect;
use crate::coords::{SectorCoord, world_to_sector};

/// Lifecycle of a sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectorState {
    Unknown,
    Inactive,
    Active,
}

/// Per-sector bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectorInfo {
    pub pixel_count: u32,
    pub active: bool,
}

/// A sector's state as reported by the external store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorSnapshot {
    pub sector: SectorCoord,
    pub pixel_count: u32,
    pub active: bool,
}

/// External count that disagreed with the local one. Local wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleSector {
    pub sector: SectorCoord,
    pub local_count: u32,
    pub external_count: u32,
}

/// When a filled sector opens its neighbours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpansionPolicy {
    /// Fill ratio in `(0, 1]`.
    pub threshold: f64,
    /// Absolute floor so tiny thresholds cannot expand near-empty sectors.
    pub min_pixels: u32,
}

impl ExpansionPolicy {
    pub fn new(threshold: f64, min_pixels: u32) -> Self {
        Self { threshold, min_pixels }
    }

    /// `ceil(S^2 * threshold)`
    pub fn threshold_pixels(&self) -> u32 {
        (SECTOR_CELLS as f64 * self.threshold).ceil() as u32
    }

    #[inline]
    pub fn should_expand(&self, pixel_count: u32) -> bool {
        pixel_count >= self.threshold_pixels() && pixel_count >= self.min_pixels
    }
}

impl Default for ExpansionPolicy {
    fn default() -> Self {
        Self::new(0.7, 16)
    }
}

/// Authoritative map of sector -> pixel count and active flag.
#[derive(Debug)]
pub struct SectorRegistry {
    sectors: HashMap<SectorCoord, SectorInfo>,
    policy: ExpansionPolicy,
    active_count: usize,
    origin_seeded: bool,
}

impl SectorRegistry {
    pub fn new(policy: ExpansionPolicy) -> Self {
        Self {
            sectors: HashMap::new(),
            policy,
            active_count: 0,
            origin_seeded: false,
        }
    }

    pub fn policy(&self) -> &ExpansionPolicy {
        &self.policy
    }

    /// Activate the origin sector. Only the first call has any effect.
    pub fn seed_origin(&mut self) -> bool {
        if self.origin_seeded {
            debug!("Origin already seeded");
            return false;
        }
        self.origin_seeded = true;
        self.activate(SectorCoord::ORIGIN);
        true
    }

    /// Mark a sector active. Returns true if it was not active before.
    pub fn activate(&mut self, sector: SectorCoord) -> bool {
        let info = self.sectors.entry(sector).or_default();
        if info.active {
            return false;
        }
        info.active = true;
        self.active_count += 1;
        true
    }

    /// Count one genuinely new (previously empty) cell.
    pub fn increment_count(&mut self, sector: SectorCoord) -> u32 {
        let info = self.sectors.entry(sector).or_default();
        info.pixel_count = (info.pixel_count + 1).min(SECTOR_CELLS as u32);
        info.pixel_count
    }

    /// Count a new cell, then check for expansion.
    pub fn record_pixel_write(&mut self, sector: SectorCoord) -> bool {
        self.increment_count(sector);
        self.maybe_expand(sector)
    }

    /// A non-empty cell was erased. Never deactivates anything.
    pub fn record_pixel_cleared(&mut self, sector: SectorCoord) -> u32 {
        let info = self.sectors.entry(sector).or_default();
        info.pixel_count = info.pixel_count.saturating_sub(1);
        info.pixel_count
    }

    /// Activate the Moore neighbours of a sector that reached the threshold.
    /// Returns whether any sector was newly activated.
    pub fn maybe_expand(&mut self, sector: SectorCoord) -> bool {
        let count = self.pixel_count(sector);
        if !self.policy.should_expand(count) {
            return false;
        }

        let mut opened = 0usize;
        for neighbor in sector.neighbors() {
            if self.activate(neighbor) {
                opened += 1;
            }
        }
        if opened > 0 {
            debug!(
                "Sector {} expanded at {} pixels: {} neighbours opened ({} active)",
                sector, count, opened, self.active_count
            );
        }
        opened > 0
    }

    /// Overwrite the stored count with a verified live count.
    /// Returns the previous count if it differed.
    pub fn correct_count(&mut self, sector: SectorCoord, live: u32) -> Option<u32> {
        let info = self.sectors.entry(sector).or_default();
        if info.pixel_count == live {
            return None;
        }
        let previous = info.pixel_count;
        info.pixel_count = live;
        Some(previous)
    }

    /// Merge external sector states.
    ///
    /// Unknown sectors adopt the external values. For known sectors the local
    /// count is kept and disagreements are returned; external activations are
    /// adopted since activation can only grow.
    pub fn reconcile(&mut self, snapshots: &[SectorSnapshot]) -> Vec<StaleSector> {
        let mut stale = Vec::new();
        for snapshot in snapshots {
            match self.sectors.get(&snapshot.sector).copied() {
                None => {
                    self.sectors.insert(
                        snapshot.sector,
                        SectorInfo {
                            pixel_count: snapshot.pixel_count.min(SECTOR_CELLS as u32),
                            active: false,
                        },
                    );
                }
                Some(local) if local.pixel_count != snapshot.pixel_count => {
                    debug!(
                        "Stale external state for {}: local {} vs external {}",
                        snapshot.sector, local.pixel_count, snapshot.pixel_count
                    );
                    stale.push(StaleSector {
                        sector: snapshot.sector,
                        local_count: local.pixel_count,
                        external_count: snapshot.pixel_count,
                    });
                }
                Some(_) => {}
            }
            if snapshot.active {
                self.activate(snapshot.sector);
            }
        }
        stale
    }

    pub fn state(&self, sector: SectorCoord) -> SectorState {
        match self.sectors.get(&sector) {
            None => SectorState::Unknown,
            Some(info) if info.active => SectorState::Active,
            Some(_) => SectorState::Inactive,
        }
    }

    #[inline]
    pub fn info(&self, sector: SectorCoord) -> Option<&SectorInfo> {
        self.sectors.get(&sector)
    }

    #[inline]
    pub fn is_active(&self, sector: SectorCoord) -> bool {
        self.sectors.get(&sector).is_some_and(|info| info.active)
    }

    /// Whether the world pixel lies in an active sector.
    pub fn is_drawable(&self, wx: i64, wy: i64) -> bool {
        let (sector, _) = world_to_sector(wx, wy);
        self.is_active(sector)
    }

    #[inline]
    pub fn pixel_count(&self, sector: SectorCoord) -> u32 {
        self.sectors.get(&sector).map_or(0, |info| info.pixel_count)
    }

    /// Fill ratio in `[0, 1]`.
    pub fn fill_ratio(&self, sector: SectorCoord) -> f64 {
        self.pixel_count(sector) as f64 / SECTOR_CELLS as f64
    }

    /// Active sectors, row-major.
    pub fn active_sectors(&self) -> Vec<SectorCoord> {
        let mut active: Vec<_> = self
            .sectors
            .iter()
            .filter(|(_, info)| info.active)
            .map(|(sector, _)| *sector)
            .collect();
        active.sort();
        active
    }

    pub fn active_len(&self) -> usize {
        self.active_count
    }

    /// Number of known (inactive or active) sectors.
    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    /// Known sectors with their info, unordered.
    pub fn iter(&self) -> impl Iterator<Item = (&SectorCoord, &SectorInfo)> {
        self.sectors.iter()
    }

    /// Known sectors inside `rect`, row-major.
    pub fn known_in(&self, rect: &SectorRect) -> Vec<SectorCoord> {
        if rect.len() <= self.sectors.len() as u64 {
            return rect
                .iter_row_major()
                .filter(|sector| self.sectors.contains_key(sector))
                .collect();
        }
        let mut sectors: Vec<_> = self
            .sectors
            .keys()
            .copied()
            .filter(|sector| rect.contains(*sector))
            .collect();
        sectors.sort();
        sectors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SectorRegistry {
        let mut registry = SectorRegistry::new(ExpansionPolicy::default());
        registry.seed_origin();
        registry
    }

    fn fill(registry: &mut SectorRegistry, sector: SectorCoord, n: u32) -> bool {
        let mut expanded = false;
        for _ in 0..n {
            expanded |= registry.record_pixel_write(sector);
        }
        expanded
    }

    #[test]
    fn test_seed_origin_once() {
        let mut registry = SectorRegistry::new(ExpansionPolicy::default());
        assert_eq!(registry.state(SectorCoord::ORIGIN), SectorState::Unknown);
        assert!(registry.seed_origin());
        assert!(!registry.seed_origin());
        assert_eq!(registry.state(SectorCoord::ORIGIN), SectorState::Active);
        assert_eq!(registry.active_len(), 1);
    }

    #[test]
    fn test_threshold_pixels() {
        assert_eq!(ExpansionPolicy::default().threshold_pixels(), 45876);
        assert_eq!(ExpansionPolicy::new(1.0, 16).threshold_pixels(), 65536);
    }

    #[test]
    fn test_expansion_at_exact_threshold() {
        let mut registry = registry();
        assert!(!fill(&mut registry, SectorCoord::ORIGIN, 45875));
        for n in SectorCoord::ORIGIN.neighbors() {
            assert_eq!(registry.state(n), SectorState::Unknown);
        }

        assert!(registry.record_pixel_write(SectorCoord::ORIGIN));
        for n in SectorCoord::ORIGIN.neighbors() {
            assert_eq!(registry.state(n), SectorState::Active);
        }
        assert_eq!(registry.state(SectorCoord::ORIGIN), SectorState::Active);
        assert_eq!(registry.state(SectorCoord::new(2, 2)), SectorState::Unknown);
        assert_eq!(registry.active_len(), 9);

        // Further writes do not open anything new.
        assert!(!registry.record_pixel_write(SectorCoord::ORIGIN));
    }

    #[test]
    fn test_min_pixels_guard() {
        let mut registry = SectorRegistry::new(ExpansionPolicy::new(0.0001, 16));
        registry.seed_origin();
        // threshold_pixels is 7 but the floor is 16.
        assert!(!fill(&mut registry, SectorCoord::ORIGIN, 15));
        assert!(registry.record_pixel_write(SectorCoord::ORIGIN));
    }

    #[test]
    fn test_one_ring_per_crossing() {
        let mut registry = SectorRegistry::new(ExpansionPolicy::new(0.0001, 1));
        registry.seed_origin();
        assert!(fill(&mut registry, SectorCoord::ORIGIN, 7));
        // Neighbours were opened but are empty, so they do not cascade.
        assert_eq!(registry.active_len(), 9);
        assert_eq!(registry.state(SectorCoord::new(2, 0)), SectorState::Unknown);
    }

    #[test]
    fn test_active_set_is_monotonic() {
        let mut registry = SectorRegistry::new(ExpansionPolicy::new(0.001, 1));
        registry.seed_origin();
        let mut previous = registry.active_sectors();
        let targets = [
            SectorCoord::new(0, 0),
            SectorCoord::new(1, 0),
            SectorCoord::new(-1, -1),
            SectorCoord::new(7, 7),
        ];
        for round in 0..200u32 {
            let sector = targets[(round % targets.len() as u32) as usize];
            if round % 3 == 0 {
                registry.record_pixel_cleared(sector);
            } else {
                registry.record_pixel_write(sector);
            }
            let current = registry.active_sectors();
            assert!(previous.iter().all(|s| current.contains(s)));
            previous = current;
        }
    }

    #[test]
    fn test_is_drawable_negative_world() {
        let mut registry = registry();
        assert!(registry.is_drawable(0, 255));
        assert!(!registry.is_drawable(-1, 0));
        registry.activate(SectorCoord::new(-1, 0));
        assert!(registry.is_drawable(-1, 0));
        assert!(registry.is_drawable(-256, 255));
        assert!(!registry.is_drawable(-257, 0));
    }

    #[test]
    fn test_inactive_after_write() {
        let mut registry = registry();
        registry.record_pixel_write(SectorCoord::new(5, 5));
        assert_eq!(registry.state(SectorCoord::new(5, 5)), SectorState::Inactive);
        assert_eq!(registry.pixel_count(SectorCoord::new(5, 5)), 1);
    }

    #[test]
    fn test_reconcile_keeps_local_counts() {
        let mut registry = registry();
        fill(&mut registry, SectorCoord::ORIGIN, 10);
        let stale = registry.reconcile(&[
            SectorSnapshot { sector: SectorCoord::ORIGIN, pixel_count: 12, active: true },
            SectorSnapshot { sector: SectorCoord::new(3, 3), pixel_count: 40, active: true },
            SectorSnapshot { sector: SectorCoord::new(4, 4), pixel_count: 2, active: false },
        ]);
        assert_eq!(
            stale,
            vec![StaleSector { sector: SectorCoord::ORIGIN, local_count: 10, external_count: 12 }]
        );
        assert_eq!(registry.pixel_count(SectorCoord::ORIGIN), 10);
        assert_eq!(registry.pixel_count(SectorCoord::new(3, 3)), 40);
        assert_eq!(registry.state(SectorCoord::new(3, 3)), SectorState::Active);
        assert_eq!(registry.state(SectorCoord::new(4, 4)), SectorState::Inactive);
    }

    #[test]
    fn test_known_in_rect() {
        let mut registry = registry();
        registry.record_pixel_write(SectorCoord::new(1, -1));
        registry.record_pixel_write(SectorCoord::new(40, 40));
        // Small rect walks the rect, large rect walks the map.
        assert_eq!(registry.known_in(&SectorRect::new(0, -1, 0, 0)), vec![SectorCoord::ORIGIN]);
        assert_eq!(
            registry.known_in(&SectorRect::new(-10, -10, 10, 10)),
            vec![SectorCoord::new(1, -1), SectorCoord::ORIGIN]
        );
    }

    #[test]
    fn test_correct_count() {
        let mut registry = registry();
        fill(&mut registry, SectorCoord::ORIGIN, 5);
        assert_eq!(registry.correct_count(SectorCoord::ORIGIN, 5), None);
        assert_eq!(registry.correct_count(SectorCoord::ORIGIN, 3), Some(5));
        assert_eq!(registry.pixel_count(SectorCoord::ORIGIN), 3);
    }
}
