//! LOD blob cache.
//!
//! Encoded blobs are keyed by `(sector, level)` and bounded by entry count with
//! least-recently-used eviction. Eviction only costs regeneration time; it never
//! affects what is drawn.
//!
//! Staleness:
//! - Every sector has a generation counter bumped by [`LodCache::invalidate`].
//! - Jobs carry the generation their snapshot was taken at, and completions from
//!   an older generation are discarded instead of cached.

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;
use codec::{CodecError, ColorIndex, LodLevel, LodPyramid, SECTOR_CELLS, decode_level, rle};
use tracing::{debug, warn};

use crate::coords::SectorCoord;
use crate::offload::{EncodeJob, EncodedLod, LodEncoder, Submitted};
use crate::pixels::PixelStore;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LodKey {
    pub sector: SectorCoord,
    pub level: LodLevel,
}

impl LodKey {
    pub fn new(sector: SectorCoord, level: LodLevel) -> Self {
        Self { sector, level }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    blob: Bytes,
    last_used_tick: u64,
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LodCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub corrupt: u64,
    pub stale_completions: u64,
    pub generated: u64,
}

/// Per-sector, per-level store of encoded LOD blobs.
#[derive(Debug)]
pub struct LodCache {
    capacity: usize,
    tick: u64,
    entries: HashMap<LodKey, Entry>,
    recency: BTreeMap<u64, LodKey>,
    generations: HashMap<SectorCoord, u64>,
    /// Requests handed to an encoder, with the generation they were taken at.
    in_flight: HashMap<LodKey, u64>,
    stats: LodCacheStats,
}

impl LodCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tick: 0,
            entries: HashMap::with_capacity(capacity),
            recency: BTreeMap::new(),
            generations: HashMap::new(),
            in_flight: HashMap::new(),
            stats: LodCacheStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> LodCacheStats {
        self.stats
    }

    /// Current generation of a sector's pixels.
    #[inline]
    pub fn generation(&self, sector: SectorCoord) -> u64 {
        self.generations.get(&sector).copied().unwrap_or(0)
    }

    pub fn is_in_flight(&self, sector: SectorCoord, level: LodLevel) -> bool {
        self.in_flight.contains_key(&LodKey::new(sector, level))
    }

    /// Whether a blob is cached, without touching recency or stats.
    pub fn contains(&self, sector: SectorCoord, level: LodLevel) -> bool {
        self.entries.contains_key(&LodKey::new(sector, level))
    }

    /// Cached blob, or `None` on a miss.
    pub fn get(&mut self, sector: SectorCoord, level: LodLevel) -> Option<Bytes> {
        let key = LodKey::new(sector, level);
        match self.touch(&key) {
            Some(blob) => {
                self.stats.hits += 1;
                Some(blob)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Store a blob for the sector's current generation. Returns evicted keys.
    pub fn insert(&mut self, sector: SectorCoord, level: LodLevel, blob: Bytes) -> Vec<LodKey> {
        let key = LodKey::new(sector, level);
        self.tick += 1;
        if let Some(old) = self.entries.insert(
            key,
            Entry {
                blob,
                last_used_tick: self.tick,
            },
        ) {
            self.recency.remove(&old.last_used_tick);
        }
        self.recency.insert(self.tick, key);
        self.evict_as_needed()
    }

    /// Drop every cached level of a sector and supersede in-flight work for it.
    pub fn invalidate(&mut self, sector: SectorCoord) {
        *self.generations.entry(sector).or_insert(0) += 1;
        for level in LodLevel::ALL {
            let key = LodKey::new(sector, level);
            if let Some(entry) = self.entries.remove(&key) {
                self.recency.remove(&entry.last_used_tick);
            }
            self.in_flight.remove(&key);
        }
    }

    /// Accept a completed encode. Returns true if it was cached.
    pub fn absorb(&mut self, encoded: EncodedLod) -> bool {
        let key = LodKey::new(encoded.sector, encoded.level);
        if self.in_flight.get(&key) == Some(&encoded.generation) {
            self.in_flight.remove(&key);
        }
        if encoded.generation != self.generation(encoded.sector) {
            self.stats.stale_completions += 1;
            debug!(
                "Discarding stale {} blob for sector {} (generation {} < {})",
                encoded.level,
                encoded.sector,
                encoded.generation,
                self.generation(encoded.sector)
            );
            return false;
        }
        match encoded.result {
            Ok(blob) => {
                self.stats.generated += 1;
                self.insert(encoded.sector, encoded.level, blob);
                true
            }
            Err(err) => {
                warn!("Failed to encode {} for sector {}: {}", encoded.level, encoded.sector, err);
                false
            }
        }
    }

    /// Regenerate a missing level through `encoder`.
    ///
    /// Returns the blob when the encoder completes synchronously; otherwise the
    /// request stays in flight and `None` is returned. Duplicate requests for the
    /// same key and generation are not resubmitted.
    pub fn request(
        &mut self,
        sector: SectorCoord,
        level: LodLevel,
        pixels: &PixelStore,
        encoder: &mut dyn LodEncoder,
    ) -> Option<Bytes> {
        let key = LodKey::new(sector, level);
        let generation = self.generation(sector);
        if self.in_flight.get(&key) == Some(&generation) {
            return None;
        }

        let Some(cells) = pixels.snapshot(sector) else {
            // Nothing resident: the sector is empty at every level.
            let blob = empty_blob(level);
            self.insert(sector, level, blob.clone());
            return Some(blob);
        };

        let job = EncodeJob {
            sector,
            level,
            generation,
            cells: cells.into(),
        };
        match encoder.submit(job) {
            Submitted::Ready(encoded) => {
                let blob = encoded.result.clone().ok();
                self.absorb(encoded);
                blob
            }
            Submitted::Pending => {
                self.in_flight.insert(key, generation);
                None
            }
        }
    }

    /// Synchronous read-through: cached blob or a freshly encoded one.
    pub fn get_or_generate(
        &mut self,
        sector: SectorCoord,
        level: LodLevel,
        pixels: &PixelStore,
    ) -> Result<Bytes, CodecError> {
        if let Some(blob) = self.get(sector, level) {
            return Ok(blob);
        }
        let blob = match pixels.sector(sector) {
            Some(grid) => codec::encode_level(grid.cells(), level)?,
            None => empty_blob(level),
        };
        self.stats.generated += 1;
        self.insert(sector, level, blob.clone());
        Ok(blob)
    }

    /// Decoded cells for a cached level. Corrupt blobs are dropped and
    /// reported as a miss so the caller regenerates them.
    pub fn decode(&mut self, sector: SectorCoord, level: LodLevel) -> Option<Vec<ColorIndex>> {
        let blob = self.get(sector, level)?;
        self.decode_blob(sector, level, &blob)
    }

    /// Nearest cached level coarser than `level`, decoded.
    pub fn coarser_fallback(&mut self, sector: SectorCoord, level: LodLevel) -> Option<(LodLevel, Vec<ColorIndex>)> {
        let mut candidate = level.coarser();
        while let Some(coarser) = candidate {
            let key = LodKey::new(sector, coarser);
            if let Some(blob) = self.touch(&key) {
                if let Some(cells) = self.decode_blob(sector, coarser, &blob) {
                    return Some((coarser, cells));
                }
            }
            candidate = coarser.coarser();
        }
        None
    }

    /// Schedule encoding of `levels` for sectors that have no cached blob yet.
    pub fn prefetch(
        &mut self,
        sectors: &[SectorCoord],
        levels: &[LodLevel],
        pixels: &PixelStore,
        encoder: &mut dyn LodEncoder,
    ) -> usize {
        let mut scheduled = 0;
        for &sector in sectors {
            for &level in levels {
                if self.contains(sector, level) || self.is_in_flight(sector, level) {
                    continue;
                }
                self.request(sector, level, pixels, encoder);
                scheduled += 1;
            }
        }
        scheduled
    }

    /// Encode all four levels of a resident sector in one pass, replacing
    /// whatever was cached. Returns the encoded size in bytes.
    pub fn warm(&mut self, sector: SectorCoord, pixels: &PixelStore) -> Result<usize, CodecError> {
        let Some(grid) = pixels.sector(sector) else {
            return Ok(0);
        };
        let pyramid = LodPyramid::build(grid.cells())?;
        for level in LodLevel::ALL {
            self.insert(sector, level, pyramid.level(level).clone());
            self.in_flight.remove(&LodKey::new(sector, level));
        }
        self.stats.generated += LodLevel::ALL.len() as u64;
        debug!("Warmed sector {}: {} bytes across levels", sector, pyramid.encoded_bytes());
        Ok(pyramid.encoded_bytes())
    }

    fn decode_blob(&mut self, sector: SectorCoord, level: LodLevel, blob: &[u8]) -> Option<Vec<ColorIndex>> {
        match decode_level(blob, level) {
            Ok(cells) => Some(cells),
            Err(err) => {
                warn!("Dropping corrupt {} blob for sector {}: {}", level, sector, err);
                self.stats.corrupt += 1;
                let key = LodKey::new(sector, level);
                if let Some(entry) = self.entries.remove(&key) {
                    self.recency.remove(&entry.last_used_tick);
                }
                None
            }
        }
    }

    fn touch(&mut self, key: &LodKey) -> Option<Bytes> {
        let entry = self.entries.get_mut(key)?;
        self.recency.remove(&entry.last_used_tick);
        self.tick += 1;
        entry.last_used_tick = self.tick;
        self.recency.insert(self.tick, *key);
        Some(entry.blob.clone())
    }

    fn evict_as_needed(&mut self) -> Vec<LodKey> {
        let mut evicted = Vec::new();
        while self.entries.len() > self.capacity {
            let Some((_, key)) = self.recency.pop_first() else {
                break;
            };
            self.entries.remove(&key);
            self.stats.evictions += 1;
            evicted.push(key);
        }
        evicted
    }
}

fn empty_blob(level: LodLevel) -> Bytes {
    debug_assert!(level.cells() <= SECTOR_CELLS);
    rle::encode(&vec![codec::BACKGROUND; level.cells()])
}
