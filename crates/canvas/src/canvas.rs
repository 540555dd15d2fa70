//! The canvas core.
//!
//! Owns every piece of sector state and is the single entry point for pixel
//! writes, so a sector's grid, count, cached levels and activation are always
//! updated together. Per write, in order:
//! 1. pixel grid
//! 2. registry count
//! 3. LOD invalidation
//! 4. expansion check

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use codec::LodLevel;
use glam::DVec2;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::bounds::{SectorRect, ViewportBoundsCache, VisibleBounds};
use crate::config::{Config, OffloadMode};
use crate::coords::{Pixel, SectorCoord};
use crate::error::CanvasError;
use crate::expansion::{CheckSkipped, ExpansionGuard};
use crate::lod::LodCache;
use crate::offload::{InlineEncoder, LodEncoder, TokioEncoder};
use crate::palette::Palette;
use crate::pixels::{PixelStore, WriteEffect};
use crate::registry::{ExpansionPolicy, SectorRegistry, StaleSector};
use crate::render::{FrameInput, PaintSurface, RenderStats, TileRenderer};
use crate::store::CanvasStore;
use crate::viewport::{Viewport, ViewportChange, ViewportController};

/// Where a write came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOrigin {
    /// This user; only allowed inside active sectors.
    Local,
    /// Another client, already accepted upstream.
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub effect: WriteEffect,
    /// The write opened new sectors.
    pub expanded: bool,
}

pub struct Canvas {
    config: Config,
    palette: Palette,
    registry: SectorRegistry,
    pixels: PixelStore,
    lod: LodCache,
    bounds: ViewportBoundsCache,
    viewport: ViewportController,
    guard: Arc<ExpansionGuard>,
    encoder: Box<dyn LodEncoder>,
    renderer: TileRenderer,
}

impl Canvas {
    /// Build a canvas with the encoder named by `config.lod.offload`.
    pub fn new(config: Config) -> Self {
        let encoder: Box<dyn LodEncoder> = match config.lod.offload {
            OffloadMode::Inline => Box::new(InlineEncoder),
            OffloadMode::Tokio => match Handle::try_current() {
                Ok(handle) => Box::new(TokioEncoder::new(handle)),
                Err(_) => {
                    warn!("No tokio runtime available, encoding LOD levels inline");
                    Box::new(InlineEncoder)
                }
            },
        };
        Self::with_encoder(config, encoder)
    }

    pub fn with_encoder(config: Config, encoder: Box<dyn LodEncoder>) -> Self {
        let mut registry = SectorRegistry::new(ExpansionPolicy::new(
            config.sector.expansion_threshold,
            config.sector.min_expand_pixels,
        ));
        registry.seed_origin();

        let vp = &config.viewport;
        let initial = Viewport::new(vp.initial_scale, DVec2::ZERO, vp.canvas_width, vp.canvas_height, vp.pixel_size);

        Self {
            palette: Palette::from_hex(&config.render.palette),
            registry,
            pixels: PixelStore::new(),
            lod: LodCache::new(config.lod.cache_capacity),
            bounds: ViewportBoundsCache::new(),
            viewport: ViewportController::new(initial, vp.min_scale, vp.max_scale),
            guard: ExpansionGuard::new(Duration::from_millis(config.sector.expansion_debounce_ms)),
            encoder,
            renderer: TileRenderer::new(&config.render),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn registry(&self) -> &SectorRegistry {
        &self.registry
    }

    pub fn pixels(&self) -> &PixelStore {
        &self.pixels
    }

    pub fn lod(&self) -> &LodCache {
        &self.lod
    }

    pub fn renderer(&self) -> &TileRenderer {
        &self.renderer
    }

    pub fn bounds_cache(&self) -> &ViewportBoundsCache {
        &self.bounds
    }

    pub fn expansion_guard(&self) -> &Arc<ExpansionGuard> {
        &self.guard
    }

    /// Encodes handed off and not yet collected.
    pub fn pending_encodes(&self) -> usize {
        self.encoder.pending()
    }

    /// Apply one pixel write.
    pub fn record_pixel_write(&mut self, pixel: Pixel, origin: WriteOrigin) -> Result<WriteOutcome, CanvasError> {
        if !pixel.local.in_range() {
            return Err(CanvasError::LocalOutOfRange {
                x: pixel.local.x,
                y: pixel.local.y,
            });
        }
        self.palette.check(pixel.color)?;
        if origin == WriteOrigin::Local && !self.registry.is_active(pixel.sector) {
            return Err(CanvasError::SectorLocked(pixel.sector));
        }

        let sector = pixel.sector;
        // A grid first created here holds everything the sector has only if
        // nothing was counted for it before.
        let complete_if_new = self.registry.pixel_count(sector) == 0;
        let effect = self.pixels.write(&pixel, complete_if_new);

        match effect {
            WriteEffect::Added => {
                self.registry.increment_count(sector);
            }
            WriteEffect::Cleared => {
                self.registry.record_pixel_cleared(sector);
            }
            WriteEffect::Overwritten | WriteEffect::Unchanged => {}
        }

        if effect.is_change() {
            self.lod.invalidate(sector);
        }

        let expanded = if effect == WriteEffect::Added {
            self.verify_count(sector);
            self.registry.maybe_expand(sector)
        } else {
            false
        };

        Ok(WriteOutcome { effect, expanded })
    }

    pub fn viewport(&self) -> &Viewport {
        self.viewport.viewport()
    }

    /// Apply an input change; invalid results keep the previous viewport.
    pub fn apply_viewport_change(&mut self, change: ViewportChange) -> Result<(), CanvasError> {
        self.viewport.apply(change)
    }

    pub fn visible_bounds(&mut self) -> VisibleBounds {
        self.bounds.compute_visible_bounds(self.viewport.viewport())
    }

    /// Re-check every known sector in view for expansion.
    ///
    /// Dropped without queueing if a check is running or one ran within the
    /// debounce window. Returns the number of sectors that opened neighbours.
    pub fn request_expansion_check(&mut self, now: Instant) -> Result<usize, CheckSkipped> {
        let _ticket = self.guard.try_begin(now)?;
        let rect = self.visible_bounds().unpadded_sectors();

        let mut expanded = 0;
        for sector in self.registry.known_in(&rect) {
            self.verify_count(sector);
            if self.registry.maybe_expand(sector) {
                expanded += 1;
            }
        }
        if expanded > 0 {
            debug!("Expansion check opened neighbours of {} sectors", expanded);
        }
        Ok(expanded)
    }

    /// Cache finished off-thread encodes. Returns how many were kept.
    pub fn absorb_completed(&mut self) -> usize {
        let mut kept = 0;
        for encoded in self.encoder.poll_completed() {
            if self.lod.absorb(encoded) {
                kept += 1;
            }
        }
        kept
    }

    /// Draw one frame.
    pub fn render_frame(&mut self, surface: &mut dyn PaintSurface) -> RenderStats {
        self.absorb_completed();
        let bounds = self.visible_bounds();
        let frame = FrameInput {
            viewport: self.viewport.viewport(),
            bounds: &bounds,
            registry: &self.registry,
            pixels: &self.pixels,
            palette: &self.palette,
        };
        self.renderer.render(&frame, &mut self.lod, self.encoder.as_mut(), surface)
    }

    /// Replace the grids of every stored sector in `rect` with the store's
    /// pixels. Returns the number of pixels loaded.
    pub fn load_region(&mut self, store: &dyn CanvasStore, rect: &SectorRect) -> usize {
        let mut by_sector: BTreeMap<SectorCoord, Vec<Pixel>> = BTreeMap::new();
        for pixel in store.load_pixels_in_rect(rect) {
            by_sector.entry(pixel.sector).or_default().push(pixel);
        }

        let mut loaded = 0;
        for (sector, pixels) in by_sector {
            let live = self.pixels.replace_sector(sector, pixels);
            loaded += live;
            if let Some(previous) = self.registry.correct_count(sector, live as u32) {
                debug!("Sector {} count {} replaced by loaded {}", sector, previous, live);
            }
            self.lod.invalidate(sector);
            self.registry.maybe_expand(sector);
            if self.config.lod.prefetch_on_load {
                self.lod
                    .prefetch(&[sector], &LodLevel::ALL[1..], &self.pixels, self.encoder.as_mut());
            }
        }
        loaded
    }

    /// Merge the store's sector states. Disagreeing counts are returned and
    /// the local counts kept.
    ///
    /// Sectors at or past the threshold open their neighbours here, whichever
    /// count was kept.
    pub fn load_sector_states(&mut self, store: &dyn CanvasStore) -> Vec<StaleSector> {
        let snapshots = store.load_sector_states();
        let stale = self.registry.reconcile(&snapshots);
        if !stale.is_empty() {
            warn!("{} sectors disagree with the store, keeping local counts", stale.len());
        }

        let mut expanded = 0;
        for snapshot in &snapshots {
            if self.registry.maybe_expand(snapshot.sector) {
                expanded += 1;
            }
        }
        if expanded > 0 {
            debug!("Loaded sector states opened neighbours of {} sectors", expanded);
        }
        stale
    }

    /// Encode every level of the resident sectors in view, ahead of the first
    /// frame. Returns the encoded size in bytes.
    pub fn warm_visible(&mut self) -> usize {
        let rect = self.visible_bounds().sectors;
        let mut bytes = 0;
        for sector in self.registry.known_in(&rect) {
            match self.lod.warm(sector, &self.pixels) {
                Ok(encoded) => bytes += encoded,
                Err(err) => warn!("Failed to warm sector {}: {}", sector, err),
            }
        }
        bytes
    }

    /// Apply every queued remote pixel. Returns how many were applied.
    pub fn drain_remote(&mut self, rx: &mut mpsc::UnboundedReceiver<Pixel>) -> usize {
        let mut applied = 0;
        while let Ok(pixel) = rx.try_recv() {
            match self.record_pixel_write(pixel, WriteOrigin::Remote) {
                Ok(_) => applied += 1,
                Err(err) => warn!("Dropping remote pixel {}: {}", pixel.key(), err),
            }
        }
        applied
    }

    /// Pull the registry count back to the live count of a complete grid.
    fn verify_count(&mut self, sector: SectorCoord) {
        let Some(grid) = self.pixels.sector(sector) else {
            return;
        };
        if !grid.is_complete() {
            return;
        }
        let live = grid.live_count() as u32;
        if let Some(previous) = self.registry.correct_count(sector, live) {
            warn!("Sector {} count drifted: {} -> {}", sector, previous, live);
        }
    }
}
