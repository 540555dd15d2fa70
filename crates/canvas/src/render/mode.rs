//! Render-mode selection.

use codec::{LodLevel, SECTOR_CELLS};

use crate::bounds::{SectorRect, VisibleBounds, WorldRect};
use crate::config::RenderConfig;
use crate::registry::SectorRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Every pixel at native size.
    PixelPerfect,
    /// LOD cells as scaled rects, batched by color.
    ScaledPixel,
    /// One rect per sector.
    SectorBlock,
    /// Fixed screen tiles colored by aggregate density.
    TileHeatmap,
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RenderMode::PixelPerfect => "pixel-perfect",
            RenderMode::ScaledPixel => "scaled-pixel",
            RenderMode::SectorBlock => "sector-block",
            RenderMode::TileHeatmap => "tile-heatmap",
        };
        f.write_str(name)
    }
}

/// Scale thresholds and per-frame budgets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeThresholds {
    pub pixel_perfect_min_scale: f64,
    pub scaled_pixel_min_scale: f64,
    pub sector_block_min_scale: f64,
    pub pixel_budget: u64,
    pub sector_budget: u64,
}

impl Default for ModeThresholds {
    fn default() -> Self {
        Self::from(&RenderConfig::default())
    }
}

impl From<&RenderConfig> for ModeThresholds {
    fn from(config: &RenderConfig) -> Self {
        Self {
            pixel_perfect_min_scale: config.pixel_perfect_min_scale,
            scaled_pixel_min_scale: config.scaled_pixel_min_scale,
            sector_block_min_scale: config.sector_block_min_scale,
            pixel_budget: config.pixel_budget as u64,
            sector_budget: config.sector_budget as u64,
        }
    }
}

/// Decision table, first match wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderModeSelector {
    thresholds: ModeThresholds,
}

impl RenderModeSelector {
    pub fn new(thresholds: ModeThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ModeThresholds {
        &self.thresholds
    }

    pub fn select(&self, scale: f64, estimated_pixels: u64, visible_sectors: u64) -> RenderMode {
        let t = &self.thresholds;
        if scale >= t.pixel_perfect_min_scale && estimated_pixels <= t.pixel_budget {
            RenderMode::PixelPerfect
        } else if scale >= t.scaled_pixel_min_scale && estimated_pixels <= t.pixel_budget {
            RenderMode::ScaledPixel
        } else if scale >= t.sector_block_min_scale && visible_sectors <= t.sector_budget {
            RenderMode::SectorBlock
        } else {
            RenderMode::TileHeatmap
        }
    }

    /// Estimate the inputs from registry counts and pick a mode.
    pub fn select_for(&self, scale: f64, bounds: &VisibleBounds, registry: &SectorRegistry) -> RenderMode {
        let sectors = bounds.unpadded_sectors().len();
        self.select(scale, estimate_visible_pixels(registry, bounds), sectors)
    }
}

/// Pixels expected on screen: each sector's count weighted by the share of
/// the sector inside the visible world rect.
pub fn estimate_visible_pixels(registry: &SectorRegistry, bounds: &VisibleBounds) -> u64 {
    let rect = bounds.unpadded_sectors();
    let weighted = |count: u32, world: WorldRect| {
        count as f64 * bounds.world.overlap_area(&world) / SECTOR_CELLS as f64
    };

    let total: f64 = if rect.len() > registry.len() as u64 {
        registry
            .iter()
            .filter(|(sector, info)| info.pixel_count > 0 && rect.contains(**sector))
            .map(|(sector, info)| weighted(info.pixel_count, SectorRect::single(*sector).world_rect()))
            .sum()
    } else {
        rect.iter_row_major()
            .map(|sector| (registry.pixel_count(sector), sector))
            .filter(|(count, _)| *count > 0)
            .map(|(count, sector)| weighted(count, SectorRect::single(sector).world_rect()))
            .sum()
    };
    total.ceil() as u64
}

/// Finest level whose cells are at least one screen pixel wide.
pub fn choose_lod_level(zoom: f64) -> LodLevel {
    LodLevel::ALL
        .into_iter()
        .find(|level| level.factor() as f64 * zoom >= 1.0)
        .unwrap_or(LodLevel::COARSEST)
}
