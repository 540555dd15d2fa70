//! Canvas configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub sector: SectorConfig,
    #[serde(default)]
    pub viewport: ViewportConfig,
    #[serde(default)]
    pub lod: LodConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Config {
    /// Load configuration from `path`, writing a default file if it is missing.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::from_toml_str(&contents)
        } else {
            info!("No {} found, creating default config", path.display());
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the core cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let threshold = self.sector.expansion_threshold;
        anyhow::ensure!(
            threshold > 0.0 && threshold <= 1.0,
            "sector.expansion_threshold must be in (0, 1], got {threshold}"
        );
        anyhow::ensure!(
            self.viewport.min_scale > 0.0 && self.viewport.min_scale <= self.viewport.max_scale,
            "viewport scale range [{}, {}] is invalid",
            self.viewport.min_scale,
            self.viewport.max_scale
        );
        anyhow::ensure!(self.viewport.pixel_size > 0.0, "viewport.pixel_size must be positive");
        anyhow::ensure!(self.lod.cache_capacity > 0, "lod.cache_capacity must be positive");
        anyhow::ensure!(self.render.pixel_budget > 0, "render.pixel_budget must be positive");
        anyhow::ensure!(self.render.sector_budget > 0, "render.sector_budget must be positive");
        anyhow::ensure!(self.render.heatmap_tile_px > 0, "render.heatmap_tile_px must be positive");
        anyhow::ensure!(
            !self.render.palette.is_empty() && self.render.palette.len() <= 256,
            "render.palette must hold 1..=256 colors"
        );
        Ok(())
    }
}

/// Sector activation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SectorConfig {
    /// Fill ratio at which a sector opens its neighbours.
    #[serde(default = "default_expansion_threshold")]
    pub expansion_threshold: f64,
    /// Minimum pixel count before any expansion, whatever the threshold.
    #[serde(default = "default_min_expand_pixels")]
    pub min_expand_pixels: u32,
    /// Minimum spacing between viewport-triggered expansion checks.
    #[serde(default = "default_expansion_debounce_ms")]
    pub expansion_debounce_ms: u64,
}

impl Default for SectorConfig {
    fn default() -> Self {
        Self {
            expansion_threshold: default_expansion_threshold(),
            min_expand_pixels: default_min_expand_pixels(),
            expansion_debounce_ms: default_expansion_debounce_ms(),
        }
    }
}

fn default_expansion_threshold() -> f64 {
    0.7
}
fn default_min_expand_pixels() -> u32 {
    16
}
fn default_expansion_debounce_ms() -> u64 {
    1000
}

/// Initial viewport and zoom limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ViewportConfig {
    #[serde(default = "default_min_scale")]
    pub min_scale: f64,
    #[serde(default = "default_max_scale")]
    pub max_scale: f64,
    /// Screen pixels per world pixel at scale 1.
    #[serde(default = "default_pixel_size")]
    pub pixel_size: f64,
    #[serde(default = "default_initial_scale")]
    pub initial_scale: f64,
    #[serde(default = "default_canvas_width")]
    pub canvas_width: u32,
    #[serde(default = "default_canvas_height")]
    pub canvas_height: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
            pixel_size: default_pixel_size(),
            initial_scale: default_initial_scale(),
            canvas_width: default_canvas_width(),
            canvas_height: default_canvas_height(),
        }
    }
}

fn default_min_scale() -> f64 {
    0.05
}
fn default_max_scale() -> f64 {
    16.0
}
fn default_pixel_size() -> f64 {
    1.0
}
fn default_initial_scale() -> f64 {
    1.0
}
fn default_canvas_width() -> u32 {
    800
}
fn default_canvas_height() -> u32 {
    600
}

/// Where LOD encoding runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OffloadMode {
    /// Encode on the render timeline.
    #[default]
    Inline,
    /// Encode on tokio's blocking pool.
    Tokio,
}

/// LOD cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LodConfig {
    /// Maximum number of cached `(sector, level)` blobs.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default)]
    pub offload: OffloadMode,
    /// Encode all levels for occupied sectors as soon as they are loaded.
    #[serde(default = "default_prefetch_on_load")]
    pub prefetch_on_load: bool,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            offload: OffloadMode::default(),
            prefetch_on_load: default_prefetch_on_load(),
        }
    }
}

fn default_cache_capacity() -> usize {
    500
}
fn default_prefetch_on_load() -> bool {
    true
}

/// Render-mode thresholds, budgets and colors.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderConfig {
    #[serde(default = "default_pixel_perfect_min_scale")]
    pub pixel_perfect_min_scale: f64,
    #[serde(default = "default_scaled_pixel_min_scale")]
    pub scaled_pixel_min_scale: f64,
    #[serde(default = "default_sector_block_min_scale")]
    pub sector_block_min_scale: f64,
    /// Pixels drawable per frame in the pixel modes.
    #[serde(default = "default_pixel_budget")]
    pub pixel_budget: u32,
    /// Sectors drawable per frame in sector-block mode.
    #[serde(default = "default_sector_budget")]
    pub sector_budget: u32,
    /// Screen-space tile side for the heat map.
    #[serde(default = "default_heatmap_tile_px")]
    pub heatmap_tile_px: u32,
    /// Backdrop of active (drawable) sectors with no pixels yet.
    #[serde(default = "default_frontier")]
    pub frontier: String,
    /// Palette as `#rrggbb` strings; index 0 is the empty cell.
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            pixel_perfect_min_scale: default_pixel_perfect_min_scale(),
            scaled_pixel_min_scale: default_scaled_pixel_min_scale(),
            sector_block_min_scale: default_sector_block_min_scale(),
            pixel_budget: default_pixel_budget(),
            sector_budget: default_sector_budget(),
            heatmap_tile_px: default_heatmap_tile_px(),
            frontier: default_frontier(),
            palette: default_palette(),
        }
    }
}

fn default_pixel_perfect_min_scale() -> f64 {
    2.0
}
fn default_scaled_pixel_min_scale() -> f64 {
    0.5
}
fn default_sector_block_min_scale() -> f64 {
    0.1
}
fn default_pixel_budget() -> u32 {
    250_000
}
fn default_sector_budget() -> u32 {
    4_096
}
fn default_heatmap_tile_px() -> u32 {
    16
}
fn default_frontier() -> String {
    "#f6f7f9".to_string()
}
fn default_palette() -> Vec<String> {
    [
        "#ffffff", "#e4e4e4", "#888888", "#222222", "#ffa7d1", "#e50000", "#e59500", "#a06a42",
        "#e5d900", "#94e044", "#02be01", "#00d3dd", "#0083c7", "#0000ea", "#cf6ee4", "#820080",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Settings for the headless driver.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Frames to run before exiting (0 = run until interrupted).
    #[serde(default = "default_frames")]
    pub frames: u64,
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    /// Local writes per frame.
    #[serde(default = "default_local_writes_per_frame")]
    pub local_writes_per_frame: u32,
    /// Writes pushed through the remote feed per frame.
    #[serde(default = "default_remote_writes_per_frame")]
    pub remote_writes_per_frame: u32,
    #[serde(default)]
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            frames: default_frames(),
            frame_interval_ms: default_frame_interval_ms(),
            local_writes_per_frame: default_local_writes_per_frame(),
            remote_writes_per_frame: default_remote_writes_per_frame(),
            seed: 0,
        }
    }
}

fn default_frames() -> u64 {
    600
}
fn default_frame_interval_ms() -> u64 {
    16
}
fn default_local_writes_per_frame() -> u32 {
    400
}
fn default_remote_writes_per_frame() -> u32 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.sector.expansion_threshold, 0.7);
        assert_eq!(config.lod.cache_capacity, 500);
        assert_eq!(config.render.palette.len(), 16);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = Config::from_toml_str(
            r#"
            [sector]
            expansion_threshold = 0.5

            [lod]
            offload = "tokio"
            "#,
        )
        .unwrap();
        assert_eq!(config.sector.expansion_threshold, 0.5);
        assert_eq!(config.sector.min_expand_pixels, 16);
        assert_eq!(config.lod.offload, OffloadMode::Tokio);
        assert_eq!(config.viewport.max_scale, 16.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::from_toml_str("[sector]\nexpansion_threshold = 0.0").is_err());
        assert!(Config::from_toml_str("[viewport]\nmin_scale = 4.0\nmax_scale = 2.0").is_err());
        assert!(Config::from_toml_str("[lod]\ncache_capacity = 0").is_err());
        assert!(Config::from_toml_str("[render]\npalette = []").is_err());
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let config = Config::from_toml_str(&text).unwrap();
        assert_eq!(config.render.heatmap_tile_px, 16);
    }
}
