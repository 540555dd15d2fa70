//! Tile renderer.
//!
//! Turns the selected mode plus registry/pixel/LOD data into `fill_rect` calls.
//! Every rect is culled against the canvas before it reaches the surface, and
//! each frame draws at most its budget; the rest of the frame is skipped and
//! reported through [`RenderStats::truncated`].
//!
//! Draw order:
//! - Pixel-perfect: row-major per sector, sectors row-major.
//! - Scaled-pixel: batched by ascending color index, row-major within a color.
//! - Sector-block and heat map: row-major over the sector or tile grid.

use codec::{BACKGROUND, Color, ColorIndex, LodLevel, SECTOR_SIZE, decode_level, dominant_color};
use glam::DVec2;
use tracing::trace;

use crate::bounds::{SectorRect, VisibleBounds};
use crate::config::RenderConfig;
use crate::coords::{SectorCoord, world_to_screen};
use crate::lod::LodCache;
use crate::offload::LodEncoder;
use crate::palette::Palette;
use crate::pixels::{PixelStore, SectorPixels};
use crate::registry::SectorRegistry;
use crate::viewport::Viewport;

use super::budget::FrameBudget;
use super::mode::{ModeThresholds, RenderMode, RenderModeSelector, choose_lod_level};
use super::surface::PaintSurface;

const HEAT_COLD: Color = Color::new(0x2b, 0x83, 0xba);
const HEAT_MID: Color = Color::new(0xff, 0xff, 0xbf);
const HEAT_HOT: Color = Color::new(0xd7, 0x19, 0x1c);

/// Ink used for occupied sectors whose pixels are not resident.
const UNLOADED_INK: Color = Color::new(0x88, 0x88, 0x88);

/// Read-only view of the canvas state for one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    pub viewport: &'a Viewport,
    pub bounds: &'a VisibleBounds,
    pub registry: &'a SectorRegistry,
    pub pixels: &'a PixelStore,
    pub palette: &'a Palette,
}

/// What a frame did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStats {
    pub mode: RenderMode,
    /// Level drawn in scaled-pixel mode.
    pub lod_level: Option<LodLevel>,
    pub rects_drawn: u32,
    pub rects_culled: u32,
    pub sectors_visited: u32,
    pub lod_hits: u32,
    pub coarser_fallbacks: u32,
    pub direct_fallbacks: u32,
    /// The frame ran out of budget and skipped the remainder.
    pub truncated: bool,
}

impl RenderStats {
    pub fn new(mode: RenderMode) -> Self {
        Self {
            mode,
            lod_level: None,
            rects_drawn: 0,
            rects_culled: 0,
            sectors_visited: 0,
            lod_hits: 0,
            coarser_fallbacks: 0,
            direct_fallbacks: 0,
            truncated: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emit {
    Drawn,
    Culled,
    OverBudget,
}

/// Culling front of the paint surface.
struct Emitter<'s> {
    surface: &'s mut dyn PaintSurface,
    width: f64,
    height: f64,
    drawn: u32,
    culled: u32,
}

impl<'s> Emitter<'s> {
    fn new(surface: &'s mut dyn PaintSurface, viewport: &Viewport) -> Self {
        Self {
            surface,
            width: viewport.canvas_width as f64,
            height: viewport.canvas_height as f64,
            drawn: 0,
            culled: 0,
        }
    }

    #[inline]
    fn on_screen(&self, x: f64, y: f64, size: f64) -> bool {
        x + size > 0.0 && y + size > 0.0 && x < self.width && y < self.height
    }

    fn emit(&mut self, budget: Option<&mut FrameBudget>, x: f64, y: f64, size: f64, color: Color) -> Emit {
        if !self.on_screen(x, y, size) {
            self.culled += 1;
            return Emit::Culled;
        }
        if let Some(budget) = budget {
            if !budget.try_consume() {
                return Emit::OverBudget;
            }
        }
        self.surface.fill_rect(x, y, size, color);
        self.drawn += 1;
        Emit::Drawn
    }
}

/// Cells of one sector as they will be drawn.
enum SectorCells<'a> {
    Direct(&'a SectorPixels),
    Lod(LodLevel, Vec<ColorIndex>),
}

impl SectorCells<'_> {
    /// Calls `f(local_x, local_y, factor, color)` for every non-empty cell,
    /// row-major, with local coordinates in level-0 pixels.
    fn for_each_cell(&self, mut f: impl FnMut(usize, usize, usize, ColorIndex)) {
        match self {
            SectorCells::Direct(grid) => {
                for (local, color) in grid.iter_occupied() {
                    f(local.x as usize, local.y as usize, 1, color);
                }
            }
            SectorCells::Lod(level, cells) => {
                let side = level.side();
                let factor = level.factor();
                for (index, &color) in cells.iter().enumerate() {
                    if color != BACKGROUND {
                        f((index % side) * factor, (index / side) * factor, factor, color);
                    }
                }
            }
        }
    }
}

/// Draws a frame in whichever mode the selector picks.
#[derive(Debug, Clone)]
pub struct TileRenderer {
    selector: RenderModeSelector,
    pixel_budget: u32,
    sector_budget: u32,
    heatmap_tile_px: u32,
    frontier: Color,
}

impl TileRenderer {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            selector: RenderModeSelector::new(ModeThresholds::from(config)),
            pixel_budget: config.pixel_budget,
            sector_budget: config.sector_budget,
            heatmap_tile_px: config.heatmap_tile_px.max(1),
            frontier: Color::from_hex(&config.frontier).unwrap_or(Color::new(0xff, 0xff, 0xff)),
        }
    }

    pub fn selector(&self) -> &RenderModeSelector {
        &self.selector
    }

    pub fn frontier_color(&self) -> Color {
        self.frontier
    }

    /// Select a mode and draw the frame.
    pub fn render(
        &self,
        frame: &FrameInput<'_>,
        lod: &mut LodCache,
        encoder: &mut dyn LodEncoder,
        surface: &mut dyn PaintSurface,
    ) -> RenderStats {
        let mode = self.selector.select_for(frame.viewport.scale, frame.bounds, frame.registry);
        self.render_mode(mode, frame, lod, encoder, surface)
    }

    /// Draw the frame in a fixed mode.
    pub fn render_mode(
        &self,
        mode: RenderMode,
        frame: &FrameInput<'_>,
        lod: &mut LodCache,
        encoder: &mut dyn LodEncoder,
        surface: &mut dyn PaintSurface,
    ) -> RenderStats {
        surface.clear();
        let mut out = Emitter::new(surface, frame.viewport);
        let mut stats = RenderStats::new(mode);

        match mode {
            RenderMode::PixelPerfect => self.draw_pixels(frame, &mut out, &mut stats),
            RenderMode::ScaledPixel => self.draw_scaled(frame, lod, encoder, &mut out, &mut stats),
            RenderMode::SectorBlock => self.draw_sector_blocks(frame, lod, encoder, &mut out, &mut stats),
            RenderMode::TileHeatmap => self.draw_heatmap(frame, &mut out),
        }

        stats.rects_drawn = out.drawn;
        stats.rects_culled = out.culled;
        trace!(
            "Frame {}: {} drawn, {} culled{}",
            mode,
            stats.rects_drawn,
            stats.rects_culled,
            if stats.truncated { " (truncated)" } else { "" }
        );
        stats
    }

    fn draw_pixels(&self, frame: &FrameInput<'_>, out: &mut Emitter<'_>, stats: &mut RenderStats) {
        let zoom = frame.viewport.zoom();
        let sectors = visible_sectors(frame);
        self.draw_backdrops(frame, &sectors, out);

        let mut budget = FrameBudget::new(self.pixel_budget);
        'sectors: for sector in sectors {
            let Some(grid) = frame.pixels.sector(sector) else {
                continue;
            };
            stats.sectors_visited += 1;
            let (ox, oy) = sector.origin_world();
            for (local, color) in grid.iter_occupied() {
                let world = DVec2::new((ox + local.x as i64) as f64, (oy + local.y as i64) as f64);
                let screen = world_to_screen(frame.viewport, world);
                let color = frame.palette.color(color);
                if out.emit(Some(&mut budget), screen.x, screen.y, zoom, color) == Emit::OverBudget {
                    stats.truncated = true;
                    break 'sectors;
                }
            }
        }
    }

    fn draw_scaled(
        &self,
        frame: &FrameInput<'_>,
        lod: &mut LodCache,
        encoder: &mut dyn LodEncoder,
        out: &mut Emitter<'_>,
        stats: &mut RenderStats,
    ) {
        let zoom = frame.viewport.zoom();
        let level = choose_lod_level(zoom);
        stats.lod_level = Some(level);
        let sectors = visible_sectors(frame);
        self.draw_backdrops(frame, &sectors, out);

        let mut batch: Vec<(ColorIndex, f64, f64, f64)> = Vec::new();
        for sector in sectors {
            let Some(cells) = sector_cells(sector, level, frame.pixels, lod, encoder, stats) else {
                continue;
            };
            stats.sectors_visited += 1;
            let (ox, oy) = sector.origin_world();
            cells.for_each_cell(|lx, ly, factor, color| {
                let world = DVec2::new((ox + lx as i64) as f64, (oy + ly as i64) as f64);
                let screen = world_to_screen(frame.viewport, world);
                let size = factor as f64 * zoom;
                if out.on_screen(screen.x, screen.y, size) {
                    batch.push((color, screen.x, screen.y, size));
                } else {
                    out.culled += 1;
                }
            });
        }

        // Stable: row-major order survives within each color.
        batch.sort_by_key(|&(color, ..)| color);
        let mut budget = FrameBudget::new(self.pixel_budget);
        for (color, x, y, size) in batch {
            if out.emit(Some(&mut budget), x, y, size, frame.palette.color(color)) == Emit::OverBudget {
                stats.truncated = true;
                break;
            }
        }
    }

    fn draw_sector_blocks(
        &self,
        frame: &FrameInput<'_>,
        lod: &mut LodCache,
        encoder: &mut dyn LodEncoder,
        out: &mut Emitter<'_>,
        stats: &mut RenderStats,
    ) {
        let size = SECTOR_SIZE as f64 * frame.viewport.zoom();
        let mut budget = FrameBudget::new(self.sector_budget);

        for sector in visible_sectors(frame) {
            let count = frame.registry.pixel_count(sector);
            if count == 0 && !frame.registry.is_active(sector) {
                continue;
            }
            stats.sectors_visited += 1;

            let color = if count == 0 {
                self.frontier
            } else {
                let ink = match sector_dominant(sector, frame.pixels, lod, encoder, stats) {
                    Some(BACKGROUND) | None => UNLOADED_INK,
                    Some(dominant) => frame.palette.color(dominant),
                };
                let fill = frame.registry.fill_ratio(sector) as f32;
                self.frontier.lerp(ink, fill.sqrt())
            };

            let screen = world_to_screen(frame.viewport, sector_origin(sector));
            if out.emit(Some(&mut budget), screen.x, screen.y, size, color) == Emit::OverBudget {
                stats.truncated = true;
                break;
            }
        }
    }

    /// Screen tiles colored by the pixel density of the sectors under them.
    /// Tile count is bounded by the canvas size, so no budget applies.
    fn draw_heatmap(&self, frame: &FrameInput<'_>, out: &mut Emitter<'_>) {
        let tile = self.heatmap_tile_px as f64;
        let zoom = frame.viewport.zoom();
        let cols = (out.width / tile).ceil() as usize;
        let rows = (out.height / tile).ceil() as usize;
        if cols == 0 || rows == 0 {
            return;
        }

        let mut weight = vec![0.0f64; cols * rows];
        let mut covered = vec![false; cols * rows];

        let mut sectors: Vec<_> = frame
            .registry
            .iter()
            .filter(|(_, info)| info.pixel_count > 0 || info.active)
            .map(|(sector, info)| (*sector, *info))
            .filter(|(sector, _)| SectorRect::single(*sector).world_rect().intersects(&frame.bounds.world))
            .collect();
        sectors.sort_by_key(|(sector, _)| *sector);

        let side = SECTOR_SIZE as f64 * zoom;
        for (sector, info) in sectors {
            let origin = world_to_screen(frame.viewport, sector_origin(sector));
            let (x0, y0, x1, y1) = (origin.x, origin.y, origin.x + side, origin.y + side);
            let c0 = (x0 / tile).floor().max(0.0) as usize;
            let r0 = (y0 / tile).floor().max(0.0) as usize;
            let c1 = ((x1 / tile).ceil().max(0.0) as usize).min(cols);
            let r1 = ((y1 / tile).ceil().max(0.0) as usize).min(rows);

            for row in r0..r1 {
                for col in c0..c1 {
                    let tx = col as f64 * tile;
                    let ty = row as f64 * tile;
                    let w = x1.min(tx + tile) - x0.max(tx);
                    let h = y1.min(ty + tile) - y0.max(ty);
                    if w <= 0.0 || h <= 0.0 {
                        continue;
                    }
                    let cell = row * cols + col;
                    weight[cell] += info.pixel_count as f64 * (w * h) / (side * side);
                    covered[cell] |= info.active;
                }
            }
        }

        let tile_world_area = (tile / zoom).powi(2);
        for row in 0..rows {
            for col in 0..cols {
                let cell = row * cols + col;
                let color = if weight[cell] > 0.0 {
                    heat_color((weight[cell] / tile_world_area).min(1.0))
                } else if covered[cell] {
                    self.frontier
                } else {
                    continue;
                };
                out.emit(None, col as f64 * tile, row as f64 * tile, tile, color);
            }
        }
    }

    /// Drawable-region backdrop for active sectors in the pixel modes.
    fn draw_backdrops(&self, frame: &FrameInput<'_>, sectors: &[SectorCoord], out: &mut Emitter<'_>) {
        let size = SECTOR_SIZE as f64 * frame.viewport.zoom();
        for &sector in sectors {
            if frame.registry.is_active(sector) {
                let screen = world_to_screen(frame.viewport, sector_origin(sector));
                out.emit(None, screen.x, screen.y, size, self.frontier);
            }
        }
    }
}

/// Cold-to-hot ramp for a density in `[0, 1]`.
pub fn heat_color(density: f64) -> Color {
    let t = density.clamp(0.0, 1.0).sqrt() as f32;
    if t < 0.5 {
        HEAT_COLD.lerp(HEAT_MID, t * 2.0)
    } else {
        HEAT_MID.lerp(HEAT_HOT, (t - 0.5) * 2.0)
    }
}

#[inline]
fn sector_origin(sector: SectorCoord) -> DVec2 {
    let (x, y) = sector.origin_world();
    DVec2::new(x as f64, y as f64)
}

/// Known sectors in the unpadded visible rect, row-major.
fn visible_sectors(frame: &FrameInput<'_>) -> Vec<SectorCoord> {
    frame.registry.known_in(&frame.bounds.unpadded_sectors())
}

/// Cells to draw for a sector at `level`, never waiting on the encoder.
///
/// Order of preference: cached level, inline regeneration, nearest coarser
/// cached level, then the live grid itself.
fn sector_cells<'a>(
    sector: SectorCoord,
    level: LodLevel,
    pixels: &'a PixelStore,
    lod: &mut LodCache,
    encoder: &mut dyn LodEncoder,
    stats: &mut RenderStats,
) -> Option<SectorCells<'a>> {
    let grid = pixels.sector(sector)?;
    if level == LodLevel::L0 {
        return Some(SectorCells::Direct(grid));
    }
    if let Some(cells) = lod.decode(sector, level) {
        stats.lod_hits += 1;
        return Some(SectorCells::Lod(level, cells));
    }
    if let Some(cells) = lod
        .request(sector, level, pixels, encoder)
        .and_then(|blob| decode_level(&blob, level).ok())
    {
        return Some(SectorCells::Lod(level, cells));
    }
    if let Some((coarser, cells)) = lod.coarser_fallback(sector, level) {
        stats.coarser_fallbacks += 1;
        return Some(SectorCells::Lod(coarser, cells));
    }
    stats.direct_fallbacks += 1;
    Some(SectorCells::Direct(grid))
}

/// Dominant color of a sector, from the coarsest level when possible.
fn sector_dominant(
    sector: SectorCoord,
    pixels: &PixelStore,
    lod: &mut LodCache,
    encoder: &mut dyn LodEncoder,
    stats: &mut RenderStats,
) -> Option<ColorIndex> {
    let grid = pixels.sector(sector)?;
    let level = LodLevel::COARSEST;
    if let Some(cells) = lod.decode(sector, level) {
        stats.lod_hits += 1;
        return Some(dominant_color(&cells));
    }
    if let Some(cells) = lod
        .request(sector, level, pixels, encoder)
        .and_then(|blob| decode_level(&blob, level).ok())
    {
        return Some(dominant_color(&cells));
    }
    stats.direct_fallbacks += 1;
    Some(dominant_color(grid.cells()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::visible_bounds;
    use crate::coords::Pixel;
    use crate::offload::{EncodeJob, EncodedLod, InlineEncoder, Submitted};
    use crate::registry::ExpansionPolicy;
    use crate::render::surface::RecordingSurface;

    struct Scene {
        viewport: Viewport,
        bounds: VisibleBounds,
        registry: SectorRegistry,
        pixels: PixelStore,
        palette: Palette,
        lod: LodCache,
    }

    impl Scene {
        fn new(scale: f64) -> Self {
            let viewport = Viewport::new(scale, DVec2::ZERO, 800, 600, 1.0);
            let mut registry = SectorRegistry::new(ExpansionPolicy::default());
            registry.seed_origin();
            Self {
                bounds: visible_bounds(&viewport),
                viewport,
                registry,
                pixels: PixelStore::new(),
                palette: Palette::from_hex(&RenderConfig::default().palette),
                lod: LodCache::new(64),
            }
        }

        fn put(&mut self, wx: i64, wy: i64, color: ColorIndex) {
            let pixel = Pixel::at_world(wx, wy, color);
            self.pixels.write(&pixel, true);
            self.registry.increment_count(pixel.sector);
        }

        fn draw(
            &mut self,
            renderer: &TileRenderer,
            mode: RenderMode,
            encoder: &mut dyn LodEncoder,
        ) -> (RenderStats, Vec<(f64, f64, f64, Color)>) {
            let frame = FrameInput {
                viewport: &self.viewport,
                bounds: &self.bounds,
                registry: &self.registry,
                pixels: &self.pixels,
                palette: &self.palette,
            };
            let mut surface = RecordingSurface::new();
            let stats = renderer.render_mode(mode, &frame, &mut self.lod, encoder, &mut surface);
            (stats, surface.rects().collect())
        }
    }

    /// Never completes anything.
    struct StalledEncoder;

    impl LodEncoder for StalledEncoder {
        fn submit(&mut self, _job: EncodeJob) -> Submitted {
            Submitted::Pending
        }

        fn poll_completed(&mut self) -> Vec<EncodedLod> {
            Vec::new()
        }
    }

    fn renderer() -> TileRenderer {
        TileRenderer::new(&RenderConfig::default())
    }

    #[test]
    fn test_pixel_perfect_draws_and_culls() {
        let mut scene = Scene::new(4.0);
        scene.put(0, 0, 5);
        scene.put(250, 10, 5);
        let renderer = renderer();
        let (stats, rects) = scene.draw(&renderer, RenderMode::PixelPerfect, &mut InlineEncoder);

        assert_eq!(
            rects,
            vec![
                (0.0, 0.0, 1024.0, renderer.frontier_color()),
                (0.0, 0.0, 4.0, scene.palette.color(5)),
            ]
        );
        assert_eq!(stats.rects_culled, 1);
        assert!(!stats.truncated);
    }

    #[test]
    fn test_budget_truncates_frame() {
        let mut scene = Scene::new(4.0);
        for x in 0..10 {
            scene.put(x, 0, 3);
        }
        let renderer = TileRenderer::new(&RenderConfig {
            pixel_budget: 3,
            ..RenderConfig::default()
        });
        let (stats, rects) = scene.draw(&renderer, RenderMode::PixelPerfect, &mut InlineEncoder);
        // Backdrop plus three pixels.
        assert_eq!(rects.len(), 4);
        assert!(stats.truncated);
    }

    #[test]
    fn test_scaled_pixels_batch_by_color() {
        let mut scene = Scene::new(1.0);
        scene.put(0, 0, 7);
        scene.put(1, 0, 2);
        scene.put(2, 0, 7);
        scene.put(0, 1, 2);
        let (stats, rects) = scene.draw(&renderer(), RenderMode::ScaledPixel, &mut InlineEncoder);
        assert_eq!(stats.lod_level, Some(LodLevel::L0));

        let pixels: Vec<_> = rects[1..].iter().map(|&(x, y, _, _)| (x, y)).collect();
        assert_eq!(pixels, vec![(1.0, 0.0), (0.0, 1.0), (0.0, 0.0), (2.0, 0.0)]);
    }

    #[test]
    fn test_scaled_budget_cuts_after_batching() {
        let mut scene = Scene::new(1.0);
        scene.put(0, 0, 7);
        scene.put(1, 0, 2);
        scene.put(2, 0, 7);
        scene.put(0, 1, 2);
        let renderer = TileRenderer::new(&RenderConfig {
            pixel_budget: 3,
            ..RenderConfig::default()
        });
        let (stats, rects) = scene.draw(&renderer, RenderMode::ScaledPixel, &mut InlineEncoder);
        assert!(stats.truncated);

        // Backdrop, then the first three rects of the color-sorted batch.
        let drawn: Vec<_> = rects[1..].iter().map(|&(x, y, _, c)| (x, y, c)).collect();
        assert_eq!(
            drawn,
            vec![
                (1.0, 0.0, scene.palette.color(2)),
                (0.0, 1.0, scene.palette.color(2)),
                (0.0, 0.0, scene.palette.color(7)),
            ]
        );
    }

    #[test]
    fn test_sector_budget_truncates_blocks() {
        let mut scene = Scene::new(0.2);
        scene.registry.activate(SectorCoord::new(1, 0));
        scene.registry.activate(SectorCoord::new(2, 0));
        scene.put(0, 0, 5);
        let renderer = TileRenderer::new(&RenderConfig {
            sector_budget: 2,
            ..RenderConfig::default()
        });
        let (stats, rects) = scene.draw(&renderer, RenderMode::SectorBlock, &mut InlineEncoder);

        assert!(stats.truncated);
        let size = SECTOR_SIZE as f64 * 0.2;
        let origins: Vec<_> = rects.iter().map(|&(x, y, _, _)| (x, y)).collect();
        assert_eq!(origins, vec![(0.0, 0.0), (size, 0.0)]);
    }

    #[test]
    fn test_scaled_pixels_use_lod_level() {
        let mut scene = Scene::new(0.5);
        scene.put(0, 0, 3);
        let (stats, rects) = scene.draw(&renderer(), RenderMode::ScaledPixel, &mut InlineEncoder);
        assert_eq!(stats.lod_level, Some(LodLevel::L1));
        assert_eq!(rects.last().copied(), Some((0.0, 0.0, 1.0, scene.palette.color(3))));
        assert!(scene.lod.contains(SectorCoord::ORIGIN, LodLevel::L1));

        let (stats, _) = scene.draw(&renderer(), RenderMode::ScaledPixel, &mut InlineEncoder);
        assert_eq!(stats.lod_hits, 1);
    }

    #[test]
    fn test_pending_miss_falls_back() {
        let mut scene = Scene::new(0.5);
        scene.put(0, 0, 3);

        let (stats, rects) = scene.draw(&renderer(), RenderMode::ScaledPixel, &mut StalledEncoder);
        assert_eq!(stats.direct_fallbacks, 1);
        assert_eq!(rects.last().copied(), Some((0.0, 0.0, 0.5, scene.palette.color(3))));
        assert!(scene.lod.is_in_flight(SectorCoord::ORIGIN, LodLevel::L1));

        let pixels = &scene.pixels;
        scene.lod.get_or_generate(SectorCoord::ORIGIN, LodLevel::L3, pixels).unwrap();
        let (stats, rects) = scene.draw(&renderer(), RenderMode::ScaledPixel, &mut StalledEncoder);
        assert_eq!(stats.coarser_fallbacks, 1);
        assert_eq!(rects.last().copied(), Some((0.0, 0.0, 4.0, scene.palette.color(3))));
    }

    #[test]
    fn test_sector_blocks_blend_by_density() {
        let mut scene = Scene::new(0.2);
        scene.registry.activate(SectorCoord::new(1, 0));
        for y in 0..64 {
            for x in 0..256 {
                scene.put(x, y, 5);
            }
        }
        let renderer = renderer();
        let (stats, rects) = scene.draw(&renderer, RenderMode::SectorBlock, &mut InlineEncoder);

        let size = SECTOR_SIZE as f64 * 0.2;
        let origin_color = renderer.frontier_color().lerp(scene.palette.color(5), 0.5);
        assert_eq!(
            rects,
            vec![
                (0.0, 0.0, size, origin_color),
                (size, 0.0, size, renderer.frontier_color()),
            ]
        );
        assert_eq!(stats.sectors_visited, 2);
    }

    #[test]
    fn test_heatmap_tiles() {
        let mut scene = Scene::new(0.05);
        scene.registry.activate(SectorCoord::new(1, 0));
        for _ in 0..codec::SECTOR_CELLS {
            scene.registry.increment_count(SectorCoord::ORIGIN);
        }
        let renderer = renderer();
        let (_, rects) = scene.draw(&renderer, RenderMode::TileHeatmap, &mut InlineEncoder);

        // Origin sector is 12.8 screen px; one 16 px tile holds all of it.
        let density = codec::SECTOR_CELLS as f64 / (16.0f64 / 0.05).powi(2);
        assert_eq!(
            rects,
            vec![
                (0.0, 0.0, 16.0, heat_color(density)),
                (16.0, 0.0, 16.0, renderer.frontier_color()),
            ]
        );
    }

    #[test]
    fn test_heat_ramp_endpoints() {
        assert_eq!(heat_color(0.0), HEAT_COLD);
        assert_eq!(heat_color(1.0), HEAT_HOT);
        assert_eq!(heat_color(0.25), HEAT_MID);
    }
}
