//! Visible-range computation.
//!
//! The visible rectangle is a pure function of the viewport, computed in O(1)
//! from the two canvas corners. The last input/output pair is memoized so sub-pixel
//! jitter does not recompute anything.

use codec::SECTOR_SIZE;
use glam::DVec2;

use crate::coords::{SectorCoord, screen_to_world, sector_of_world_pos};
use crate::viewport::Viewport;

/// Offsets closer than this (in world units) count as unchanged.
pub const OFFSET_TOLERANCE: f64 = 1.0;

/// Sectors of padding added on every side of the visible sector range.
pub const SECTOR_PADDING: i64 = 1;

/// Axis-aligned world-space rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorldRect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl WorldRect {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Create bounds from two corners.
    pub fn from_corners(a: DVec2, b: DVec2) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self::new(min.x, min.y, max.x, max.y)
    }

    /// Check if two bounds intersect.
    #[inline]
    pub fn intersects(&self, other: &WorldRect) -> bool {
        !(other.min_x >= self.max_x
            || other.max_x <= self.min_x
            || other.min_y >= self.max_y
            || other.max_y <= self.min_y)
    }

    /// Area of overlap with `other`, zero when disjoint.
    #[inline]
    pub fn overlap_area(&self, other: &WorldRect) -> f64 {
        let w = self.max_x.min(other.max_x) - self.min_x.max(other.min_x);
        let h = self.max_y.min(other.max_y) - self.min_y.max(other.min_y);
        if w <= 0.0 || h <= 0.0 { 0.0 } else { w * h }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }
}

/// Inclusive rectangle of sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectorRect {
    pub min_x: i64,
    pub min_y: i64,
    pub max_x: i64,
    pub max_y: i64,
}

impl SectorRect {
    pub fn new(min_x: i64, min_y: i64, max_x: i64, max_y: i64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Rectangle holding a single sector.
    pub fn single(sector: SectorCoord) -> Self {
        Self::new(sector.x, sector.y, sector.x, sector.y)
    }

    #[inline]
    pub fn width(&self) -> u64 {
        (self.max_x - self.min_x + 1).max(0) as u64
    }

    #[inline]
    pub fn height(&self) -> u64 {
        (self.max_y - self.min_y + 1).max(0) as u64
    }

    /// Number of sectors covered.
    #[inline]
    pub fn len(&self) -> u64 {
        self.width().saturating_mul(self.height())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn contains(&self, sector: SectorCoord) -> bool {
        sector.x >= self.min_x && sector.x <= self.max_x && sector.y >= self.min_y && sector.y <= self.max_y
    }

    /// Shrink or grow every side by `n` sectors.
    pub fn expand(&self, n: i64) -> Self {
        Self::new(self.min_x - n, self.min_y - n, self.max_x + n, self.max_y + n)
    }

    /// World-space area covered.
    pub fn world_rect(&self) -> WorldRect {
        let s = SECTOR_SIZE as f64;
        WorldRect::new(
            self.min_x as f64 * s,
            self.min_y as f64 * s,
            (self.max_x + 1) as f64 * s,
            (self.max_y + 1) as f64 * s,
        )
    }

    /// Sectors in row-major order.
    pub fn iter_row_major(&self) -> impl Iterator<Item = SectorCoord> + '_ {
        (self.min_y..=self.max_y)
            .flat_map(move |y| (self.min_x..=self.max_x).map(move |x| SectorCoord::new(x, y)))
    }
}

/// Zoom classification used to pick how much detail to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetailLevel {
    /// scale >= 0.5
    High,
    /// 0.25 <= scale < 0.5
    Medium,
    /// scale < 0.25
    Low,
}

impl DetailLevel {
    pub fn from_scale(scale: f64) -> Self {
        if scale >= 0.5 {
            DetailLevel::High
        } else if scale >= 0.25 {
            DetailLevel::Medium
        } else {
            DetailLevel::Low
        }
    }
}

/// What the viewport can see.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleBounds {
    pub world: WorldRect,
    /// Padded by [`SECTOR_PADDING`] on every side.
    pub sectors: SectorRect,
    pub detail: DetailLevel,
}

impl VisibleBounds {
    /// Sector range without the pop-in padding.
    pub fn unpadded_sectors(&self) -> SectorRect {
        self.sectors.expand(-SECTOR_PADDING)
    }
}

/// Compute the visible bounds without caching.
pub fn visible_bounds(viewport: &Viewport) -> VisibleBounds {
    let top_left = screen_to_world(viewport, DVec2::ZERO);
    let bottom_right = screen_to_world(viewport, viewport.canvas_size());
    let world = WorldRect::from_corners(top_left, bottom_right);

    let min = sector_of_world_pos(DVec2::new(world.min_x, world.min_y));
    let max = sector_of_world_pos(DVec2::new(world.max_x, world.max_y));
    let sectors = SectorRect::new(min.x, min.y, max.x, max.y).expand(SECTOR_PADDING);

    VisibleBounds {
        world,
        sectors,
        detail: DetailLevel::from_scale(viewport.scale),
    }
}

/// Memo of the last viewport/bounds pair.
#[derive(Debug, Default)]
pub struct ViewportBoundsCache {
    last: Option<(Viewport, VisibleBounds)>,
    hits: u64,
    misses: u64,
}

impl ViewportBoundsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compute_visible_bounds(&mut self, viewport: &Viewport) -> VisibleBounds {
        if let Some((cached_viewport, cached_bounds)) = &self.last {
            if Self::is_near(cached_viewport, viewport) {
                self.hits += 1;
                return *cached_bounds;
            }
        }

        self.misses += 1;
        let bounds = visible_bounds(viewport);
        self.last = Some((*viewport, bounds));
        bounds
    }

    /// Drop the memo.
    pub fn invalidate(&mut self) {
        self.last = None;
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    fn is_near(a: &Viewport, b: &Viewport) -> bool {
        if a.scale != b.scale
            || a.pixel_size != b.pixel_size
            || a.canvas_width != b.canvas_width
            || a.canvas_height != b.canvas_height
        {
            return false;
        }
        // Offsets are in screen units; compare in world units.
        let delta = (a.offset - b.offset).abs() / a.zoom();
        delta.x < OFFSET_TOLERANCE && delta.y < OFFSET_TOLERANCE
    }
}
