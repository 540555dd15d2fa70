//! Coordinate spaces.
//!
//! World space is an unbounded integer pixel grid. Sector space partitions it
//! into `SECTOR_SIZE` squares; local coordinates address a cell inside one
//! sector. Screen space is the canvas, related to world space by the viewport's
//! affine map. All sector arithmetic floors toward negative infinity.

use codec::{ColorIndex, SECTOR_SIZE};
use glam::DVec2;

use crate::viewport::Viewport;

const S: i64 = SECTOR_SIZE as i64;

/// Sector position on the infinite grid.
///
/// Ordered row-major (`y`, then `x`) so sorted collections iterate in draw order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SectorCoord {
    pub x: i64,
    pub y: i64,
}

impl SectorCoord {
    pub const ORIGIN: SectorCoord = SectorCoord { x: 0, y: 0 };

    #[inline]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// The 8 Moore neighbours in row-major order.
    pub fn neighbors(self) -> [SectorCoord; 8] {
        let SectorCoord { x, y } = self;
        [
            SectorCoord::new(x - 1, y - 1),
            SectorCoord::new(x, y - 1),
            SectorCoord::new(x + 1, y - 1),
            SectorCoord::new(x - 1, y),
            SectorCoord::new(x + 1, y),
            SectorCoord::new(x - 1, y + 1),
            SectorCoord::new(x, y + 1),
            SectorCoord::new(x + 1, y + 1),
        ]
    }

    /// World coordinate of the sector's top-left cell.
    #[inline]
    pub fn origin_world(self) -> (i64, i64) {
        (self.x * S, self.y * S)
    }
}

impl Ord for SectorCoord {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.y.cmp(&other.y).then_with(|| self.x.cmp(&other.x))
    }
}

impl PartialOrd for SectorCoord {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for SectorCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Cell position inside a sector, both axes in `[0, SECTOR_SIZE)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LocalCoord {
    pub x: u16,
    pub y: u16,
}

impl LocalCoord {
    /// Checked constructor.
    pub fn new(x: u16, y: u16) -> Option<Self> {
        let local = Self { x, y };
        local.in_range().then_some(local)
    }

    #[inline]
    pub fn in_range(self) -> bool {
        (self.x as usize) < SECTOR_SIZE && (self.y as usize) < SECTOR_SIZE
    }

    /// Row-major index into a level-0 grid.
    #[inline]
    pub fn index(self) -> usize {
        self.y as usize * SECTOR_SIZE + self.x as usize
    }

    #[inline]
    pub fn from_index(index: usize) -> Self {
        Self {
            x: (index % SECTOR_SIZE) as u16,
            y: (index / SECTOR_SIZE) as u16,
        }
    }
}

/// Sector map key. The coordinate itself is the key; `Display` renders `"x,y"`.
pub type SectorKey = SectorCoord;

/// Unique key of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PixelKey {
    pub sector: SectorCoord,
    pub local: LocalCoord,
}

impl std::fmt::Display for PixelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{},{}", self.sector, self.local.x, self.local.y)
    }
}

/// A colored cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pixel {
    pub sector: SectorCoord,
    pub local: LocalCoord,
    pub color: ColorIndex,
}

impl Pixel {
    pub fn new(sector: SectorCoord, local: LocalCoord, color: ColorIndex) -> Self {
        Self { sector, local, color }
    }

    /// Pixel at a world coordinate.
    pub fn at_world(wx: i64, wy: i64, color: ColorIndex) -> Self {
        let (sector, local) = world_to_sector(wx, wy);
        Self { sector, local, color }
    }

    #[inline]
    pub fn key(&self) -> PixelKey {
        PixelKey {
            sector: self.sector,
            local: self.local,
        }
    }

    #[inline]
    pub fn world(&self) -> (i64, i64) {
        sector_to_world(self.sector, self.local)
    }
}

/// Split a world coordinate into its sector and local cell.
#[inline]
pub fn world_to_sector(wx: i64, wy: i64) -> (SectorCoord, LocalCoord) {
    (
        SectorCoord::new(wx.div_euclid(S), wy.div_euclid(S)),
        LocalCoord {
            x: wx.rem_euclid(S) as u16,
            y: wy.rem_euclid(S) as u16,
        },
    )
}

/// Inverse of [`world_to_sector`].
#[inline]
pub fn sector_to_world(sector: SectorCoord, local: LocalCoord) -> (i64, i64) {
    (sector.x * S + local.x as i64, sector.y * S + local.y as i64)
}

/// Sector containing a fractional world position.
#[inline]
pub fn sector_of_world_pos(world: DVec2) -> SectorCoord {
    let s = SECTOR_SIZE as f64;
    SectorCoord::new((world.x / s).floor() as i64, (world.y / s).floor() as i64)
}

#[inline]
pub fn sector_key(x: i64, y: i64) -> SectorKey {
    SectorCoord::new(x, y)
}

#[inline]
pub fn pixel_key(sx: i64, sy: i64, lx: u16, ly: u16) -> PixelKey {
    PixelKey {
        sector: SectorCoord::new(sx, sy),
        local: LocalCoord { x: lx, y: ly },
    }
}

/// `world = (screen - offset) / (pixel_size * scale)`
#[inline]
pub fn screen_to_world(viewport: &Viewport, screen: DVec2) -> DVec2 {
    (screen - viewport.offset) / viewport.zoom()
}

/// `screen = world * (pixel_size * scale) + offset`
#[inline]
pub fn world_to_screen(viewport: &Viewport, world: DVec2) -> DVec2 {
    world * viewport.zoom() + viewport.offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_coordinates_floor() {
        let (sector, local) = world_to_sector(-1, -1);
        assert_eq!(sector, SectorCoord::new(-1, -1));
        assert_eq!(local, LocalCoord { x: 255, y: 255 });

        let (sector, local) = world_to_sector(-256, -257);
        assert_eq!(sector, SectorCoord::new(-1, -2));
        assert_eq!(local, LocalCoord { x: 0, y: 255 });

        let (sector, local) = world_to_sector(255, 256);
        assert_eq!(sector, SectorCoord::new(0, 1));
        assert_eq!(local, LocalCoord { x: 255, y: 0 });
    }

    #[test]
    fn test_sector_roundtrip() {
        let samples = [
            0i64,
            1,
            -1,
            255,
            256,
            -255,
            -256,
            -257,
            1_000_000_007,
            -1_000_000_007,
        ];
        for &x in &samples {
            for &y in &samples {
                let (sector, local) = world_to_sector(x, y);
                assert!(local.in_range());
                assert_eq!(sector_to_world(sector, local), (x, y), "({x}, {y})");
            }
        }
    }

    #[test]
    fn test_fractional_world_sector() {
        assert_eq!(sector_of_world_pos(DVec2::new(-0.5, 255.9)), SectorCoord::new(-1, 0));
        assert_eq!(sector_of_world_pos(DVec2::new(256.0, -256.0)), SectorCoord::new(1, -1));
    }

    #[test]
    fn test_screen_world_roundtrip() {
        let viewport = Viewport::new(4.0, DVec2::new(120.0, -40.0), 800, 600, 1.0);
        let world = screen_to_world(&viewport, DVec2::new(400.0, 300.0));
        assert_eq!(world, DVec2::new(70.0, 85.0));
        assert_eq!(world_to_screen(&viewport, world), DVec2::new(400.0, 300.0));
    }

    #[test]
    fn test_neighbors_row_major() {
        let n = SectorCoord::new(3, -2).neighbors();
        assert_eq!(n[0], SectorCoord::new(2, -3));
        assert_eq!(n[7], SectorCoord::new(4, -1));
        assert!(!n.contains(&SectorCoord::new(3, -2)));
        let mut sorted = n;
        sorted.sort();
        assert_eq!(sorted, n);
    }

    #[test]
    fn test_keys_display() {
        assert_eq!(sector_key(-3, 7).to_string(), "-3,7");
        assert_eq!(pixel_key(1, 2, 3, 4).to_string(), "1,2:3,4");
        assert!(LocalCoord::new(256, 0).is_none());
        assert_eq!(LocalCoord::from_index(LocalCoord { x: 9, y: 3 }.index()), LocalCoord { x: 9, y: 3 });
    }
}
