//! Spatial tile core for pixel-frontier.
//!
//! This crate contains:
//! - Coordinate math and visible-range computation
//! - The sector registry and frontier expansion
//! - The LOD blob cache and its offload encoders
//! - Render-mode selection and the tile renderer
//! - The `Canvas` that ties them to a single write path

pub mod bounds;
pub mod canvas;
pub mod config;
pub mod coords;
pub mod error;
pub mod expansion;
pub mod lod;
pub mod offload;
pub mod palette;
pub mod pixels;
pub mod registry;
pub mod render;
pub mod store;
pub mod viewport;

// Re-export commonly used types
pub use bounds::{SectorRect, ViewportBoundsCache, VisibleBounds, WorldRect};
pub use canvas::{Canvas, WriteOrigin, WriteOutcome};
pub use config::Config;
pub use coords::{LocalCoord, Pixel, PixelKey, SectorCoord, SectorKey, world_to_sector};
pub use error::CanvasError;
pub use expansion::{CheckSkipped, ExpansionGuard};
pub use lod::{LodCache, LodKey};
pub use offload::{InlineEncoder, LodEncoder, TokioEncoder};
pub use palette::Palette;
pub use pixels::{PixelStore, WriteEffect};
pub use registry::{SectorRegistry, SectorSnapshot, SectorState, StaleSector};
pub use render::{PaintSurface, RecordingSurface, RenderMode, RenderModeSelector, RenderStats, TileRenderer};
pub use store::{CanvasStore, MemoryStore};
pub use viewport::{Viewport, ViewportChange, ViewportController};
