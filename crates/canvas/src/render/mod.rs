//! Rendering: mode selection, the tile renderer and the paint surface seam.

mod budget;
pub mod mode;
pub mod surface;
pub mod tiles;

pub use budget::FrameBudget;
pub use mode::{ModeThresholds, RenderMode, RenderModeSelector, choose_lod_level, estimate_visible_pixels};
pub use surface::{DrawOp, PaintSurface, RecordingSurface};
pub use tiles::{FrameInput, RenderStats, TileRenderer, heat_color};
