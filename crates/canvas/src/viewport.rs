// Viewport state - pan, zoom about an anchor, resize
//
// The input collaborator resolves raw pointer/touch/wheel events into
// `ViewportChange` values; this module only applies them. A change that would
// produce a non-finite or degenerate viewport is rejected and the last good
// viewport stays in effect.
use glam::DVec2;
use tracing::warn;

use crate::error::CanvasError;

/// Smallest scale ever used as a divisor.
pub const SCALE_EPSILON: f64 = 1e-6;

/// Pan/zoom/canvas-size state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scale: f64,
    /// Screen position of world origin.
    pub offset: DVec2,
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Screen pixels per world pixel at scale 1.
    pub pixel_size: f64,
}

impl Viewport {
    pub fn new(scale: f64, offset: DVec2, canvas_width: u32, canvas_height: u32, pixel_size: f64) -> Self {
        Self {
            scale,
            offset,
            canvas_width,
            canvas_height,
            pixel_size,
        }
    }

    /// Screen pixels per world pixel. Never zero.
    #[inline]
    pub fn zoom(&self) -> f64 {
        self.pixel_size.max(SCALE_EPSILON) * self.scale.max(SCALE_EPSILON)
    }

    #[inline]
    pub fn canvas_size(&self) -> DVec2 {
        DVec2::new(self.canvas_width as f64, self.canvas_height as f64)
    }

    /// Check the viewport can be rendered.
    pub fn validate(&self) -> Result<(), CanvasError> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(CanvasError::InvalidViewport(format!("scale {}", self.scale)));
        }
        if !self.pixel_size.is_finite() || self.pixel_size <= 0.0 {
            return Err(CanvasError::InvalidViewport(format!("pixel size {}", self.pixel_size)));
        }
        if !self.offset.is_finite() {
            return Err(CanvasError::InvalidViewport(format!("offset {}", self.offset)));
        }
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(CanvasError::InvalidViewport(format!(
                "canvas {}x{}",
                self.canvas_width, self.canvas_height
            )));
        }
        Ok(())
    }
}

/// A viewport mutation already resolved from raw input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportChange {
    /// Move by a screen-space delta.
    Pan { dx: f64, dy: f64 },
    /// Multiply scale by `factor`, keeping the world point under `anchor` fixed.
    Zoom { factor: f64, anchor: DVec2 },
    Resize { width: u32, height: u32 },
    /// Replace scale and offset outright.
    Set { scale: f64, offset: DVec2 },
}

/// Holds the current viewport and the last one that passed validation.
#[derive(Debug, Clone)]
pub struct ViewportController {
    current: Viewport,
    last_good: Viewport,
    min_scale: f64,
    max_scale: f64,
}

impl ViewportController {
    pub fn new(initial: Viewport, min_scale: f64, max_scale: f64) -> Self {
        let mut initial = initial;
        initial.scale = initial.scale.clamp(min_scale, max_scale);
        Self {
            current: initial,
            last_good: initial,
            min_scale,
            max_scale,
        }
    }

    #[inline]
    pub fn viewport(&self) -> &Viewport {
        &self.current
    }

    /// Apply a change. On error the last good viewport is restored and the
    /// error is returned for reporting only.
    pub fn apply(&mut self, change: ViewportChange) -> Result<(), CanvasError> {
        let mut next = self.current;
        match change {
            ViewportChange::Pan { dx, dy } => {
                next.offset += DVec2::new(dx, dy);
            }
            ViewportChange::Zoom { factor, anchor } => {
                if !factor.is_finite() || factor <= 0.0 {
                    return self.reject(CanvasError::InvalidViewport(format!("zoom factor {factor}")));
                }
                let world = (anchor - next.offset) / next.zoom();
                next.scale = (next.scale * factor).clamp(self.min_scale, self.max_scale);
                next.offset = anchor - world * next.zoom();
            }
            ViewportChange::Resize { width, height } => {
                next.canvas_width = width;
                next.canvas_height = height;
            }
            ViewportChange::Set { scale, offset } => {
                next.scale = if scale.is_finite() && scale > 0.0 {
                    scale.clamp(self.min_scale, self.max_scale)
                } else {
                    scale
                };
                next.offset = offset;
            }
        }

        match next.validate() {
            Ok(()) => {
                self.current = next;
                self.last_good = next;
                Ok(())
            }
            Err(err) => self.reject(err),
        }
    }

    fn reject(&mut self, err: CanvasError) -> Result<(), CanvasError> {
        warn!("{}; keeping last good viewport", err);
        self.current = self.last_good;
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::screen_to_world;

    fn controller() -> ViewportController {
        ViewportController::new(Viewport::new(1.0, DVec2::ZERO, 800, 600, 1.0), 0.05, 16.0)
    }

    #[test]
    fn test_pan() {
        let mut c = controller();
        c.apply(ViewportChange::Pan { dx: 10.0, dy: -5.0 }).unwrap();
        assert_eq!(c.viewport().offset, DVec2::new(10.0, -5.0));
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let mut c = controller();
        c.apply(ViewportChange::Pan { dx: 37.0, dy: 11.0 }).unwrap();
        let anchor = DVec2::new(300.0, 200.0);
        let before = screen_to_world(c.viewport(), anchor);
        c.apply(ViewportChange::Zoom { factor: 2.5, anchor }).unwrap();
        let after = screen_to_world(c.viewport(), anchor);
        assert!((before - after).length() < 1e-9);
        assert_eq!(c.viewport().scale, 2.5);
    }

    #[test]
    fn test_zoom_clamped_to_limits() {
        let mut c = controller();
        c.apply(ViewportChange::Zoom { factor: 1000.0, anchor: DVec2::ZERO }).unwrap();
        assert_eq!(c.viewport().scale, 16.0);
        c.apply(ViewportChange::Zoom { factor: 1e-9, anchor: DVec2::ZERO }).unwrap();
        assert_eq!(c.viewport().scale, 0.05);
    }

    #[test]
    fn test_invalid_changes_keep_last_good() {
        let mut c = controller();
        c.apply(ViewportChange::Pan { dx: 5.0, dy: 5.0 }).unwrap();
        let good = *c.viewport();

        assert!(c.apply(ViewportChange::Pan { dx: f64::NAN, dy: 0.0 }).is_err());
        assert_eq!(*c.viewport(), good);

        assert!(c.apply(ViewportChange::Resize { width: 0, height: 600 }).is_err());
        assert_eq!(*c.viewport(), good);

        assert!(c.apply(ViewportChange::Set { scale: 0.0, offset: DVec2::ZERO }).is_err());
        assert_eq!(*c.viewport(), good);

        assert!(c.apply(ViewportChange::Zoom { factor: f64::INFINITY, anchor: DVec2::ZERO }).is_err());
        assert_eq!(*c.viewport(), good);
    }

    #[test]
    fn test_zoom_never_divides_by_zero() {
        let v = Viewport::new(0.0, DVec2::ZERO, 0, 0, 1.0);
        assert!(v.zoom() > 0.0);
        assert!(v.validate().is_err());
    }
}
