//! Paint surface abstraction.

use codec::Color;

/// The only drawing primitive the renderer needs.
pub trait PaintSurface {
    fn clear(&mut self);

    /// Fill a `size`×`size` square with its top-left corner at `(x, y)`
    /// in screen pixels.
    fn fill_rect(&mut self, x: f64, y: f64, size: f64, color: Color);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawOp {
    Clear,
    Rect { x: f64, y: f64, size: f64, color: Color },
}

/// Surface that records every call.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Rects drawn since the last clear.
    pub fn rects(&self) -> impl Iterator<Item = (f64, f64, f64, Color)> + '_ {
        let start = self
            .ops
            .iter()
            .rposition(|op| matches!(op, DrawOp::Clear))
            .map_or(0, |i| i + 1);
        self.ops[start..].iter().filter_map(|op| match *op {
            DrawOp::Rect { x, y, size, color } => Some((x, y, size, color)),
            DrawOp::Clear => None,
        })
    }

    pub fn take(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }
}

impl PaintSurface for RecordingSurface {
    fn clear(&mut self) {
        self.ops.push(DrawOp::Clear);
    }

    fn fill_rect(&mut self, x: f64, y: f64, size: f64, color: Color) {
        self.ops.push(DrawOp::Rect { x, y, size, color });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rects_since_last_clear() {
        let mut surface = RecordingSurface::new();
        surface.fill_rect(0.0, 0.0, 1.0, Color::new(1, 1, 1));
        surface.clear();
        surface.fill_rect(2.0, 3.0, 4.0, Color::new(9, 9, 9));
        let rects: Vec<_> = surface.rects().collect();
        assert_eq!(rects, vec![(2.0, 3.0, 4.0, Color::new(9, 9, 9))]);
        assert_eq!(surface.take().len(), 3);
        assert!(surface.ops().is_empty());
    }
}
