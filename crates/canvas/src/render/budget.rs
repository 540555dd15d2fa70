/// Per-frame draw allowance.
///
/// Counted in draw calls, not wall-clock time, so a frame truncates at the
/// same point on every run with the same input.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameBudget {
    remaining: u32,
    exhausted: bool,
}

impl FrameBudget {
    pub fn new(units: u32) -> Self {
        Self {
            remaining: units,
            exhausted: false,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Whether a consume request has been refused this frame.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Take one unit. Returns false (and latches exhaustion) when none is left.
    pub fn try_consume(&mut self) -> bool {
        if self.remaining == 0 {
            self.exhausted = true;
            return false;
        }
        self.remaining -= 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::FrameBudget;

    #[test]
    fn latches_exhaustion() {
        let mut budget = FrameBudget::new(2);
        assert!(budget.try_consume());
        assert!(budget.try_consume());
        assert_eq!(budget.remaining(), 0);
        assert!(!budget.is_exhausted());
        assert!(!budget.try_consume());
        assert!(budget.is_exhausted());
    }
}
