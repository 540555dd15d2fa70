//! Single-flight gate for viewport-driven expansion checks.
//!
//! Pan/zoom/tap events request a check. At most one check runs at a time and a
//! request that arrives while one is running, or within the debounce window of
//! the last accepted check, is dropped rather than queued. Callers simply ask
//! again on the next qualifying event.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

const NEVER: u64 = u64::MAX;

/// Why a check request was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckSkipped {
    InFlight,
    Debounced,
}

/// Non-blocking try-lock with a debounce window.
#[derive(Debug)]
pub struct ExpansionGuard {
    in_flight: AtomicBool,
    epoch: Instant,
    /// Milliseconds since `epoch` of the last accepted check, or `NEVER`.
    last_started_ms: AtomicU64,
    debounce: Duration,
    dropped: AtomicU64,
}

impl ExpansionGuard {
    pub fn new(debounce: Duration) -> Arc<Self> {
        Arc::new(Self {
            in_flight: AtomicBool::new(false),
            epoch: Instant::now(),
            last_started_ms: AtomicU64::new(NEVER),
            debounce,
            dropped: AtomicU64::new(0),
        })
    }

    /// Try to start a check. The returned ticket re-arms the guard when dropped.
    pub fn try_begin(self: &Arc<Self>, now: Instant) -> Result<ExpansionTicket, CheckSkipped> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(CheckSkipped::InFlight);
        }

        let now_ms = now.saturating_duration_since(self.epoch).as_millis() as u64;
        let last = self.last_started_ms.load(Ordering::Acquire);
        if last != NEVER && now_ms.saturating_sub(last) < self.debounce.as_millis() as u64 {
            self.in_flight.store(false, Ordering::Release);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(CheckSkipped::Debounced);
        }

        self.last_started_ms.store(now_ms, Ordering::Release);
        Ok(ExpansionTicket {
            guard: Arc::clone(self),
        })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Requests dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Proof that a check is running.
#[derive(Debug)]
pub struct ExpansionTicket {
    guard: Arc<ExpansionGuard>,
}

impl Drop for ExpansionTicket {
    fn drop(&mut self) {
        self.guard.in_flight.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_while_in_flight_is_dropped() {
        let guard = ExpansionGuard::new(Duration::ZERO);
        let now = Instant::now();
        let ticket = guard.try_begin(now).unwrap();
        assert!(guard.is_in_flight());
        assert_eq!(guard.try_begin(now).unwrap_err(), CheckSkipped::InFlight);
        drop(ticket);
        assert!(!guard.is_in_flight());
        assert!(guard.try_begin(now).is_ok());
        assert_eq!(guard.dropped(), 1);
    }

    #[test]
    fn test_debounce_window() {
        let guard = ExpansionGuard::new(Duration::from_millis(1000));
        let start = Instant::now();
        drop(guard.try_begin(start).unwrap());
        assert_eq!(
            guard.try_begin(start + Duration::from_millis(400)).unwrap_err(),
            CheckSkipped::Debounced
        );
        // Debounced requests do not leave the guard held.
        assert!(!guard.is_in_flight());
        assert!(guard.try_begin(start + Duration::from_millis(1200)).is_ok());
    }
}
