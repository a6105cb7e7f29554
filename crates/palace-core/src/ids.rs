//! Record identifiers
//!
//! Ids are creation-time millisecond stamps, like the ones already present in
//! existing backups. Two records created within the same millisecond would
//! collide under a plain clock, so the generator never hands out a value less
//! than or equal to one it has already issued or observed.
//!
//! Ids coming from outside (backups) must not exceed [`MAX_ID`], the largest
//! integer a double-precision JSON reader keeps exact.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Largest id accepted from a backup: 2^53 - 1
pub const MAX_ID: i64 = (1 << 53) - 1;

/// Strictly increasing, clock-derived id source
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next id
    ///
    /// Saturates at `i64::MAX`; the collection rejects the repeated id as a
    /// duplicate rather than wrapping around.
    pub fn next_id(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(last, candidate, Ordering::SeqCst, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }

    /// Record an id that exists elsewhere (e.g. loaded from disk)
    ///
    /// Later ids are guaranteed to be greater than it.
    pub fn observe(&self, id: i64) {
        self.last.fetch_max(id, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_strictly_increase() {
        let ids = IdGenerator::new();
        let issued: Vec<i64> = (0..1000).map(|_| ids.next_id()).collect();
        assert!(issued.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_ids_are_clock_based() {
        let before = Utc::now().timestamp_millis();
        let id = IdGenerator::new().next_id();
        assert!(id >= before);
    }

    #[test]
    fn test_observe_pushes_past_existing_ids() {
        let ids = IdGenerator::new();
        let far_future = Utc::now().timestamp_millis() + 1_000_000;
        ids.observe(far_future);
        assert_eq!(ids.next_id(), far_future + 1);

        // Observing a smaller id changes nothing
        ids.observe(5);
        assert_eq!(ids.next_id(), far_future + 2);
    }

    #[test]
    fn test_largest_id_does_not_overflow() {
        let ids = IdGenerator::new();
        ids.observe(i64::MAX);
        assert_eq!(ids.next_id(), i64::MAX);
        assert_eq!(ids.next_id(), i64::MAX);
    }
}
