//! Identifier generation.
//!
//! Ids are wall-clock milliseconds, bumped past the last issued id whenever
//! two entries land in the same millisecond (or the clock steps backwards).
//! Ids assigned by callers only raise the floor up to [`MAX_SAFE_ID`].

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use crate::types::LogId;

/// Largest id a caller-assigned id may push the generator to.
///
/// This is the largest integer a JSON client holding ids as doubles can
/// represent exactly. Larger ids are stored but never become the floor.
pub const MAX_SAFE_ID: u64 = (1 << 53) - 1;

/// Issues strictly increasing, millisecond-derived [`LogId`]s.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicU64,
}

impl IdGenerator {
    /// Creates a generator that has issued nothing yet.
    #[must_use]
    pub const fn new() -> Self {
        Self::seeded(0)
    }

    /// Creates a generator whose next id is greater than `last`, with
    /// `last` capped at [`MAX_SAFE_ID`].
    #[must_use]
    pub const fn seeded(last: u64) -> Self {
        let last = if last > MAX_SAFE_ID { MAX_SAFE_ID } else { last };
        Self {
            last: AtomicU64::new(last),
        }
    }

    /// Issues the next id based on the current time.
    pub fn next(&self) -> LogId {
        self.next_at(now_millis())
    }

    /// Issues the next id as if the current time were `now_ms`.
    pub fn next_at(&self, now_ms: u64) -> LogId {
        let mut current = self.last.load(Ordering::Acquire);
        loop {
            let candidate = now_ms.max(current.saturating_add(1));
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return LogId(candidate),
                Err(actual) => current = actual,
            }
        }
    }

    /// Records an id assigned elsewhere so later ids stay above it.
    ///
    /// Ids above [`MAX_SAFE_ID`] are ignored.
    pub fn observe(&self, id: LogId) {
        if id.0 <= MAX_SAFE_ID {
            self.last.fetch_max(id.0, Ordering::AcqRel);
        }
    }

    /// Returns the most recently issued or observed id.
    #[must_use]
    pub fn last(&self) -> u64 {
        self.last.load(Ordering::Acquire)
    }
}

fn now_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn uses_clock_when_ahead() {
        let ids = IdGenerator::seeded(100);
        assert_eq!(ids.next_at(5_000), LogId(5_000));
        assert_eq!(ids.last(), 5_000);
    }

    #[test]
    fn same_millisecond_bumps() {
        let ids = IdGenerator::new();
        assert_eq!(ids.next_at(1_000), LogId(1_000));
        assert_eq!(ids.next_at(1_000), LogId(1_001));
        assert_eq!(ids.next_at(1_000), LogId(1_002));
    }

    #[test]
    fn clock_going_backwards_still_increases() {
        let ids = IdGenerator::seeded(10_000);
        assert_eq!(ids.next_at(9_000), LogId(10_001));
    }

    #[test]
    fn observe_raises_floor() {
        let ids = IdGenerator::new();
        ids.observe(LogId(u64::from(u32::MAX)));
        assert_eq!(ids.next_at(1), LogId(u64::from(u32::MAX) + 1));

        // Observing a lower id never lowers the floor.
        ids.observe(LogId(3));
        assert_eq!(ids.last(), u64::from(u32::MAX) + 1);
    }

    #[test]
    fn oversized_ids_do_not_pin_the_generator() {
        let ids = IdGenerator::new();
        ids.observe(LogId(u64::MAX));
        ids.observe(LogId(MAX_SAFE_ID + 1));

        let first = ids.next_at(1_000);
        let second = ids.next_at(1_000);
        assert_eq!(first, LogId(1_000));
        assert_eq!(second, LogId(1_001));
    }

    #[test]
    fn safe_ceiling_is_still_observed() {
        let ids = IdGenerator::new();
        ids.observe(LogId(MAX_SAFE_ID));
        assert_eq!(ids.next_at(1), LogId(MAX_SAFE_ID + 1));
        assert_ne!(ids.next_at(1), LogId(MAX_SAFE_ID + 1));
    }

    #[test]
    fn seed_is_capped() {
        let ids = IdGenerator::seeded(u64::MAX);
        assert_eq!(ids.last(), MAX_SAFE_ID);
        assert!(ids.next_at(1) > LogId(MAX_SAFE_ID));
    }

    #[test]
    fn wall_clock_ids_are_recent() {
        let ids = IdGenerator::new();
        let id = ids.next();
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap();
        assert!(id.0 <= now);
        assert!(now - id.0 < 60_000);
    }

    #[test]
    fn concurrent_ids_are_unique() {
        let ids = Arc::new(IdGenerator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || (0..500).map(|_| ids.next_at(42)).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 4_000);
    }
}
