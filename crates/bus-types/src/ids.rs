//! # Envelope Identifier Sources
//!
//! Identifier generation sits behind a port so hosts can choose their
//! generator and tests can pin a deterministic one. Production identifiers
//! are uniformly random non-negative 63-bit values; collision between two
//! live envelopes is not a handled case, it is statistically dismissed.

use std::sync::atomic::{AtomicI64, Ordering};

/// Source of envelope identifiers.
pub trait IdSource: Send + Sync {
    /// Produce the next identifier. Non-negative.
    fn next_id(&self) -> i64;
}

/// Production source: uniformly random 63-bit identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdSource;

impl RandomIdSource {
    /// Create a random source.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl IdSource for RandomIdSource {
    fn next_id(&self) -> i64 {
        // Drop the sign bit; identifiers stay non-negative.
        (rand::random::<u64>() >> 1) as i64
    }
}

/// Deterministic source for tests: hands out consecutive identifiers.
#[derive(Debug)]
pub struct CounterIdSource {
    next: AtomicI64,
}

impl CounterIdSource {
    /// Count from 1.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Count from `first`.
    #[must_use]
    pub fn starting_at(first: i64) -> Self {
        Self {
            next: AtomicI64::new(first),
        }
    }
}

impl Default for CounterIdSource {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSource for CounterIdSource {
    fn next_id(&self) -> i64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_ids_are_non_negative() {
        let source = RandomIdSource::new();
        for _ in 0..64 {
            assert!(source.next_id() >= 0);
        }
    }

    #[test]
    fn test_counter_hands_out_consecutive_ids() {
        let source = CounterIdSource::starting_at(10);
        assert_eq!(source.next_id(), 10);
        assert_eq!(source.next_id(), 11);
        assert_eq!(source.next_id(), 12);
    }
}
