//! Log identifiers and high-fidelity timestamps.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::traffic::clock::ClockSource;

/// Alphabet for log identifiers.
pub const ID_ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of a log identifier.
pub const ID_LENGTH: usize = 7;

/// Source of uniformly distributed indices.
pub trait RandomSource: Send + Sync + std::fmt::Debug {
    /// Returns a value in `0..bound`.
    fn next_index(&self, bound: usize) -> usize;
}

/// Thread-local RNG from `rand`. Not cryptographically meaningful here;
/// identifiers only need to avoid collisions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_index(&self, bound: usize) -> usize {
        rand::thread_rng().gen_range(0..bound)
    }
}

/// Generates log ids and high-fidelity timestamps.
#[derive(Debug, Clone)]
pub struct IdentifierGenerator {
    clock: Arc<dyn ClockSource>,
    random: Arc<dyn RandomSource>,
}

impl IdentifierGenerator {
    pub fn new(clock: Arc<dyn ClockSource>, random: Arc<dyn RandomSource>) -> Self {
        Self { clock, random }
    }

    /// Seven characters from `[a-z0-9]`, drawn with replacement.
    pub fn new_id(&self) -> String {
        (0..ID_LENGTH)
            .map(|_| ID_ALPHABET[self.random.next_index(ID_ALPHABET.len())] as char)
            .collect()
    }

    /// Millisecond epoch time followed by a 3-digit sub-millisecond fraction.
    pub fn high_fidelity_timestamp(&self) -> String {
        self.high_fidelity_timestamp_at(self.clock.now())
    }

    /// Same as [`high_fidelity_timestamp`](Self::high_fidelity_timestamp),
    /// with the wall-clock part taken from `now`.
    pub fn high_fidelity_timestamp_at(&self, now: DateTime<Utc>) -> String {
        format!("{}{:03}", now.timestamp_millis(), self.clock.sub_millis().min(999))
    }

    pub fn clock(&self) -> &Arc<dyn ClockSource> {
        &self.clock
    }
}
