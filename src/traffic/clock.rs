//! Time sources for traffic records.

use std::time::Instant;

use chrono::{DateTime, Utc};

/// Supplies wall-clock time and a sub-millisecond fraction.
pub trait ClockSource: Send + Sync + std::fmt::Debug {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Fractional-millisecond component of a monotonic high-resolution
    /// clock, in thousandths of a millisecond (0..=999).
    ///
    /// Not monotonic across calls.
    fn sub_millis(&self) -> u16;
}

/// The system clock, paired with a monotonic timer started at construction.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sub_millis(&self) -> u16 {
        let nanos = self.origin.elapsed().as_nanos();
        ((nanos % 1_000_000) / 1_000) as u16
    }
}

/// A clock frozen at a given instant. Used in tests.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: DateTime<Utc>,
    sub_millis: u16,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>, sub_millis: u16) -> Self {
        Self {
            now,
            sub_millis: sub_millis.min(999),
        }
    }
}

impl ClockSource for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn sub_millis(&self) -> u16 {
        self.sub_millis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_fraction_in_range() {
        let clock = SystemClock::new();
        for _ in 0..1000 {
            assert!(clock.sub_millis() <= 999);
        }
    }

    #[test]
    fn test_fixed_clock_clamps_fraction() {
        let clock = FixedClock::new(Utc::now(), 5000);
        assert_eq!(clock.sub_millis(), 999);
    }
}
