//! Wall-clock timestamp used for the consensus deadline origin.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A Unix timestamp with millisecond precision.
///
/// Used as the deadline origin `T0` shared across the fleet: the
/// initiator stamps a poll with `Timestamp::now()`, and every
/// recipient adopts that value the first time they see it rather than
/// computing their own.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from milliseconds since the Unix epoch.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the current time as a timestamp.
    #[must_use]
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Self(duration.as_millis() as i64)
    }

    /// Returns the value in milliseconds since the Unix epoch.
    #[must_use]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Returns this timestamp plus `delta`.
    #[must_use]
    pub fn plus(&self, delta: Duration) -> Self {
        Self(self.0.saturating_add(delta.as_millis() as i64))
    }

    /// Returns the duration elapsed between `self` and `other`, or
    /// `Duration::ZERO` if `other` is not after `self`.
    #[must_use]
    pub fn elapsed_since(&self, other: Self) -> Duration {
        let diff = self.0.saturating_sub(other.0);
        if diff <= 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(diff as u64)
        }
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}ms)", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn timestamp_now_is_positive() {
        assert!(Timestamp::now().as_millis() > 0);
    }

    #[test]
    fn plus_adds_duration() {
        let t0 = Timestamp::from_millis(1_000);
        let t1 = t0.plus(Duration::from_secs(30));
        assert_eq!(t1.as_millis(), 31_000);
    }

    #[test]
    fn elapsed_since_is_zero_when_not_later() {
        let t0 = Timestamp::from_millis(1_000);
        let t1 = Timestamp::from_millis(500);
        assert_eq!(t0.elapsed_since(t0), Duration::ZERO);
        assert_eq!(t1.elapsed_since(t0), Duration::ZERO);
    }

    #[test]
    fn elapsed_since_measures_forward_gap() {
        let t0 = Timestamp::from_millis(1_000);
        let t1 = Timestamp::from_millis(4_500);
        assert_eq!(t1.elapsed_since(t0), Duration::from_millis(3_500));
    }
}
