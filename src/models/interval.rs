//! Half-open time intervals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A `[start, end)` interval in UTC.
///
/// The end bound is exclusive, so two back-to-back intervals never
/// overlap and contiguous scheduling works without gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    /// Create an interval, rejecting empty or inverted bounds.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, String> {
        if start >= end {
            return Err(format!("interval start {} must precede end {}", start, end));
        }
        Ok(Self { start, end })
    }

    /// Overlap predicate: `s1 < e2 && s2 < e1`.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, 0).unwrap()
    }

    fn interval(h1: u32, m1: u32, h2: u32, m2: u32) -> TimeInterval {
        TimeInterval::new(at(h1, m1), at(h2, m2)).unwrap()
    }

    #[test]
    fn test_rejects_inverted_and_empty_bounds() {
        assert!(TimeInterval::new(at(10, 0), at(10, 0)).is_err());
        assert!(TimeInterval::new(at(11, 0), at(10, 0)).is_err());
    }

    #[test]
    fn test_partial_overlap() {
        let first = interval(10, 0, 10, 30);
        let second = interval(10, 15, 10, 45);
        assert!(first.overlaps(&second));
        assert!(second.overlaps(&first));
    }

    #[test]
    fn test_containment_overlaps() {
        let outer = interval(9, 0, 12, 0);
        let inner = interval(10, 0, 10, 30);
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn test_back_to_back_does_not_overlap() {
        let first = interval(10, 0, 10, 30);
        let second = interval(10, 30, 11, 0);
        assert!(!first.overlaps(&second));
        assert!(!second.overlaps(&first));
    }

    #[test]
    fn test_disjoint_does_not_overlap() {
        let first = interval(9, 0, 9, 30);
        let second = interval(11, 0, 11, 30);
        assert!(!first.overlaps(&second));
    }

    fn timestamp() -> impl Strategy<Value = i64> {
        0i64..2_000_000_000
    }

    proptest! {
        #[test]
        fn prop_overlap_is_symmetric(s1 in timestamp(), d1 in 1i64..86_400, s2 in timestamp(), d2 in 1i64..86_400) {
            let a = TimeInterval::new(
                DateTime::from_timestamp(s1, 0).unwrap(),
                DateTime::from_timestamp(s1 + d1, 0).unwrap(),
            ).unwrap();
            let b = TimeInterval::new(
                DateTime::from_timestamp(s2, 0).unwrap(),
                DateTime::from_timestamp(s2 + d2, 0).unwrap(),
            ).unwrap();
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }

        #[test]
        fn prop_back_to_back_never_overlaps(s in timestamp(), d1 in 1i64..86_400, d2 in 1i64..86_400) {
            let first = TimeInterval::new(
                DateTime::from_timestamp(s, 0).unwrap(),
                DateTime::from_timestamp(s + d1, 0).unwrap(),
            ).unwrap();
            let second = TimeInterval::new(
                DateTime::from_timestamp(s + d1, 0).unwrap(),
                DateTime::from_timestamp(s + d1 + d2, 0).unwrap(),
            ).unwrap();
            prop_assert!(!first.overlaps(&second));
            prop_assert!(!second.overlaps(&first));
        }
    }
}
