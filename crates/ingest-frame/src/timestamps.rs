//! Timestamp representations for ingestion frames.
//!
//! A frame carries exactly one of two representations: a uniform sampling
//! clock (start, period, count) or an explicit list of instants. Both use
//! Unix epoch nanoseconds. Row extraction splits either representation at
//! the cut so sub-frames keep consistent timestamps.

use serde::{Deserialize, Serialize};

/// Uniform sampling clock: `count` instants starting at `start_nanos`,
/// spaced `period_nanos` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingClock {
    /// First instant (Unix nanoseconds).
    pub start_nanos: i64,
    /// Sampling period (nanoseconds).
    pub period_nanos: i64,
    /// Number of instants.
    pub count: usize,
}

impl SamplingClock {
    /// Creates a clock covering `count` instants.
    pub fn new(start_nanos: i64, period_nanos: i64, count: usize) -> Self {
        Self {
            start_nanos,
            period_nanos,
            count,
        }
    }

    /// The instant at `index`, or `None` past the end.
    pub fn instant(&self, index: usize) -> Option<i64> {
        (index < self.count).then(|| self.start_nanos + index as i64 * self.period_nanos)
    }

    /// The last instant covered, or `None` for an empty clock.
    pub fn end_nanos(&self) -> Option<i64> {
        self.count.checked_sub(1).and_then(|i| self.instant(i))
    }
}

/// Closed time interval covered by a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDomain {
    pub begin_nanos: i64,
    pub end_nanos: i64,
}

impl TimeDomain {
    pub fn new(begin_nanos: i64, end_nanos: i64) -> Self {
        Self {
            begin_nanos,
            end_nanos,
        }
    }
}

/// The timestamp axis of a frame: exactly one representation at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameTimestamps {
    /// Uniform sampling clock.
    Clock(SamplingClock),
    /// Explicit list of instants (Unix nanoseconds), ascending by convention.
    List(Vec<i64>),
}

impl FrameTimestamps {
    /// Number of instants covered.
    pub fn len(&self) -> usize {
        match self {
            Self::Clock(clock) => clock.count,
            Self::List(instants) => instants.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The instant at `index`, or `None` past the end.
    pub fn instant(&self, index: usize) -> Option<i64> {
        match self {
            Self::Clock(clock) => clock.instant(index),
            Self::List(instants) => instants.get(index).copied(),
        }
    }

    /// The first instant, or `None` when empty.
    pub fn first(&self) -> Option<i64> {
        self.instant(0)
    }

    /// Splits off the first `n` instants, leaving the remainder in `self`.
    ///
    /// A clock splits into two clocks at the cut; a list is divided in
    /// place. `n` is clamped to the available count.
    pub(crate) fn split_head(&mut self, n: usize) -> FrameTimestamps {
        match self {
            Self::Clock(clock) => {
                let n = n.min(clock.count);
                let head = SamplingClock::new(clock.start_nanos, clock.period_nanos, n);
                clock.start_nanos += n as i64 * clock.period_nanos;
                clock.count -= n;
                Self::Clock(head)
            }
            Self::List(instants) => {
                let n = n.min(instants.len());
                let rest = instants.split_off(n);
                Self::List(std::mem::replace(instants, rest))
            }
        }
    }
}

impl Default for FrameTimestamps {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_instants() {
        let clock = SamplingClock::new(1_000, 10, 3);
        assert_eq!(clock.instant(0), Some(1_000));
        assert_eq!(clock.instant(2), Some(1_020));
        assert_eq!(clock.instant(3), None);
        assert_eq!(clock.end_nanos(), Some(1_020));
    }

    #[test]
    fn split_clock_at_cut() {
        let mut ts = FrameTimestamps::Clock(SamplingClock::new(0, 5, 10));
        let head = ts.split_head(4);
        assert_eq!(head, FrameTimestamps::Clock(SamplingClock::new(0, 5, 4)));
        assert_eq!(ts, FrameTimestamps::Clock(SamplingClock::new(20, 5, 6)));
    }

    #[test]
    fn split_list_at_cut() {
        let mut ts = FrameTimestamps::List(vec![1, 2, 3, 4, 5]);
        let head = ts.split_head(2);
        assert_eq!(head, FrameTimestamps::List(vec![1, 2]));
        assert_eq!(ts, FrameTimestamps::List(vec![3, 4, 5]));
    }

    #[test]
    fn split_clamps_to_available() {
        let mut ts = FrameTimestamps::List(vec![7, 8]);
        let head = ts.split_head(10);
        assert_eq!(head.len(), 2);
        assert!(ts.is_empty());
    }
}
