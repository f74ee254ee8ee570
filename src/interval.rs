use std::fmt;
use std::ops::{Add, Sub};
use std::time::Duration;

/// A non-negative span of virtual time, measured in integer ticks.
///
/// `TimeInterval` never goes negative: every arithmetic operation saturates
/// at zero instead of panicking or wrapping. This matches the handle's
/// contract, where a sink can never be reported to have consumed more than
/// it was granted, and subtracting a larger value from a smaller one should
/// just mean "nothing left", not a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeInterval(u64);

impl TimeInterval {
    /// The zero-length interval.
    pub const EMPTY: TimeInterval = TimeInterval(0);

    /// Builds an interval from a raw tick count.
    #[inline]
    pub const fn from_ticks(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Returns the number of ticks this interval spans.
    #[inline]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Returns `true` if this is the zero interval.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `self - other`, saturating at [`TimeInterval::EMPTY`].
    #[inline]
    pub const fn saturating_sub(self, other: TimeInterval) -> TimeInterval {
        Self(self.0.saturating_sub(other.0))
    }

    /// `self + other`, saturating at `u64::MAX`.
    #[inline]
    pub const fn saturating_add(self, other: TimeInterval) -> TimeInterval {
        Self(self.0.saturating_add(other.0))
    }
}

impl From<Duration> for TimeInterval {
    /// Converts a wall-clock duration into a tick count (nanosecond resolution).
    ///
    /// This is a convenience for callers that think in `Duration`; the handle
    /// itself never reads the wall clock (see Non-goals).
    fn from(d: Duration) -> Self {
        Self(d.as_nanos().min(u64::MAX as u128) as u64)
    }
}

impl Add for TimeInterval {
    type Output = TimeInterval;
    fn add(self, rhs: TimeInterval) -> TimeInterval {
        self.saturating_add(rhs)
    }
}

impl Sub for TimeInterval {
    type Output = TimeInterval;
    fn sub(self, rhs: TimeInterval) -> TimeInterval {
        self.saturating_sub(rhs)
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}t", self.0)
    }
}
