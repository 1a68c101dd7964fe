//! Time primitives for skewline
//!
//! Every observer stamps events with its own clock:
//! - `Timestamp`: an observer-local instant
//! - `Skew`: a signed offset between two observers' clocks
//! - `SkewEstimate`: a skew, or the explicit "undetermined" outcome

use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::time::Duration;

/// Observer-local timestamp
/// Represented as microseconds since the observer's epoch
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    #[inline]
    pub fn from_micros(micros: i64) -> Self {
        Timestamp(micros)
    }

    #[inline]
    pub fn from_millis(millis: i64) -> Self {
        Timestamp(millis * 1000)
    }

    #[inline]
    pub fn from_secs(secs: i64) -> Self {
        Timestamp(secs * 1_000_000)
    }

    #[inline]
    pub fn from_secs_f64(secs: f64) -> Self {
        Timestamp((secs * 1_000_000.0) as i64)
    }

    #[inline]
    pub fn as_micros(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn as_millis(self) -> i64 {
        self.0 / 1000
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }
}

impl Sub<Timestamp> for Timestamp {
    type Output = Skew;

    #[inline]
    fn sub(self, rhs: Timestamp) -> Self::Output {
        Skew(self.0.saturating_sub(rhs.0))
    }
}

impl Add<Skew> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn add(self, rhs: Skew) -> Self::Output {
        Timestamp(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t({:.3}s)", self.as_secs_f64())
    }
}

/// Signed clock offset between two observers, in microseconds
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Skew(pub i64);

impl Skew {
    pub const ZERO: Skew = Skew(0);

    #[inline]
    pub fn from_micros(micros: i64) -> Self {
        Skew(micros)
    }

    #[inline]
    pub fn from_millis(millis: i64) -> Self {
        Skew(millis * 1000)
    }

    #[inline]
    pub fn from_secs(secs: i64) -> Self {
        Skew(secs * 1_000_000)
    }

    /// Positive skew from an unsigned duration (saturating)
    #[inline]
    pub fn from_duration(duration: Duration) -> Self {
        Skew(i64::try_from(duration.as_micros()).unwrap_or(i64::MAX))
    }

    #[inline]
    pub fn as_micros(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn as_millis(self) -> i64 {
        self.0 / 1000
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    #[inline]
    pub fn abs(self) -> Skew {
        Skew(self.0.saturating_abs())
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Neg for Skew {
    type Output = Skew;

    #[inline]
    fn neg(self) -> Self::Output {
        Skew(self.0.saturating_neg())
    }
}

impl Add for Skew {
    type Output = Skew;

    #[inline]
    fn add(self, rhs: Skew) -> Self::Output {
        Skew(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Skew {
    type Output = Skew;

    #[inline]
    fn sub(self, rhs: Skew) -> Self::Output {
        Skew(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Debug for Skew {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skew({:+.3}s)", self.as_secs_f64())
    }
}

impl fmt::Display for Skew {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+.3}s", self.as_secs_f64())
    }
}

/// Skew between an ordered pair of nodes
///
/// `Undetermined` means there was not enough correlated data. It is never
/// equal to a confirmed zero skew.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SkewEstimate {
    Determined(Skew),
    #[default]
    Undetermined,
}

impl SkewEstimate {
    #[inline]
    pub fn skew(self) -> Option<Skew> {
        match self {
            SkewEstimate::Determined(skew) => Some(skew),
            SkewEstimate::Undetermined => None,
        }
    }

    #[inline]
    pub fn is_determined(self) -> bool {
        matches!(self, SkewEstimate::Determined(_))
    }

    /// The estimate as seen from the other side of the pair
    #[inline]
    pub fn reversed(self) -> SkewEstimate {
        match self {
            SkewEstimate::Determined(skew) => SkewEstimate::Determined(-skew),
            SkewEstimate::Undetermined => SkewEstimate::Undetermined,
        }
    }
}

impl From<Option<Skew>> for SkewEstimate {
    fn from(skew: Option<Skew>) -> Self {
        skew.map_or(SkewEstimate::Undetermined, SkewEstimate::Determined)
    }
}
