//! Exact rational time values and intervals.
//!
//! Every clip boundary, placement and window in the timeline is computed with
//! [`RationalTime`], so no floating point drift ever reaches the composition.
//! Seconds as `f64` are only produced for display.

use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    fmt,
    ops::{Add, Sub},
};

use crate::TimelineError;

/// A signed fraction `value / timescale` of seconds.
///
/// A timescale of zero (or below) marks the indefinite/invalid time. Invalid
/// times never order: every comparison against one is false, like `NaN`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RationalTime {
    pub value: i64,
    pub timescale: i32,
}

impl RationalTime {
    pub const ZERO: Self = Self {
        value: 0,
        timescale: 1,
    };

    pub const INVALID: Self = Self {
        value: 0,
        timescale: 0,
    };

    pub fn new(value: i64, timescale: i32) -> Self {
        assert!(timescale > 0, "RationalTime timescale must be > 0");
        Self { value, timescale }
    }

    pub fn from_seconds(seconds: f64, timescale: i32) -> Self {
        if !seconds.is_finite() || timescale <= 0 {
            return Self::INVALID;
        }
        Self {
            value: (seconds * timescale as f64).round() as i64,
            timescale,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.timescale > 0
    }

    pub fn is_zero(&self) -> bool {
        self.is_valid() && self.value == 0
    }

    pub fn is_negative(&self) -> bool {
        self.is_valid() && self.value < 0
    }

    pub fn as_seconds(&self) -> f64 {
        if !self.is_valid() {
            return f64::NAN;
        }
        self.value as f64 / self.timescale as f64
    }

    /// Halve exactly by doubling the timescale.
    ///
    /// Falls back to halving the value when the doubled timescale would not
    /// fit, which only rounds for odd values at timescales beyond `i32::MAX / 2`.
    pub fn half(self) -> Self {
        if !self.is_valid() {
            return self;
        }
        match self.timescale.checked_mul(2) {
            Some(timescale) => Self {
                value: self.value,
                timescale,
            },
            None => Self {
                value: self.value / 2,
                timescale: self.timescale,
            },
        }
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.combine(other, |a, b| a + b)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.combine(other, |a, b| a - b)
    }

    /// The smaller of two times. Invalid if either side is invalid.
    pub fn min(self, other: Self) -> Self {
        match self.partial_cmp(&other) {
            Some(Ordering::Greater) => other,
            Some(_) => self,
            None => Self::INVALID,
        }
    }

    /// The larger of two times. Invalid if either side is invalid.
    pub fn max(self, other: Self) -> Self {
        match self.partial_cmp(&other) {
            Some(Ordering::Less) => other,
            Some(_) => self,
            None => Self::INVALID,
        }
    }

    fn combine(self, other: Self, op: impl Fn(i128, i128) -> i128) -> Option<Self> {
        if !self.is_valid() || !other.is_valid() {
            return None;
        }

        if self.timescale == other.timescale {
            let value = op(self.value as i128, other.value as i128);
            return Self::from_parts(value, self.timescale as i128);
        }

        let (a, b) = (self.timescale as i128, other.timescale as i128);
        let lcm = a / gcd(a, b) * b;
        let value = op(self.value as i128 * (lcm / a), other.value as i128 * (lcm / b));
        Self::from_parts(value, lcm)
    }

    fn from_parts(value: i128, timescale: i128) -> Option<Self> {
        let fits = |v: i128, ts: i128| i64::try_from(v).is_ok() && i32::try_from(ts).is_ok();

        let (value, timescale) = if fits(value, timescale) {
            (value, timescale)
        } else {
            let g = gcd(value, timescale);
            (value / g, timescale / g)
        };

        Some(Self {
            value: i64::try_from(value).ok()?,
            timescale: i32::try_from(timescale).ok()?,
        })
    }
}

fn gcd(a: i128, b: i128) -> i128 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

impl Default for RationalTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for RationalTime {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for RationalTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if !self.is_valid() || !other.is_valid() {
            return None;
        }
        let lhs = self.value as i128 * other.timescale as i128;
        let rhs = other.value as i128 * self.timescale as i128;
        Some(lhs.cmp(&rhs))
    }
}

impl Add for RationalTime {
    type Output = Self;

    /// Invalid operands propagate. Overflowing `i64` ticks panics.
    fn add(self, other: Self) -> Self {
        if !self.is_valid() || !other.is_valid() {
            return Self::INVALID;
        }
        self.checked_add(other)
            .unwrap_or_else(|| panic!("rational time overflow: {self} + {other}"))
    }
}

impl Sub for RationalTime {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        if !self.is_valid() || !other.is_valid() {
            return Self::INVALID;
        }
        self.checked_sub(other)
            .unwrap_or_else(|| panic!("rational time overflow: {self} - {other}"))
    }
}

impl fmt::Display for RationalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            write!(f, "indefinite")
        } else if self.timescale == 1 {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{}/{}", self.value, self.timescale)
        }
    }
}

/// A `[start, start + duration)` range on the timeline or inside a clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: RationalTime,
    pub duration: RationalTime,
}

impl TimeInterval {
    /// Panics on a negative duration; use [`TimeInterval::try_new`] for
    /// caller-supplied ranges.
    pub fn new(start: RationalTime, duration: RationalTime) -> Self {
        assert!(
            !duration.is_negative(),
            "TimeInterval duration must not be negative (start {start}, duration {duration})"
        );
        Self { start, duration }
    }

    pub fn try_new(start: RationalTime, duration: RationalTime) -> Result<Self, TimelineError> {
        let interval = Self { start, duration };
        if !interval.is_valid() {
            return Err(TimelineError::InvalidInterval(format!(
                "start {start}, duration {duration}"
            )));
        }
        Ok(interval)
    }

    pub fn from_start_end(start: RationalTime, end: RationalTime) -> Self {
        Self::new(start, end - start)
    }

    pub fn end(&self) -> RationalTime {
        self.start + self.duration
    }

    /// `end()` without the overflow panic, for ranges read from untrusted input.
    pub fn checked_end(&self) -> Option<RationalTime> {
        self.start.checked_add(self.duration)
    }

    pub fn is_empty(&self) -> bool {
        self.duration.is_zero()
    }

    pub fn is_valid(&self) -> bool {
        self.start.is_valid() && self.duration.is_valid() && !self.duration.is_negative()
    }

    pub fn contains(&self, time: RationalTime) -> bool {
        time >= self.start && time < self.end()
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}
