//! Piecewise-linear envelopes built from ramp segments.
//!
//! The builder writes ramps the way a mixer's input parameters take them: a
//! start value, an end value and the time range the ramp covers. Breakpoints
//! are derived from those ramps, never stored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::{EnvelopeKey, RationalTime, TimeInterval, TimelineError};

/// Value of any parameter that has no envelope, and of an untouched mixer input.
pub const RESTING_VALUE: f32 = 1.0;

pub type EnvelopeTable = BTreeMap<EnvelopeKey, Envelope>;

/// One vertex of a piecewise-linear envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub time: RationalTime,
    pub value: f32,
}

impl Breakpoint {
    pub fn new(time: RationalTime, value: f32) -> Self {
        Self { time, value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RampSegment {
    pub interval: TimeInterval,
    pub start_value: f32,
    pub end_value: f32,
}

impl RampSegment {
    fn overlaps(&self, interval: &TimeInterval) -> bool {
        self.interval.start < interval.end() && interval.start < self.interval.end()
    }
}

/// Forward-scanning access to the ramps of an envelope.
pub trait RampQuery {
    /// The ramp covering `time`, or the first ramp that starts after it.
    fn ramp_from(&self, time: RationalTime) -> Option<RampSegment>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub key: EnvelopeKey,
    segments: Vec<RampSegment>,
}

impl Envelope {
    pub fn new(key: EnvelopeKey) -> Self {
        Self {
            key,
            segments: Vec::new(),
        }
    }

    /// Add a ramp from `start_value` to `end_value` across `interval`.
    ///
    /// Empty intervals write nothing and adding the same ramp twice is a
    /// no-op. A ramp overlapping a different one is rejected.
    pub fn add_ramp(
        &mut self,
        start_value: f32,
        end_value: f32,
        interval: TimeInterval,
    ) -> Result<(), TimelineError> {
        for value in [start_value, end_value] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(TimelineError::InvalidRamp(format!(
                    "{}: value {} outside [0, 1]",
                    self.key, value
                )));
            }
        }
        if !interval.is_valid() {
            return Err(TimelineError::InvalidInterval(format!(
                "{}: ramp interval {}",
                self.key, interval
            )));
        }
        if interval.is_empty() {
            return Ok(());
        }

        let ramp = RampSegment {
            interval,
            start_value,
            end_value,
        };
        if self.segments.contains(&ramp) {
            return Ok(());
        }
        if let Some(existing) = self.segments.iter().find(|s| s.overlaps(&interval)) {
            return Err(TimelineError::InvalidRamp(format!(
                "{}: ramp {} overlaps {}",
                self.key, interval, existing.interval
            )));
        }

        let idx = self
            .segments
            .partition_point(|s| s.interval.start < interval.start);
        self.segments.insert(idx, ramp);
        Ok(())
    }

    pub fn segments(&self) -> &[RampSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The breakpoints the ramps describe, strictly increasing in time.
    pub fn breakpoints(&self) -> Vec<Breakpoint> {
        let mut points = Vec::with_capacity(self.segments.len() * 2);
        for segment in &self.segments {
            push_breakpoint(
                &mut points,
                Breakpoint::new(segment.interval.start, segment.start_value),
            );
            push_breakpoint(
                &mut points,
                Breakpoint::new(segment.interval.end(), segment.end_value),
            );
        }
        points
    }

    /// Value at `time`, read off the breakpoint curve: linear between
    /// points, flat before the first and after the last.
    pub fn value_at(&self, time: RationalTime) -> f32 {
        interpolate(&self.breakpoints(), time).unwrap_or(RESTING_VALUE)
    }
}

impl RampQuery for Envelope {
    fn ramp_from(&self, time: RationalTime) -> Option<RampSegment> {
        self.segments
            .iter()
            .find(|s| s.interval.end() > time)
            .copied()
    }
}

/// Linear interpolation over breakpoints sorted by strictly increasing time.
///
/// Holds the first value before the curve and the last value after it.
/// `None` for an empty curve or an indefinite `time`.
pub fn interpolate(points: &[Breakpoint], time: RationalTime) -> Option<f32> {
    let first = points.first()?;
    if !time.is_valid() {
        return None;
    }
    if time <= first.time {
        return Some(first.value);
    }

    let idx = points.partition_point(|p| p.time <= time);
    let prev = points[idx - 1];
    let Some(next) = points.get(idx) else {
        return Some(prev.value);
    };
    let span = (next.time - prev.time).as_seconds();
    let t = ((time - prev.time).as_seconds() / span).clamp(0.0, 1.0) as f32;
    Some(prev.value + (next.value - prev.value) * t)
}

/// Append `point`, folding it into the last point when both share a time.
pub(crate) fn push_breakpoint(points: &mut Vec<Breakpoint>, point: Breakpoint) {
    match points.last_mut() {
        Some(last) if last.time == point.time => {
            if last.value != point.value {
                warn!(
                    time = %point.time,
                    from = last.value,
                    to = point.value,
                    "envelope jumps at a single instant; keeping the later value"
                );
                last.value = point.value;
            }
        }
        _ => points.push(point),
    }
}
