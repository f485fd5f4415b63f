//! Recovers displayable breakpoints from anything that answers ramp queries.
//!
//! The scan only needs [`RampQuery`], so it works on a built [`Envelope`] as
//! well as on any other source shaped like a mixer's ramp lookup.

use std::collections::BTreeMap;
use tracing::warn;

use crate::{
    envelope::push_breakpoint, Breakpoint, EnvelopeKey, EnvelopeTable, RampQuery, RationalTime,
    RESTING_VALUE,
};

/// Walk the ramps of `source` from time zero and flatten them into breakpoints.
///
/// The curve is padded towards `[0, total_duration]`. A first ramp that starts
/// later from the resting value gets a flat leading point `(0, RESTING_VALUE)`.
/// A first ramp starting from any other value is left undefined before it, as
/// the mixer would jump there. When the last ramp ends early a flat trailing
/// point holds its end value at `total_duration`. A source without ramps rests
/// at [`RESTING_VALUE`] for the whole timeline.
pub fn reconstruct_envelope<Q>(source: &Q, total_duration: RationalTime) -> Vec<Breakpoint>
where
    Q: RampQuery + ?Sized,
{
    let mut points = Vec::new();
    let mut cursor = RationalTime::ZERO;
    let mut last_value = RESTING_VALUE;

    while let Some(ramp) = source.ramp_from(cursor) {
        let start = ramp.interval.start;
        let end = ramp.interval.end();

        if points.is_empty() && start > RationalTime::ZERO && ramp.start_value == RESTING_VALUE {
            points.push(Breakpoint::new(RationalTime::ZERO, RESTING_VALUE));
        }
        push_breakpoint(&mut points, Breakpoint::new(start, ramp.start_value));
        push_breakpoint(&mut points, Breakpoint::new(end, ramp.end_value));
        last_value = ramp.end_value;

        let advanced = end > cursor;
        if !advanced {
            warn!(%cursor, ramp = %ramp.interval, "ramp query did not advance; stopping scan");
            break;
        }
        cursor = end;
    }

    if points.is_empty() {
        points.push(Breakpoint::new(RationalTime::ZERO, RESTING_VALUE));
    }
    if cursor < total_duration {
        push_breakpoint(&mut points, Breakpoint::new(total_duration, last_value));
    }

    points
}

/// Reconstruct every envelope of a timeline.
pub fn reconstruct_table(
    envelopes: &EnvelopeTable,
    total_duration: RationalTime,
) -> BTreeMap<EnvelopeKey, Vec<Breakpoint>> {
    envelopes
        .iter()
        .map(|(key, envelope)| (*key, reconstruct_envelope(envelope, total_duration)))
        .collect()
}
