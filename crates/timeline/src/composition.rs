//! Crossfade composition builder.
//!
//! Places an ordered clip catalog on two alternating lanes per media kind,
//! overlapping each adjacent pair by the transition duration, and derives the
//! pass-through and transition windows plus the opacity and volume ramps that
//! crossfade them.
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    assign_lane, ClipCatalog, CompositionStage, Envelope, EnvelopeKey, EnvelopeTable, LaneSlot,
    LaneTrack, MediaKind, RationalTime, TimeInterval, TimelineError, TimelineModel, Window,
};

pub const DEFAULT_TRANSITION_SECONDS: f64 = 2.0;
pub const DEFAULT_TIMESCALE: i32 = 600;

/// How volume ramps are written for the audio lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeRampPolicy {
    /// Lane 0 fades out and lane 1 fades in across the first transition
    /// window only, whatever the number of transitions. Later transitions
    /// play both audio lanes at full volume.
    FirstTransition,
    /// Every transition fades its outgoing lane out and its incoming lane in.
    PerTransition,
}

impl Default for VolumeRampPolicy {
    fn default() -> Self {
        Self::FirstTransition
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionConfig {
    /// Requested crossfade length, before clamping to the clips.
    pub transition_duration: RationalTime,
    pub volume_ramps: VolumeRampPolicy,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            transition_duration: RationalTime::from_seconds(
                DEFAULT_TRANSITION_SECONDS,
                DEFAULT_TIMESCALE,
            ),
            volume_ramps: VolumeRampPolicy::default(),
        }
    }
}

/// Build a timeline with the default volume ramp policy.
pub fn build(
    clips: &ClipCatalog,
    requested_transition_duration: RationalTime,
) -> Result<TimelineModel, TimelineError> {
    CompositionBuilder::new(CompositionConfig {
        transition_duration: requested_transition_duration,
        ..CompositionConfig::default()
    })
    .build(clips)
}

/// The requested duration, limited to half of every clip's trimmed duration.
pub fn effective_transition_duration(
    clips: &ClipCatalog,
    requested: RationalTime,
) -> RationalTime {
    match clips.shortest_trim_duration() {
        Some(shortest) => requested.min(shortest.half()),
        None => requested,
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompositionBuilder {
    config: CompositionConfig,
}

impl CompositionBuilder {
    pub fn new(config: CompositionConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, clips: &ClipCatalog) -> Result<TimelineModel, TimelineError> {
        let requested = self.config.transition_duration;
        validate(clips, requested)?;

        let transition = effective_transition_duration(clips, requested);
        if transition < requested {
            debug!(
                %requested,
                effective = %transition,
                "transition duration clamped to half the shortest clip"
            );
        }

        let count = clips.len();
        let mut tracks: Vec<LaneTrack> = MediaKind::ALL
            .iter()
            .flat_map(|&kind| LaneSlot::ALL.map(|lane| LaneTrack::new(kind, lane)))
            .collect();
        let mut pass_through = Vec::with_capacity(count);
        let mut transitions = Vec::with_capacity(count.saturating_sub(1));

        // Each clip starts `transition` before the previous one ends.
        let mut next_start = RationalTime::ZERO;
        for (i, clip) in clips.iter().enumerate() {
            let lane = assign_lane(i);
            let trim = clip.trim_duration();
            let placement = TimeInterval::new(next_start, trim);

            for track in tracks.iter_mut().filter(|t| t.lane == lane) {
                track.insert_media(i, clip, placement);
            }

            let mut start = placement.start;
            let mut duration = placement.duration;
            if i > 0 {
                start = start + transition;
                duration = duration - transition;
            }
            if i + 1 < count {
                duration = duration - transition;
            }
            pass_through.push(TimeInterval::new(start, duration));

            next_start = next_start
                .checked_add(trim)
                .and_then(|end| end.checked_sub(transition))
                .ok_or_else(|| {
                    TimelineError::InvalidInterval(format!(
                        "timeline overflows after clip {i} ('{}')",
                        clip.name
                    ))
                })?;
            if i + 1 < count {
                transitions.push(TimeInterval::new(next_start, transition));
            }
        }

        let total_duration = tracks
            .iter()
            .map(LaneTrack::end)
            .fold(RationalTime::ZERO, RationalTime::max);

        let mut windows = Vec::with_capacity(count * 3);
        let mut stages = Vec::with_capacity(count * 2);
        for (i, interval) in pass_through.iter().enumerate() {
            windows.push(Window::PassThrough {
                clip_index: i,
                interval: *interval,
            });
            stages.push(CompositionStage {
                interval: *interval,
                layers: vec![assign_lane(i)],
            });

            if let Some(&overlap) = transitions.get(i) {
                windows.push(Window::TransitionOut {
                    clip_index: i,
                    interval: overlap,
                });
                windows.push(Window::TransitionIn {
                    clip_index: i + 1,
                    interval: overlap,
                });
                stages.push(CompositionStage {
                    interval: overlap,
                    layers: vec![assign_lane(i + 1), assign_lane(i)],
                });
            }
        }

        let envelopes = self.synthesize_envelopes(&pass_through, &transitions)?;

        debug!(
            clips = count,
            transition = %transition,
            total = %total_duration,
            envelopes = envelopes.len(),
            "composition built"
        );

        Ok(TimelineModel {
            transition_duration: transition,
            total_duration,
            clip_count: count,
            tracks,
            windows,
            stages,
            envelopes,
        })
    }

    fn synthesize_envelopes(
        &self,
        pass_through: &[TimeInterval],
        transitions: &[TimeInterval],
    ) -> Result<EnvelopeTable, TimelineError> {
        let mut envelopes = EnvelopeTable::new();

        // The incoming lane fades in over the outgoing one, which stays opaque.
        for (i, overlap) in transitions.iter().enumerate() {
            envelope_mut(&mut envelopes, EnvelopeKey::opacity(assign_lane(i + 1)))
                .add_ramp(0.0, 1.0, *overlap)?;
        }

        match self.config.volume_ramps {
            VolumeRampPolicy::FirstTransition => {
                if let Some(&first) = transitions.first() {
                    if transitions.len() > 1 {
                        warn!(
                            transitions = transitions.len(),
                            "volume ramps follow the first transition window only"
                        );
                    }
                    envelope_mut(&mut envelopes, EnvelopeKey::volume(LaneSlot::Lane0))
                        .add_ramp(1.0, 0.0, first)?;
                    let incoming =
                        envelope_mut(&mut envelopes, EnvelopeKey::volume(LaneSlot::Lane1));
                    incoming.add_ramp(0.0, 1.0, first)?;
                    incoming.add_ramp(1.0, 1.0, pass_through[1])?;
                }
            }
            VolumeRampPolicy::PerTransition => {
                for (i, overlap) in transitions.iter().enumerate() {
                    envelope_mut(&mut envelopes, EnvelopeKey::volume(assign_lane(i)))
                        .add_ramp(1.0, 0.0, *overlap)?;
                    let incoming =
                        envelope_mut(&mut envelopes, EnvelopeKey::volume(assign_lane(i + 1)));
                    incoming.add_ramp(0.0, 1.0, *overlap)?;
                    incoming.add_ramp(1.0, 1.0, pass_through[i + 1])?;
                }
            }
        }

        envelopes.retain(|_, envelope| !envelope.is_empty());
        Ok(envelopes)
    }
}

fn envelope_mut(envelopes: &mut EnvelopeTable, key: EnvelopeKey) -> &mut Envelope {
    envelopes.entry(key).or_insert_with(|| Envelope::new(key))
}

fn validate(clips: &ClipCatalog, requested: RationalTime) -> Result<(), TimelineError> {
    if clips.is_empty() {
        return Err(TimelineError::EmptyCatalog);
    }
    if !requested.is_valid() || requested.is_negative() {
        return Err(TimelineError::InvalidInterval(format!(
            "requested transition duration {requested}"
        )));
    }
    clips.validate()?;
    for (clip_index, clip) in clips.iter().enumerate() {
        for kind in MediaKind::ALL {
            if !clip.has_track(kind) {
                return Err(TimelineError::MissingTrack { clip_index, kind });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Breakpoint, Clip, SegmentKind};

    fn secs(seconds: f64) -> RationalTime {
        RationalTime::from_seconds(seconds, DEFAULT_TIMESCALE)
    }

    fn interval(start: f64, end: f64) -> TimeInterval {
        TimeInterval::from_start_end(secs(start), secs(end))
    }

    fn clip(name: &str, total: f64, trim_start: f64, trim_duration: f64) -> Clip {
        Clip::new(name, secs(total))
            .with_trim(TimeInterval::new(secs(trim_start), secs(trim_duration)))
            .unwrap()
    }

    fn create_test_catalog(count: usize) -> ClipCatalog {
        (0..count)
            .map(|i| clip(&format!("clip{}.mov", i + 1), 10.0, 0.0, 5.0))
            .collect()
    }

    fn points(envelope: &Envelope) -> Vec<(f64, f32)> {
        envelope
            .breakpoints()
            .iter()
            .map(|p| (p.time.as_seconds(), p.value))
            .collect()
    }

    #[test]
    fn test_two_clip_windows() {
        let model = build(&create_test_catalog(2), secs(2.0)).unwrap();

        assert_eq!(model.transition_duration, secs(2.0));
        assert_eq!(model.pass_through(0), Some(interval(0.0, 3.0)));
        assert_eq!(model.transition_out(0), Some(interval(3.0, 5.0)));
        assert_eq!(model.transition_in(1), Some(interval(3.0, 5.0)));
        assert_eq!(model.pass_through(1), Some(interval(5.0, 8.0)));
        assert_eq!(model.total_duration, secs(8.0));
        assert!(model.transition_in(0).is_none());
        assert!(model.transition_out(1).is_none());
    }

    #[test]
    fn test_window_order_interleaves() {
        let model = build(&create_test_catalog(3), secs(2.0)).unwrap();
        let order: Vec<_> = model
            .windows
            .iter()
            .map(|w| (w.is_transition(), w.clip_index()))
            .collect();
        assert_eq!(
            order,
            vec![
                (false, 0),
                (true, 0),
                (true, 1),
                (false, 1),
                (true, 1),
                (true, 2),
                (false, 2),
            ]
        );
    }

    #[test]
    fn test_clamp_binds_to_half_shortest_clip() {
        let model = build(&create_test_catalog(2), secs(4.0)).unwrap();
        assert_eq!(model.transition_duration, secs(2.5));
        assert_eq!(model.pass_through(0), Some(interval(0.0, 2.5)));
        assert_eq!(model.transition_out(0), Some(interval(2.5, 5.0)));
        assert_eq!(model.pass_through(1), Some(interval(5.0, 7.5)));
    }

    #[test]
    fn test_clamp_is_exact_for_odd_ticks() {
        let odd = Clip::new("odd.mov", RationalTime::new(7, 600));
        let catalog = ClipCatalog::from_clips(vec![odd.clone(), odd]);
        let transition = effective_transition_duration(&catalog, secs(2.0));
        assert_eq!(transition, RationalTime::new(7, 1200));
    }

    #[test]
    fn test_single_clip() {
        let model = build(&create_test_catalog(1), secs(2.0)).unwrap();
        assert_eq!(model.windows.len(), 1);
        assert_eq!(model.pass_through(0), Some(interval(0.0, 5.0)));
        assert!(model.transition_windows().is_empty());
        assert!(model.envelopes.is_empty());
        assert_eq!(model.total_duration, secs(5.0));
    }

    #[test]
    fn test_empty_catalog_fails() {
        let err = build(&ClipCatalog::new(), secs(2.0)).unwrap_err();
        assert!(matches!(err, TimelineError::EmptyCatalog));
    }

    #[test]
    fn test_missing_audio_track_fails() {
        let mut catalog = create_test_catalog(2);
        catalog.push(clip("silent.mov", 10.0, 0.0, 5.0).with_tracks(true, false));
        let err = build(&catalog, secs(2.0)).unwrap_err();
        assert!(matches!(
            err,
            TimelineError::MissingTrack {
                clip_index: 2,
                kind: MediaKind::Audio
            }
        ));
    }

    #[test]
    fn test_missing_video_track_fails() {
        let catalog =
            ClipCatalog::from_clips(vec![clip("a.wav", 10.0, 0.0, 5.0).with_tracks(false, true)]);
        assert!(matches!(
            build(&catalog, secs(2.0)),
            Err(TimelineError::MissingTrack {
                clip_index: 0,
                kind: MediaKind::Video
            })
        ));
    }

    #[test]
    fn test_invalid_trim_fails() {
        let mut bad = Clip::new("bad.mov", secs(4.0));
        bad.trim_range = TimeInterval::new(secs(2.0), secs(5.0));
        let catalog = ClipCatalog::from_clips(vec![bad]);
        assert!(matches!(
            build(&catalog, secs(1.0)),
            Err(TimelineError::InvalidInterval(_))
        ));
    }

    #[test]
    fn test_invalid_requested_duration_fails() {
        let catalog = create_test_catalog(2);
        assert!(build(&catalog, RationalTime::INVALID).is_err());
        assert!(build(&catalog, secs(-1.0)).is_err());
    }

    #[test]
    fn test_zero_transition_abuts_clips() {
        let model = build(&create_test_catalog(2), RationalTime::ZERO).unwrap();
        assert_eq!(model.pass_through(0), Some(interval(0.0, 5.0)));
        assert_eq!(model.pass_through(1), Some(interval(5.0, 10.0)));
        assert!(model.transition_out(0).unwrap().is_empty());
        assert!(model.envelopes.is_empty());
    }

    #[test]
    fn test_lane_tracks_pad_gaps() {
        let model = build(&create_test_catalog(3), secs(2.0)).unwrap();

        let lane0 = model.track(MediaKind::Video, LaneSlot::Lane0).unwrap();
        let targets: Vec<_> = lane0.segments.iter().map(|s| s.target).collect();
        assert_eq!(
            targets,
            vec![interval(0.0, 5.0), interval(5.0, 6.0), interval(6.0, 11.0)]
        );
        assert!(lane0.segments[1].is_empty());

        let lane1 = model.track(MediaKind::Audio, LaneSlot::Lane1).unwrap();
        assert!(lane1.segments[0].is_empty());
        assert!(matches!(
            lane1.segments[1].kind,
            SegmentKind::Media { clip_index: 1, .. }
        ));
        assert_eq!(
            lane1.describe(),
            vec![String::new(), "0.0 - 5.0: \"clip2.mov\" (a)".to_string()]
        );
    }

    #[test]
    fn test_trimmed_source_range_is_kept() {
        let catalog = ClipCatalog::from_clips(vec![clip("a.mov", 10.0, 2.0, 6.0)]);
        let model = build(&catalog, secs(2.0)).unwrap();
        let track = model.track(MediaKind::Video, LaneSlot::Lane0).unwrap();
        assert_eq!(track.describe(), vec!["2.0 - 8.0: \"a.mov\" (v)".to_string()]);
        assert_eq!(track.segments[0].target, interval(0.0, 6.0));
    }

    #[test]
    fn test_stages_put_incoming_layer_first() {
        let model = build(&create_test_catalog(3), secs(2.0)).unwrap();
        let layers: Vec<_> = model.stages.iter().map(|s| s.layers.clone()).collect();
        assert_eq!(
            layers,
            vec![
                vec![LaneSlot::Lane0],
                vec![LaneSlot::Lane1, LaneSlot::Lane0],
                vec![LaneSlot::Lane1],
                vec![LaneSlot::Lane0, LaneSlot::Lane1],
                vec![LaneSlot::Lane0],
            ]
        );
    }

    #[test]
    fn test_two_clip_envelopes() {
        let model = build(&create_test_catalog(2), secs(2.0)).unwrap();
        assert_eq!(model.envelopes.len(), 3);

        let opacity = model.envelope(EnvelopeKey::opacity(LaneSlot::Lane1)).unwrap();
        assert_eq!(points(opacity), vec![(3.0, 0.0), (5.0, 1.0)]);
        assert!(model.envelope(EnvelopeKey::opacity(LaneSlot::Lane0)).is_none());

        let fade_out = model.envelope(EnvelopeKey::volume(LaneSlot::Lane0)).unwrap();
        assert_eq!(points(fade_out), vec![(3.0, 1.0), (5.0, 0.0)]);

        let fade_in = model.envelope(EnvelopeKey::volume(LaneSlot::Lane1)).unwrap();
        assert_eq!(fade_in.breakpoints().len(), 3);
        assert_eq!(
            fade_in.breakpoints()[2],
            Breakpoint::new(secs(8.0), 1.0)
        );
    }

    #[test]
    fn test_first_transition_volume_ramps_ignore_later_transitions() {
        let model = build(&create_test_catalog(3), secs(2.0)).unwrap();

        let opacity0 = model.envelope(EnvelopeKey::opacity(LaneSlot::Lane0)).unwrap();
        assert_eq!(points(opacity0), vec![(6.0, 0.0), (8.0, 1.0)]);

        let volume0 = model.envelope(EnvelopeKey::volume(LaneSlot::Lane0)).unwrap();
        assert_eq!(points(volume0), vec![(3.0, 1.0), (5.0, 0.0)]);
        let volume1 = model.envelope(EnvelopeKey::volume(LaneSlot::Lane1)).unwrap();
        assert_eq!(points(volume1), vec![(3.0, 0.0), (5.0, 1.0), (6.0, 1.0)]);
    }

    #[test]
    fn test_per_transition_volume_ramps() {
        let builder = CompositionBuilder::new(CompositionConfig {
            transition_duration: secs(2.0),
            volume_ramps: VolumeRampPolicy::PerTransition,
        });
        let model = builder.build(&create_test_catalog(3)).unwrap();

        let volume0 = model.envelope(EnvelopeKey::volume(LaneSlot::Lane0)).unwrap();
        assert_eq!(
            points(volume0),
            vec![(3.0, 1.0), (5.0, 0.0), (6.0, 0.0), (8.0, 1.0), (11.0, 1.0)]
        );
        let volume1 = model.envelope(EnvelopeKey::volume(LaneSlot::Lane1)).unwrap();
        assert_eq!(
            points(volume1),
            vec![(3.0, 0.0), (5.0, 1.0), (6.0, 1.0), (8.0, 0.0)]
        );
    }

    #[test]
    fn test_per_transition_with_binding_clamp_stays_continuous() {
        let builder = CompositionBuilder::new(CompositionConfig {
            transition_duration: secs(10.0),
            volume_ramps: VolumeRampPolicy::PerTransition,
        });
        let model = builder.build(&create_test_catalog(3)).unwrap();

        // Middle pass-through collapses to nothing when the clamp binds.
        assert!(model.pass_through(1).unwrap().is_empty());
        let volume0 = model.envelope(EnvelopeKey::volume(LaneSlot::Lane0)).unwrap();
        assert_eq!(
            points(volume0),
            vec![(2.5, 1.0), (5.0, 0.0), (7.5, 1.0), (10.0, 1.0)]
        );
    }

    #[test]
    fn test_segments_carry_clip_ids() {
        let catalog = create_test_catalog(3);
        let model = build(&catalog, secs(2.0)).unwrap();
        for track in &model.tracks {
            for segment in &track.segments {
                if let SegmentKind::Media {
                    clip_index,
                    clip_id,
                    ..
                } = &segment.kind
                {
                    assert_eq!(*clip_id, catalog.get(*clip_index).unwrap().id);
                }
            }
        }
    }

    #[test]
    fn test_overflowing_trim_fails_instead_of_panicking() {
        let mut huge = Clip::new("huge.mov", RationalTime::new(i64::MAX, 1));
        huge.trim_range =
            TimeInterval::new(RationalTime::new(1, 1), RationalTime::new(i64::MAX, 1));
        let catalog = ClipCatalog::from_clips(vec![huge]);
        assert!(matches!(
            build(&catalog, secs(2.0)),
            Err(TimelineError::InvalidInterval(_))
        ));
    }

    #[test]
    fn test_overflowing_timeline_fails() {
        let huge = Clip::new("huge.mov", RationalTime::new(i64::MAX, 1));
        let catalog = ClipCatalog::from_clips(vec![huge.clone(), huge]);
        assert!(matches!(
            build(&catalog, secs(2.0)),
            Err(TimelineError::InvalidInterval(_))
        ));
    }
}
