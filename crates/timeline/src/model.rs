use serde::Serialize;

use crate::{
    assign_lane, Clip, ClipId, Envelope, EnvelopeKey, EnvelopeParam, EnvelopeTable, LaneSlot,
    MediaKind, RationalTime, TimeInterval, RESTING_VALUE,
};

/// A time window of the composed timeline attributed to one clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Window {
    PassThrough {
        clip_index: usize,
        interval: TimeInterval,
    },
    TransitionIn {
        clip_index: usize,
        interval: TimeInterval,
    },
    TransitionOut {
        clip_index: usize,
        interval: TimeInterval,
    },
}

impl Window {
    pub fn clip_index(&self) -> usize {
        match self {
            Self::PassThrough { clip_index, .. }
            | Self::TransitionIn { clip_index, .. }
            | Self::TransitionOut { clip_index, .. } => *clip_index,
        }
    }

    pub fn interval(&self) -> TimeInterval {
        match self {
            Self::PassThrough { interval, .. }
            | Self::TransitionIn { interval, .. }
            | Self::TransitionOut { interval, .. } => *interval,
        }
    }

    pub fn is_transition(&self) -> bool {
        !matches!(self, Self::PassThrough { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SegmentKind {
    Media {
        clip_index: usize,
        clip_id: ClipId,
        clip_name: String,
        source: TimeInterval,
    },
    Empty,
}

/// A stretch of a lane track: clip media or an empty gap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSegment {
    pub target: TimeInterval,
    #[serde(flatten)]
    pub kind: SegmentKind,
}

impl TrackSegment {
    pub fn is_empty(&self) -> bool {
        matches!(self.kind, SegmentKind::Empty)
    }

    /// Label for the debug view, e.g. `0.0 - 5.0: "clip1.mov" (v)`.
    ///
    /// Times are the source range inside the clip. Empty segments have no label.
    pub fn describe(&self, media_kind: MediaKind) -> String {
        match &self.kind {
            SegmentKind::Media {
                clip_name, source, ..
            } => format!(
                "{:.1} - {:.1}: \"{}\" ({})",
                source.start.as_seconds(),
                source.end().as_seconds(),
                clip_name,
                media_kind.short_tag()
            ),
            SegmentKind::Empty => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaneTrack {
    pub kind: MediaKind,
    pub lane: LaneSlot,
    pub segments: Vec<TrackSegment>,
}

impl LaneTrack {
    pub fn new(kind: MediaKind, lane: LaneSlot) -> Self {
        Self {
            kind,
            lane,
            segments: Vec::new(),
        }
    }

    pub fn end(&self) -> RationalTime {
        self.segments
            .last()
            .map(|s| s.target.end())
            .unwrap_or(RationalTime::ZERO)
    }

    /// Place clip media at `target`, padding any gap before it with an empty segment.
    pub(crate) fn insert_media(&mut self, clip_index: usize, clip: &Clip, target: TimeInterval) {
        let end = self.end();
        if target.start > end {
            self.segments.push(TrackSegment {
                target: TimeInterval::from_start_end(end, target.start),
                kind: SegmentKind::Empty,
            });
        }
        self.segments.push(TrackSegment {
            target,
            kind: SegmentKind::Media {
                clip_index,
                clip_id: clip.id,
                clip_name: clip.name.clone(),
                source: clip.trim_range,
            },
        });
    }

    pub fn describe(&self) -> Vec<String> {
        self.segments.iter().map(|s| s.describe(self.kind)).collect()
    }
}

/// One compositing instruction: which lanes are visible over an interval.
/// During a transition the incoming lane comes first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionStage {
    pub interval: TimeInterval,
    pub layers: Vec<LaneSlot>,
}

/// The composed timeline. Built wholesale by the composition builder and
/// read-only afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineModel {
    pub transition_duration: RationalTime,
    pub total_duration: RationalTime,
    pub clip_count: usize,
    pub tracks: Vec<LaneTrack>,
    pub windows: Vec<Window>,
    pub stages: Vec<CompositionStage>,
    pub envelopes: EnvelopeTable,
}

impl TimelineModel {
    pub fn track(&self, kind: MediaKind, lane: LaneSlot) -> Option<&LaneTrack> {
        self.tracks.iter().find(|t| t.kind == kind && t.lane == lane)
    }

    pub fn envelope(&self, key: EnvelopeKey) -> Option<&Envelope> {
        self.envelopes.get(&key)
    }

    /// Envelope value at `time`; parameters without an envelope rest at 1.
    pub fn envelope_value(&self, key: EnvelopeKey, time: RationalTime) -> f32 {
        self.envelope(key)
            .map(|e| e.value_at(time))
            .unwrap_or(RESTING_VALUE)
    }

    pub fn lane_of(&self, clip_index: usize) -> Option<LaneSlot> {
        (clip_index < self.clip_count).then(|| assign_lane(clip_index))
    }

    pub fn pass_through(&self, clip_index: usize) -> Option<TimeInterval> {
        self.windows.iter().find_map(|w| match w {
            Window::PassThrough {
                clip_index: i,
                interval,
            } if *i == clip_index => Some(*interval),
            _ => None,
        })
    }

    pub fn transition_in(&self, clip_index: usize) -> Option<TimeInterval> {
        self.windows.iter().find_map(|w| match w {
            Window::TransitionIn {
                clip_index: i,
                interval,
            } if *i == clip_index => Some(*interval),
            _ => None,
        })
    }

    pub fn transition_out(&self, clip_index: usize) -> Option<TimeInterval> {
        self.windows.iter().find_map(|w| match w {
            Window::TransitionOut {
                clip_index: i,
                interval,
            } if *i == clip_index => Some(*interval),
            _ => None,
        })
    }

    /// The overlap regions between adjacent clips, in order.
    pub fn transition_windows(&self) -> Vec<TimeInterval> {
        self.windows
            .iter()
            .filter_map(|w| match w {
                Window::TransitionOut { interval, .. } => Some(*interval),
                _ => None,
            })
            .collect()
    }

    pub fn volume_envelopes(&self) -> impl Iterator<Item = &Envelope> {
        self.envelopes
            .values()
            .filter(|e| e.key.param == EnvelopeParam::Volume)
    }
}
