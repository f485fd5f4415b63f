use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{RationalTime, TimeInterval, TimelineError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ClipId(pub Uuid);

impl ClipId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub const ALL: [Self; 2] = [Self::Video, Self::Audio];

    /// Single-letter tag used in segment descriptions.
    pub fn short_tag(self) -> &'static str {
        match self {
            Self::Video => "v",
            Self::Audio => "a",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

fn default_true() -> bool {
    true
}

/// A source clip and the part of it that goes on the timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clip {
    #[serde(default)]
    pub id: ClipId,
    #[serde(default)]
    pub name: String,
    pub total_duration: RationalTime,
    pub trim_range: TimeInterval,
    #[serde(default = "default_true")]
    pub has_video: bool,
    #[serde(default = "default_true")]
    pub has_audio: bool,
}

impl Clip {
    /// A clip with both media kinds, trimmed to its full duration.
    pub fn new(name: impl Into<String>, total_duration: RationalTime) -> Self {
        Self {
            id: ClipId::new(),
            name: name.into(),
            total_duration,
            trim_range: TimeInterval {
                start: RationalTime::ZERO,
                duration: total_duration,
            },
            has_video: true,
            has_audio: true,
        }
    }

    pub fn with_trim(mut self, trim_range: TimeInterval) -> Result<Self, TimelineError> {
        self.trim_range = trim_range;
        self.validate()?;
        Ok(self)
    }

    pub fn with_tracks(mut self, has_video: bool, has_audio: bool) -> Self {
        self.has_video = has_video;
        self.has_audio = has_audio;
        self
    }

    pub fn trim_duration(&self) -> RationalTime {
        self.trim_range.duration
    }

    pub fn has_track(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Video => self.has_video,
            MediaKind::Audio => self.has_audio,
        }
    }

    /// Check that the trim range is well formed and lies inside the clip.
    pub fn validate(&self) -> Result<(), TimelineError> {
        if !self.total_duration.is_valid() || self.total_duration.is_negative() {
            return Err(TimelineError::InvalidInterval(format!(
                "clip '{}' has total duration {}",
                self.name, self.total_duration
            )));
        }
        if !self.trim_range.is_valid() {
            return Err(TimelineError::InvalidInterval(format!(
                "clip '{}' has trim range {}",
                self.name, self.trim_range
            )));
        }
        let Some(end) = self.trim_range.checked_end() else {
            return Err(TimelineError::InvalidInterval(format!(
                "clip '{}' trim range {} overflows",
                self.name, self.trim_range
            )));
        };
        if self.trim_range.start < RationalTime::ZERO || end > self.total_duration {
            return Err(TimelineError::InvalidInterval(format!(
                "clip '{}' trim range {} outside [0, {})",
                self.name, self.trim_range, self.total_duration
            )));
        }
        Ok(())
    }
}

/// Clips in timeline order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ClipCatalog {
    clips: Vec<Clip>,
}

impl ClipCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_clips(clips: Vec<Clip>) -> Self {
        Self { clips }
    }

    pub fn from_json(json: &str) -> Result<Self, TimelineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn push(&mut self, clip: Clip) {
        self.clips.push(clip);
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Clip> {
        self.clips.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Clip> {
        self.clips.iter()
    }

    /// Validate every clip's trim range, stopping at the first bad one.
    pub fn validate(&self) -> Result<(), TimelineError> {
        self.clips.iter().try_for_each(Clip::validate)
    }

    /// Shortest trimmed duration, or `None` for an empty catalog.
    pub fn shortest_trim_duration(&self) -> Option<RationalTime> {
        self.clips
            .iter()
            .map(Clip::trim_duration)
            .reduce(RationalTime::min)
    }
}

impl<'a> IntoIterator for &'a ClipCatalog {
    type Item = &'a Clip;
    type IntoIter = std::slice::Iter<'a, Clip>;

    fn into_iter(self) -> Self::IntoIter {
        self.clips.iter()
    }
}

impl FromIterator<Clip> for ClipCatalog {
    fn from_iter<I: IntoIterator<Item = Clip>>(iter: I) -> Self {
        Self {
            clips: iter.into_iter().collect(),
        }
    }
}
