use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Number of alternating lanes per media kind.
pub const LANE_COUNT: usize = 2;

/// One of the alternating lanes a clip can be placed on. Adjacent clips sit
/// on different lanes so their transition regions can overlap.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LaneSlot {
    Lane0,
    Lane1,
}

impl LaneSlot {
    pub const ALL: [Self; LANE_COUNT] = [Self::Lane0, Self::Lane1];

    pub fn index(self) -> usize {
        match self {
            Self::Lane0 => 0,
            Self::Lane1 => 1,
        }
    }
}

impl fmt::Display for LaneSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lane{}", self.index())
    }
}

/// Lane for the clip at `clip_index` in the catalog.
pub fn assign_lane(clip_index: usize) -> LaneSlot {
    LaneSlot::ALL[clip_index % LANE_COUNT]
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeParam {
    Opacity,
    Volume,
}

impl fmt::Display for EnvelopeParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opacity => write!(f, "opacity"),
            Self::Volume => write!(f, "volume"),
        }
    }
}

/// Identifies one envelope of a timeline, e.g. `opacity:lane1`.
///
/// Serialized as that string so envelope tables map to JSON objects.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct EnvelopeKey {
    pub param: EnvelopeParam,
    pub lane: LaneSlot,
}

impl EnvelopeKey {
    pub const fn new(param: EnvelopeParam, lane: LaneSlot) -> Self {
        Self { param, lane }
    }

    pub const fn opacity(lane: LaneSlot) -> Self {
        Self::new(EnvelopeParam::Opacity, lane)
    }

    pub const fn volume(lane: LaneSlot) -> Self {
        Self::new(EnvelopeParam::Volume, lane)
    }
}

impl fmt::Display for EnvelopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.param, self.lane)
    }
}

impl FromStr for EnvelopeKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (param, lane) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid envelope key '{s}'"))?;
        let param = match param {
            "opacity" => EnvelopeParam::Opacity,
            "volume" => EnvelopeParam::Volume,
            other => return Err(format!("unknown envelope parameter '{other}'")),
        };
        let lane = match lane {
            "lane0" => LaneSlot::Lane0,
            "lane1" => LaneSlot::Lane1,
            other => return Err(format!("unknown lane '{other}'")),
        };
        Ok(Self { param, lane })
    }
}

impl TryFrom<String> for EnvelopeKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EnvelopeKey> for String {
    fn from(key: EnvelopeKey) -> Self {
        key.to_string()
    }
}
