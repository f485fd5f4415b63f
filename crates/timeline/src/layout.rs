//! Display geometry for a timeline debug view.
//!
//! Pure coordinate and sizing functions; nothing here draws.

use serde::{Deserialize, Serialize};

use crate::{Breakpoint, RationalTime, TimelineModel};

/// Height of a banner heading one group of rows.
pub const BANNER_HEIGHT: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Left inset lining the timeline up with a time slider below it.
    pub left_inset: f64,
    pub right_inset: f64,
    /// Indent of banner and row labels.
    pub left_margin_inset: f64,
    pub banner_height: f64,
    pub ideal_row_height: f64,
    pub gap_after_rows: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            left_inset: 50.0,
            right_inset: 60.0,
            left_margin_inset: 4.0,
            banner_height: BANNER_HEIGHT,
            ideal_row_height: 36.0,
            gap_after_rows: 4.0,
        }
    }
}

impl LayoutConfig {
    /// Row height that fits `row_count` rows under `banner_count` banners,
    /// shrinking below the ideal height only when space runs out.
    pub fn row_height(&self, banner_count: usize, row_count: usize, available_height: f64) -> f64 {
        if row_count == 0 {
            return self.ideal_row_height;
        }
        let total_banner_height = banner_count as f64 * (self.banner_height + self.gap_after_rows);
        let max_row_height = (available_height - total_banner_height) / row_count as f64;
        self.ideal_row_height.min(max_row_height).max(0.0)
    }
}

pub fn compute_row_layout(
    banner_count: usize,
    row_count: usize,
    ideal_row_height: f64,
    gap_height: f64,
    available_height: f64,
) -> f64 {
    LayoutConfig {
        ideal_row_height,
        gap_after_rows: gap_height,
        ..LayoutConfig::default()
    }
    .row_height(banner_count, row_count, available_height)
}

pub fn time_to_display_x(time: RationalTime, scale: f64, left_margin: f64) -> f64 {
    time.as_seconds() * scale + left_margin
}

/// Linear mapping from timeline time to horizontal position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineScale {
    pub points_per_second: f64,
    pub left_margin: f64,
}

impl TimelineScale {
    /// Spread `duration` across `view_width` minus the configured insets.
    /// Durations under one second (or indefinite) are treated as one second.
    pub fn fit(duration: RationalTime, view_width: f64, config: &LayoutConfig) -> Self {
        let one_second = RationalTime::new(1, 1);
        let seconds = if duration.is_valid() {
            duration.max(one_second).as_seconds()
        } else {
            one_second.as_seconds()
        };
        let width = (view_width - config.left_inset - config.right_inset).max(0.0);
        Self {
            points_per_second: width / seconds,
            left_margin: config.left_inset,
        }
    }

    pub fn x_for(&self, time: RationalTime) -> f64 {
        time_to_display_x(time, self.points_per_second, self.left_margin)
    }
}

/// Sizing of the debug view for one timeline: a banner each for the lane
/// tracks, the audio mix and the video stages, with one row per track, one
/// per volume envelope and one for the stages.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugLayout {
    pub banner_count: usize,
    pub row_count: usize,
    pub row_height: f64,
    pub scale: TimelineScale,
}

impl DebugLayout {
    pub fn for_model(
        model: &TimelineModel,
        view_width: f64,
        view_height: f64,
        config: &LayoutConfig,
    ) -> Self {
        let audio_rows = model.volume_envelopes().count();
        let has_stages = !model.stages.is_empty();

        let banner_count = usize::from(!model.tracks.is_empty())
            + usize::from(audio_rows > 0)
            + usize::from(has_stages);
        let row_count = model.tracks.len() + audio_rows + usize::from(has_stages);

        Self {
            banner_count,
            row_count,
            row_height: config.row_height(banner_count, row_count, view_height),
            scale: TimelineScale::fit(model.total_duration, view_width, config),
        }
    }

    /// Horizontal positions for a breakpoint curve, paired with its values.
    pub fn curve_points(&self, points: &[Breakpoint]) -> Vec<(f64, f32)> {
        points
            .iter()
            .map(|p| (self.scale.x_for(p.time), p.value))
            .collect()
    }
}
