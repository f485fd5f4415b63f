use thiserror::Error;

mod time;
pub use time::*;
mod catalog;
pub use catalog::*;
mod lanes;
pub use lanes::*;
mod envelope;
pub use envelope::*;
mod model;
pub use model::*;
mod composition;
pub use composition::*;
mod reconstruct;
pub use reconstruct::*;
pub mod layout;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("clip catalog is empty")]
    EmptyCatalog,
    #[error("clip {clip_index} has no {kind} track")]
    MissingTrack { clip_index: usize, kind: MediaKind },
    #[error("invalid interval: {0}")]
    InvalidInterval(String),
    #[error("invalid ramp: {0}")]
    InvalidRamp(String),
    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
