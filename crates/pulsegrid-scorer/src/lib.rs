//! pulsegrid-scorer — engagement scoring for the decision loop.
//!
//! Maintains three independent score signals and blends them into the
//! combined score that drives every threshold decision.
//!
//! # Scoring
//!
//! ```text
//! focus event (duration d seconds):
//!     personal[session][content] += d * focus_duration_scale   (cap 1.0)
//!     global[content]            += d * focus_duration_scale / 10 (cap 1.0)
//!
//! combined = clamp(personal*Wp + global*Wg + trend*Wt, 0, 1)
//! ```
//!
//! Every `decay_interval` all personal and global scores shrink by
//! `decay_rate`, passive trend scores by half that, and anything below
//! 0.01 is dropped.

pub mod scorer;

pub use scorer::{DecaySummary, ScoreUpdateCallback, Scorer};
