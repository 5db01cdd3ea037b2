//! Time alignment for the quantline system.
//!
//! This crate handles:
//! - Grouping per-instrument updates onto one global timeline
//! - Per-feature time × instrument matrices with forward-fill
//! - Live (grouped, replayable) and batch (date-filtered) construction
//! - Bounded lookback views over the matrices

pub mod aligner;
pub mod materialize;
pub mod matrix;
pub mod progress;
pub mod timeline;

pub use aligner::{AlignMode, SeriesAligner};
pub use materialize::{materialize_feature_matrices, materialize_from_series};
pub use matrix::{FeatureMatrices, FeatureMatrix, LookbackWindow};
pub use progress::ProgressTracker;
pub use timeline::{build_timeline, flatten_per_instrument, GroupedTimeline, InstrumentSeries};
