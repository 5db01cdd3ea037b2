//! Rolling feature computation for the quantline system.
//!
//! This crate handles:
//! - The feature contract (`Feature`) and its lookback provider
//! - Market-level history
//! - Percentile rank feature
//! - Registry and engine evaluating configured features

pub mod engine;
pub mod feature;
pub mod provider;
pub mod rank;
pub mod registry;

pub use engine::FeatureEngine;
pub use feature::{Feature, InstrumentValues, MarketFeatures};
pub use provider::{HistoryView, LookbackProvider, MarketHistory, MarketSeries, MarketWindow};
pub use rank::{percentile_ranks, RankFeature};
pub use registry::FeatureRegistry;
