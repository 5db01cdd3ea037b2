//! Feature contract.

use crate::provider::LookbackProvider;
use quantline_core::{FeatureParams, Result, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current market-level feature values, keyed by feature name.
pub type MarketFeatures = BTreeMap<String, f64>;

/// Per-instrument result of a feature at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentValues {
    /// Row the values belong to; `None` if no data existed yet.
    pub time: Option<Timestamp>,
    /// Instrument order of `values`.
    pub instruments: Vec<String>,
    pub values: Vec<Option<f64>>,
}

impl InstrumentValues {
    /// Value for one instrument.
    pub fn get(&self, instrument_id: &str) -> Option<f64> {
        let idx = self.instruments.iter().position(|i| i == instrument_id)?;
        self.values.get(idx).copied().flatten()
    }
}

/// A derived feature computed from a bounded window of prior aligned data.
///
/// Implementations must only read what `lookback` exposes, which never goes
/// past `time`, and must restrict themselves to the trailing
/// `params.period` rows. Shorter histories are used as they are.
pub trait Feature: Send + Sync {
    /// Per-instrument value at `time`.
    fn compute_for_instrument(
        &self,
        update_num: usize,
        time: Timestamp,
        params: &FeatureParams,
        feature_key: &str,
        lookback: &dyn LookbackProvider,
    ) -> Result<InstrumentValues>;

    /// Market-level value at `time`.
    fn compute_for_market(
        &self,
        update_num: usize,
        time: Timestamp,
        params: &FeatureParams,
        feature_key: &str,
        current_market_features: &MarketFeatures,
        lookback: &dyn LookbackProvider,
    ) -> Result<Option<f64>>;
}
