//! Lookback data providers.
//!
//! A `LookbackProvider` hands features read-only history cut at the current
//! time. `HistoryView` is the standard implementation over the aligned
//! feature matrices and an optional market-level history.

use crate::feature::MarketFeatures;
use quantline_align::{FeatureMatrices, LookbackWindow};
use quantline_core::{Error, Result, Timestamp};
use std::collections::BTreeMap;

/// Read-only history as of "now".
pub trait LookbackProvider {
    /// All instruments' values of a feature, for rows up to and including now.
    fn lookback_feature_data(&self, feature_name: &str) -> Result<LookbackWindow<'_>>;

    /// A market-level series, for rows up to and including now.
    fn lookback_market_data(&self, feature_name: &str) -> Result<MarketWindow<'_>>;
}

/// Market-level values of one feature over time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketSeries {
    times: Vec<Timestamp>,
    values: Vec<Option<f64>>,
}

impl MarketSeries {
    pub fn times(&self) -> &[Timestamp] {
        &self.times
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Rows at or before `time`.
    pub fn window_until(&self, time: &Timestamp) -> MarketWindow<'_> {
        let end = self.times.partition_point(|t| t <= time);
        MarketWindow {
            times: &self.times[..end],
            values: &self.values[..end],
        }
    }
}

/// Borrowed slice of a market series ending at "now".
#[derive(Debug, Clone, Copy)]
pub struct MarketWindow<'a> {
    times: &'a [Timestamp],
    values: &'a [Option<f64>],
}

impl<'a> MarketWindow<'a> {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn times(&self) -> &'a [Timestamp] {
        self.times
    }

    pub fn values(&self) -> &'a [Option<f64>] {
        self.values
    }

    /// The trailing `period` rows.
    pub fn tail(&self, period: usize) -> MarketWindow<'a> {
        let start = self.values.len().saturating_sub(period);
        MarketWindow {
            times: &self.times[start..],
            values: &self.values[start..],
        }
    }
}

/// Append-only market-level history, one series per feature.
#[derive(Debug, Clone, Default)]
pub struct MarketHistory {
    series: BTreeMap<String, MarketSeries>,
}

impl MarketHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value. Recording again at the latest time overwrites it.
    pub fn record(&mut self, time: Timestamp, feature_name: &str, value: Option<f64>) -> Result<()> {
        let series = self.series.entry(feature_name.to_string()).or_default();
        match series.times.last().copied() {
            Some(last) if last > time => {
                return Err(Error::Other(format!(
                    "market history for '{feature_name}' is at {last}, cannot record {time}"
                )));
            }
            Some(last) if last == time => {
                if let Some(slot) = series.values.last_mut() {
                    *slot = value;
                }
            }
            _ => {
                series.times.push(time);
                series.values.push(value);
            }
        }
        Ok(())
    }

    /// Append every value of a market feature row.
    pub fn record_all(&mut self, time: Timestamp, features: &MarketFeatures) -> Result<()> {
        for (name, value) in features {
            self.record(time, name, Some(*value))?;
        }
        Ok(())
    }

    pub fn series(&self, feature_name: &str) -> Option<&MarketSeries> {
        self.series.get(feature_name)
    }
}

/// History of a run as seen at `current_time`.
#[derive(Debug, Clone, Copy)]
pub struct HistoryView<'a> {
    matrices: &'a FeatureMatrices,
    market: Option<&'a MarketHistory>,
    current_time: Timestamp,
}

impl<'a> HistoryView<'a> {
    pub fn new(matrices: &'a FeatureMatrices, current_time: Timestamp) -> Self {
        Self {
            matrices,
            market: None,
            current_time,
        }
    }

    /// Attach market-level history.
    pub fn with_market(mut self, market: &'a MarketHistory) -> Self {
        self.market = Some(market);
        self
    }

    pub fn current_time(&self) -> Timestamp {
        self.current_time
    }
}

impl LookbackProvider for HistoryView<'_> {
    fn lookback_feature_data(&self, feature_name: &str) -> Result<LookbackWindow<'_>> {
        self.matrices
            .get(feature_name)
            .map(|matrix| matrix.lookback_until(&self.current_time))
            .ok_or_else(|| {
                Error::missing_feature_data(format!("no instrument feature '{feature_name}'"))
            })
    }

    fn lookback_market_data(&self, feature_name: &str) -> Result<MarketWindow<'_>> {
        self.market
            .and_then(|market| market.series(feature_name))
            .map(|series| series.window_until(&self.current_time))
            .ok_or_else(|| {
                Error::missing_feature_data(format!("no market feature '{feature_name}'"))
            })
    }
}
