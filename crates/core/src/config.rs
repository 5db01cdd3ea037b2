//! Configuration structures for the quantline system.

use crate::error::{Error, Result};
use crate::types::DateRange;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Main configuration for an alignment run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data source configuration.
    pub data: DataConfig,
    /// Derived features to evaluate over the aligned data.
    #[serde(default)]
    pub features: Vec<FeatureConfig>,
}

impl Config {
    /// Parse a configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check dates and feature parameters.
    pub fn validate(&self) -> Result<()> {
        self.data.date_range()?;
        for feature in &self.features {
            feature.params.validate()?;
        }
        Ok(())
    }
}

/// Data source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root folder of the on-disk cache. Opaque to the alignment core.
    pub cached_folder_name: String,
    /// Dataset identifier, used as a cache subfolder.
    pub data_set_id: String,
    /// Explicit universe. Empty means discover all available instruments.
    #[serde(default)]
    pub instrument_ids: Vec<String>,
    /// Start date (`YYYY-MM-DD` or `YYYY/MM/DD`).
    pub start_date: String,
    /// End date (`YYYY-MM-DD` or `YYYY/MM/DD`).
    pub end_date: String,
    /// Eager grouped path (true) or batch date-filtered path (false).
    #[serde(default = "default_live_updates")]
    pub live_updates: bool,
    /// Name of the date column in source rows.
    #[serde(default = "default_date_field")]
    pub date_field: String,
}

fn default_live_updates() -> bool {
    true
}

fn default_date_field() -> String {
    "Date".to_string()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            cached_folder_name: "historicalData".to_string(),
            data_set_id: "WIKI".to_string(),
            instrument_ids: Vec::new(),
            start_date: "2017-01-01".to_string(),
            end_date: "2017-12-31".to_string(),
            live_updates: default_live_updates(),
            date_field: default_date_field(),
        }
    }
}

impl DataConfig {
    /// Normalized date range. Fails on unrecognized date formats.
    pub fn date_range(&self) -> Result<DateRange> {
        DateRange::parse(&self.start_date, &self.end_date)
    }

    /// Whether the universe must be discovered from the source.
    pub fn discover_universe(&self) -> bool {
        self.instrument_ids.is_empty()
    }
}

/// One derived feature to compute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Output key of the derived feature.
    pub key: String,
    /// Registered feature variant (e.g. "rank").
    pub feature_type: String,
    /// Variant parameters.
    pub params: FeatureParams,
}

/// Parameters shared by all feature variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureParams {
    /// Existing feature (column) to transform.
    pub feature_name: String,
    /// Trailing window length.
    pub period: usize,
    /// Variant-specific extras.
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl FeatureParams {
    pub fn new(feature_name: impl Into<String>, period: usize) -> Self {
        Self {
            feature_name: feature_name.into(),
            period,
            extra: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.feature_name.is_empty() {
            return Err(Error::config("feature_name must not be empty"));
        }
        if self.period == 0 {
            return Err(Error::config(format!(
                "period for '{}' must be positive",
                self.feature_name
            )));
        }
        Ok(())
    }
}
