//! Feature computation engine.
//!
//! Evaluates every configured feature through the registry at one point of
//! the backtest's progression.

use crate::feature::{InstrumentValues, MarketFeatures};
use crate::provider::LookbackProvider;
use crate::registry::FeatureRegistry;
use quantline_core::{Config, FeatureConfig, Result, Timestamp};
use std::collections::BTreeMap;
use tracing::debug;

/// Feature computation engine.
#[derive(Debug)]
pub struct FeatureEngine {
    /// Available variants.
    registry: FeatureRegistry,
    /// Features to evaluate, in configuration order.
    features: Vec<FeatureConfig>,
}

impl FeatureEngine {
    /// Create an engine for the configured features with the built-in variants.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_registry(FeatureRegistry::with_builtins(), config.features.clone())
    }

    /// Create an engine with a custom registry.
    ///
    /// Fails if a feature names an unregistered type or has invalid params.
    pub fn with_registry(registry: FeatureRegistry, features: Vec<FeatureConfig>) -> Result<Self> {
        for feature in &features {
            registry.get(&feature.feature_type)?;
            feature.params.validate()?;
        }
        Ok(Self { registry, features })
    }

    /// Output keys of the configured features.
    pub fn feature_keys(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|f| f.key.as_str())
    }

    /// Compute every feature per instrument at `time`.
    pub fn compute_instrument_features(
        &self,
        update_num: usize,
        time: Timestamp,
        lookback: &dyn LookbackProvider,
    ) -> Result<BTreeMap<String, InstrumentValues>> {
        let mut results = BTreeMap::new();
        for feature in &self.features {
            let variant = self.registry.get(&feature.feature_type)?;
            let values = variant.compute_for_instrument(
                update_num,
                time,
                &feature.params,
                &feature.key,
                lookback,
            )?;
            results.insert(feature.key.clone(), values);
        }
        debug!(update_num, %time, count = results.len(), "Computed instrument features");
        Ok(results)
    }

    /// Compute every feature at market level at `time`.
    ///
    /// Features without a value yet are left out of the result.
    pub fn compute_market_features(
        &self,
        update_num: usize,
        time: Timestamp,
        current_market_features: &MarketFeatures,
        lookback: &dyn LookbackProvider,
    ) -> Result<MarketFeatures> {
        let mut results = MarketFeatures::new();
        for feature in &self.features {
            let variant = self.registry.get(&feature.feature_type)?;
            let value = variant.compute_for_market(
                update_num,
                time,
                &feature.params,
                &feature.key,
                current_market_features,
                lookback,
            )?;
            if let Some(value) = value {
                results.insert(feature.key.clone(), value);
            }
        }
        Ok(results)
    }
}
