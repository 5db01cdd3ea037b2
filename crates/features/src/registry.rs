//! Feature variants by type key.

use crate::feature::Feature;
use crate::rank::RankFeature;
use quantline_core::{Error, Result};
use std::collections::BTreeMap;

/// Open set of feature variants selected by a type key.
pub struct FeatureRegistry {
    features: BTreeMap<String, Box<dyn Feature>>,
}

impl FeatureRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            features: BTreeMap::new(),
        }
    }

    /// Registry with every built-in variant.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("rank", RankFeature);
        registry
    }

    /// Add a variant, replacing any previous one under the same key.
    pub fn register(&mut self, key: impl Into<String>, feature: impl Feature + 'static) {
        self.features.insert(key.into(), Box::new(feature));
    }

    /// Look up a variant.
    pub fn get(&self, key: &str) -> Result<&dyn Feature> {
        self.features
            .get(key)
            .map(|f| f.as_ref())
            .ok_or_else(|| Error::unknown_feature(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.features.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }
}

impl Default for FeatureRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for FeatureRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureRegistry")
            .field("keys", &self.features.keys().collect::<Vec<_>>())
            .finish()
    }
}
