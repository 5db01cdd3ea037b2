//! Series aligner.
//!
//! Owns the aligned timeline, the populated universe and the feature
//! matrices of a run. Matrices are built once during construction and are
//! read-only afterwards.
//!
//! Live mode keeps the timestamp groups so the run can be replayed update by
//! update through `emit_instrument_updates`. Batch mode releases them and
//! restricts everything to the configured date range instead.

use crate::materialize::{materialize_feature_matrices, materialize_from_series};
use crate::matrix::{FeatureMatrices, FeatureMatrix};
use crate::timeline::{build_timeline, flatten_per_instrument};
use quantline_core::{
    DataConfig, DateRange, Error, InstrumentUpdate, Result, TimeGroup, Timestamp,
};
use quantline_ingestion::{collect_streams, RecordSource, RecordStream};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Construction path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignMode {
    /// Group by timestamp, build matrices eagerly, keep groups for replay.
    Live,
    /// Build matrices from whole series, drop groups, filter by date range.
    Batch,
}

impl AlignMode {
    pub fn from_live_updates(live_updates: bool) -> Self {
        if live_updates {
            AlignMode::Live
        } else {
            AlignMode::Batch
        }
    }
}

/// Aligned view of many instruments on one timeline.
#[derive(Debug, Clone)]
pub struct SeriesAligner {
    mode: AlignMode,
    timeline: Vec<Timestamp>,
    universe: Vec<String>,
    matrices: FeatureMatrices,
    groups: Option<Vec<TimeGroup>>,
}

impl SeriesAligner {
    /// Acquire and align every configured instrument.
    ///
    /// Fails only on invalid configuration (dates) or a failed universe
    /// discovery; unavailable instruments are skipped.
    pub fn from_source(config: &DataConfig, source: &dyn RecordSource) -> Result<Self> {
        let range = config.date_range()?;
        let universe = if config.discover_universe() {
            let discovered = source.discover_instruments(&range)?;
            info!("Discovered {} instruments", discovered.len());
            discovered
        } else {
            let mut seen = BTreeSet::new();
            config
                .instrument_ids
                .iter()
                .filter(|id| {
                    let first = seen.insert(id.as_str());
                    if !first {
                        warn!("Instrument {} listed more than once; fetching it once", id);
                    }
                    first
                })
                .cloned()
                .collect()
        };

        let mode = AlignMode::from_live_updates(config.live_updates);
        if mode == AlignMode::Live {
            info!("Processing instruments before beginning backtesting. This could take some time...");
        }

        let streams = collect_streams(source, &universe, &range);
        Ok(Self::from_streams(streams, mode, &config.date_field, Some(range)))
    }

    /// Align already-acquired streams.
    ///
    /// `range` is applied in batch mode only.
    pub fn from_streams(
        streams: Vec<RecordStream>,
        mode: AlignMode,
        date_field: &str,
        range: Option<DateRange>,
    ) -> Self {
        let aligner = Self::align(streams, mode, date_field, range);
        info!(
            mode = ?aligner.mode,
            timestamps = aligner.timeline.len(),
            instruments = aligner.universe.len(),
            features = aligner.matrices.len(),
            "Alignment complete"
        );
        aligner
    }

    fn align(
        streams: Vec<RecordStream>,
        mode: AlignMode,
        date_field: &str,
        range: Option<DateRange>,
    ) -> Self {
        match mode {
            AlignMode::Live => {
                let grouped = build_timeline(streams, date_field);
                let matrices = materialize_feature_matrices(
                    &grouped.timeline,
                    &grouped.groups,
                    &grouped.universe,
                );
                Self {
                    mode,
                    timeline: grouped.timeline,
                    universe: grouped.universe,
                    matrices,
                    groups: Some(grouped.groups),
                }
            }
            AlignMode::Batch => {
                let flat = flatten_per_instrument(streams, date_field);
                let matrices = materialize_from_series(&flat.timeline, &flat.series, &flat.universe);
                let mut aligner = Self {
                    mode,
                    timeline: flat.timeline,
                    universe: flat.universe,
                    matrices,
                    groups: None,
                };
                if let Some(range) = range {
                    aligner.filter_by_date_ranges(&[range]);
                }
                aligner
            }
        }
    }

    /// Restrict timeline, matrices and any retained groups to the union of
    /// the given inclusive ranges.
    ///
    /// Values carried forward from before the first range are kept.
    pub fn filter_by_date_ranges(&mut self, ranges: &[DateRange]) {
        let keep = |t: &Timestamp| ranges.iter().any(|r| r.contains(t));

        self.timeline.retain(|t| keep(t));
        for matrix in self.matrices.values_mut() {
            matrix.retain_rows(keep);
        }
        if let Some(groups) = &mut self.groups {
            groups.retain(|g| keep(&g.timestamp));
        }
    }

    /// Replay the run as `(timestamp, updates)` pairs in time order.
    ///
    /// Each call starts a fresh pass. Only available while the grouped
    /// updates are retained (live mode, not released).
    pub fn emit_instrument_updates(
        &self,
    ) -> Result<impl Iterator<Item = (Timestamp, &[InstrumentUpdate])> + '_> {
        let groups = self.groups.as_ref().ok_or_else(|| {
            Error::updates_released(match self.mode {
                AlignMode::Live => "grouped updates were released".to_string(),
                AlignMode::Batch => "batch mode does not retain grouped updates".to_string(),
            })
        })?;
        Ok(groups.iter().map(|g| (g.timestamp, g.updates.as_slice())))
    }

    /// Drop the grouped updates. Replay fails afterwards.
    pub fn release_grouped_updates(&mut self) {
        self.groups = None;
    }

    /// Whether `emit_instrument_updates` can be called.
    pub fn has_grouped_updates(&self) -> bool {
        self.groups.is_some()
    }

    pub fn mode(&self) -> AlignMode {
        self.mode
    }

    /// Ascending distinct timestamps.
    pub fn timeline(&self) -> &[Timestamp] {
        &self.timeline
    }

    /// Instruments that actually participate (post-skip).
    pub fn instrument_ids(&self) -> &[String] {
        &self.universe
    }

    pub fn feature_matrices(&self) -> &FeatureMatrices {
        &self.matrices
    }

    pub fn feature_matrix(&self, feature_name: &str) -> Option<&FeatureMatrix> {
        self.matrices.get(feature_name)
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.matrices.keys().map(String::as_str)
    }

    /// Last timestamp of the run, `None` when nothing was aligned.
    pub fn closing_time(&self) -> Option<Timestamp> {
        self.timeline.last().copied()
    }
}
