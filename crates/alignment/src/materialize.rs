//! Feature matrix materialization.
//!
//! Both construction paths write through `MatrixBuilder`: a matrix is created
//! the first time its feature name is seen, cells are written, and every
//! matrix is forward-filled once at the end.

use crate::matrix::{FeatureMatrices, FeatureMatrix};
use crate::progress::ProgressTracker;
use quantline_core::{InstrumentUpdate, TimeGroup, Timestamp};
use std::collections::HashMap;
use tracing::debug;

struct MatrixBuilder<'a> {
    timeline: &'a [Timestamp],
    universe: &'a [String],
    columns: HashMap<&'a str, usize>,
    matrices: FeatureMatrices,
}

impl<'a> MatrixBuilder<'a> {
    fn new(timeline: &'a [Timestamp], universe: &'a [String]) -> Self {
        let columns = universe
            .iter()
            .enumerate()
            .map(|(col, id)| (id.as_str(), col))
            .collect();
        Self {
            timeline,
            universe,
            columns,
            matrices: FeatureMatrices::new(),
        }
    }

    /// Write every field of `update` into row `row`.
    fn write(&mut self, row: usize, update: &InstrumentUpdate) {
        let Some(&col) = self.columns.get(update.instrument_id.as_str()) else {
            debug!("Ignoring update for {} outside the universe", update.instrument_id);
            return;
        };

        for (name, value) in &update.fields {
            if !self.matrices.contains_key(name) {
                self.matrices.insert(
                    name.clone(),
                    FeatureMatrix::empty(name.clone(), self.timeline.to_vec(), self.universe.to_vec()),
                );
            }
            if let Some(matrix) = self.matrices.get_mut(name) {
                matrix.set(row, col, value.clone());
            }
        }
    }

    fn finish(mut self) -> FeatureMatrices {
        for matrix in self.matrices.values_mut() {
            matrix.forward_fill();
        }
        self.matrices
    }
}

/// Build forward-filled matrices from timestamp groups.
///
/// `groups` must be in ascending time order and `timeline[i]` must be the
/// timestamp of `groups[i]`.
pub fn materialize_feature_matrices(
    timeline: &[Timestamp],
    groups: &[TimeGroup],
    universe: &[String],
) -> FeatureMatrices {
    debug_assert_eq!(timeline.len(), groups.len());
    let mut builder = MatrixBuilder::new(timeline, universe);
    let mut progress = ProgressTracker::new(groups.len(), universe.len());

    for (row, group) in groups.iter().enumerate() {
        for update in &group.updates {
            builder.write(row, update);
        }
        progress.advance();
    }

    builder.finish()
}

/// Build forward-filled matrices from whole per-instrument series.
///
/// Each update is placed at its timestamp's row in `timeline`; updates whose
/// timestamp is absent from the timeline are ignored.
pub fn materialize_from_series(
    timeline: &[Timestamp],
    series: &[(String, Vec<InstrumentUpdate>)],
    universe: &[String],
) -> FeatureMatrices {
    let mut builder = MatrixBuilder::new(timeline, universe);
    let mut progress = ProgressTracker::new(series.len(), universe.len());

    for (_, updates) in series {
        for update in updates {
            match timeline.binary_search(&update.time_of_update) {
                Ok(row) => builder.write(row, update),
                Err(_) => debug!(
                    "No timeline row for {} at {}",
                    update.instrument_id, update.time_of_update
                ),
            }
        }
        progress.advance();
    }

    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{build_timeline, flatten_per_instrument};
    use quantline_core::RawRecord;
    use quantline_ingestion::RecordStream;

    fn row(date: &str, fields: &[(&str, &str)]) -> RawRecord {
        let mut record: RawRecord = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        record.insert("Date".to_string(), date.to_string());
        record
    }

    fn streams() -> Vec<RecordStream> {
        vec![
            RecordStream::available(
                "X",
                vec![
                    row("2020-01-01", &[("Close", "10")]),
                    row("2020-01-03", &[("Close", "12"), ("Volume", "300")]),
                ],
            ),
            RecordStream::available("Y", vec![row("2020-01-02", &[("Close", "5")])]),
        ]
    }

    fn column(matrix: &FeatureMatrix, col: usize) -> Vec<Option<f64>> {
        (0..matrix.n_rows()).map(|r| matrix.numeric(r, col)).collect()
    }

    #[test]
    fn test_grouped_matrices_forward_filled() {
        let grouped = build_timeline(streams(), "Date");
        let matrices =
            materialize_feature_matrices(&grouped.timeline, &grouped.groups, &grouped.universe);

        assert_eq!(matrices.keys().collect::<Vec<_>>(), vec!["Close", "Volume"]);

        let close = &matrices["Close"];
        assert_eq!(column(close, 0), vec![Some(10.0), Some(10.0), Some(12.0)]);
        assert_eq!(column(close, 1), vec![None, Some(5.0), Some(5.0)]);

        let volume = &matrices["Volume"];
        assert_eq!(volume.n_rows(), 3);
        assert_eq!(column(volume, 0), vec![None, None, Some(300.0)]);
        assert_eq!(column(volume, 1), vec![None, None, None]);
    }

    #[test]
    fn test_both_paths_agree() {
        let grouped = build_timeline(streams(), "Date");
        let from_groups =
            materialize_feature_matrices(&grouped.timeline, &grouped.groups, &grouped.universe);

        let flat = flatten_per_instrument(streams(), "Date");
        let from_series = materialize_from_series(&flat.timeline, &flat.series, &flat.universe);

        assert_eq!(from_groups, from_series);
    }

    #[test]
    fn test_materialize_is_repeatable() {
        let grouped = build_timeline(streams(), "Date");
        let first =
            materialize_feature_matrices(&grouped.timeline, &grouped.groups, &grouped.universe);
        let second =
            materialize_feature_matrices(&grouped.timeline, &grouped.groups, &grouped.universe);
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_cell_last_write_wins() {
        let streams = vec![RecordStream::available(
            "X",
            vec![
                row("2020-01-01", &[("Close", "1")]),
                row("2020-01-01", &[("Close", "2")]),
            ],
        )];
        let grouped = build_timeline(streams, "Date");
        let matrices =
            materialize_feature_matrices(&grouped.timeline, &grouped.groups, &grouped.universe);

        assert_eq!(grouped.groups[0].updates.len(), 2);
        assert_eq!(matrices["Close"].numeric(0, 0), Some(2.0));
    }
}
