//! Percentile rank feature.
//!
//! Ranks use the average-rank tie rule and are scaled by the number of ranked
//! values, so they lie in (0, 1] and the largest value ranks 1.0. For
//! `[1, 1, 2]` the ranks are `[0.5, 0.5, 1.0]`. Missing, NaN and text values
//! are left out of the ranking and stay `None`.

use crate::feature::{Feature, InstrumentValues, MarketFeatures};
use crate::provider::LookbackProvider;
use quantline_align::LookbackWindow;
use quantline_core::{FeatureParams, Result, Timestamp};
use statrs::statistics::{Data, OrderStatistics, RankTieBreaker};
use tracing::trace;

/// Percentile ranks of the present values.
pub fn percentile_ranks(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let present: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|x| !x.is_nan()).map(|x| (i, x)))
        .collect();

    let mut ranked = vec![None; values.len()];
    if present.is_empty() {
        return ranked;
    }

    let count = present.len() as f64;
    let mut data = Data::new(present.iter().map(|(_, v)| *v).collect::<Vec<f64>>());
    let ranks = data.ranks(RankTieBreaker::Average);

    for ((idx, _), rank) in present.iter().zip(ranks) {
        ranked[*idx] = Some(rank / count);
    }
    ranked
}

/// Percentile rank of a feature.
///
/// Per instrument: each row of the window is ranked across instruments.
/// Market level: each row of the window is ranked against the other rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankFeature;

impl RankFeature {
    /// Cross-sectional ranks of every row in the window, oldest first.
    pub fn cross_sectional_ranks(window: &LookbackWindow<'_>) -> Vec<Vec<Option<f64>>> {
        (0..window.len())
            .filter_map(|i| window.numeric_row(i))
            .map(|row| percentile_ranks(&row))
            .collect()
    }
}

impl Feature for RankFeature {
    fn compute_for_instrument(
        &self,
        update_num: usize,
        time: Timestamp,
        params: &FeatureParams,
        feature_key: &str,
        lookback: &dyn LookbackProvider,
    ) -> Result<InstrumentValues> {
        params.validate()?;
        let window = lookback
            .lookback_feature_data(&params.feature_name)?
            .tail(params.period);
        trace!(
            feature_key,
            update_num,
            %time,
            rows = window.len(),
            "Ranking across instruments"
        );

        let instruments = window.instruments().to_vec();
        let values = Self::cross_sectional_ranks(&window)
            .pop()
            .unwrap_or_else(|| vec![None; instruments.len()]);

        Ok(InstrumentValues {
            time: window.end_time(),
            instruments,
            values,
        })
    }

    fn compute_for_market(
        &self,
        update_num: usize,
        time: Timestamp,
        params: &FeatureParams,
        feature_key: &str,
        _current_market_features: &MarketFeatures,
        lookback: &dyn LookbackProvider,
    ) -> Result<Option<f64>> {
        params.validate()?;
        let window = lookback
            .lookback_market_data(&params.feature_name)?
            .tail(params.period);
        trace!(
            feature_key,
            update_num,
            %time,
            rows = window.len(),
            "Ranking market series over time"
        );

        Ok(percentile_ranks(window.values()).last().copied().flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{HistoryView, MarketHistory};
    use approx::assert_relative_eq;
    use quantline_align::{AlignMode, SeriesAligner};
    use quantline_core::RawRecord;
    use quantline_ingestion::RecordStream;
    use chrono::NaiveDate;

    fn day(d: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2020, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn row(date: &str, close: &str) -> RawRecord {
        [("Date", date), ("Close", close)]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Three instruments over three days; day 1 ordering is the reverse of
    /// days 2 and 3.
    fn aligner() -> SeriesAligner {
        let streams = vec![
            RecordStream::available(
                "A",
                vec![row("2020-01-01", "30"), row("2020-01-02", "1"), row("2020-01-03", "1")],
            ),
            RecordStream::available(
                "B",
                vec![row("2020-01-01", "20"), row("2020-01-02", "2"), row("2020-01-03", "2")],
            ),
            RecordStream::available(
                "C",
                vec![row("2020-01-01", "10"), row("2020-01-02", "3"), row("2020-01-03", "3")],
            ),
        ];
        SeriesAligner::from_streams(streams, AlignMode::Live, "Date", None)
    }

    fn assert_ranks(actual: &[Option<f64>], expected: &[Option<f64>]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            match (a, e) {
                (Some(a), Some(e)) => assert_relative_eq!(*a, *e, epsilon = 1e-12),
                _ => assert_eq!(a, e),
            }
        }
    }

    #[test]
    fn test_average_rank_ties() {
        let ranks = percentile_ranks(&[Some(1.0), Some(1.0), Some(2.0)]);
        assert_ranks(&ranks, &[Some(0.5), Some(0.5), Some(1.0)]);
    }

    #[test]
    fn test_missing_values_excluded() {
        let ranks = percentile_ranks(&[Some(5.0), None, Some(f64::NAN), Some(3.0)]);
        assert_ranks(&ranks, &[Some(1.0), None, None, Some(0.5)]);
        assert_eq!(percentile_ranks(&[None, None]), vec![None, None]);
        assert!(percentile_ranks(&[]).is_empty());
    }

    #[test]
    fn test_ranks_in_unit_interval() {
        let values: Vec<Option<f64>> = [3.0, -1.0, 7.5, 7.5, 0.0, 2.0, -1.0]
            .iter()
            .map(|v| Some(*v))
            .collect();
        let ranks = percentile_ranks(&values);
        for r in ranks.iter().flatten() {
            assert!(*r > 0.0 && *r <= 1.0);
        }
        // Average ranks sum to n(n+1)/2, scaled by n.
        let sum: f64 = ranks.iter().flatten().sum();
        assert_relative_eq!(sum, (values.len() + 1) as f64 / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_deterministic() {
        let values = [Some(2.0), Some(2.0), Some(1.0), Some(9.0)];
        assert_eq!(percentile_ranks(&values), percentile_ranks(&values));
    }

    #[test]
    fn test_instrument_rank_uses_latest_row() {
        let aligner = aligner();
        let view = HistoryView::new(aligner.feature_matrices(), day(3));
        let params = FeatureParams::new("Close", 2);

        let result = RankFeature
            .compute_for_instrument(2, day(3), &params, "close_rank", &view)
            .unwrap();

        assert_eq!(result.time, Some(day(3)));
        assert_eq!(result.instruments, vec!["A", "B", "C"]);
        assert_ranks(&result.values, &[Some(1.0 / 3.0), Some(2.0 / 3.0), Some(1.0)]);
    }

    #[test]
    fn test_window_excludes_older_rows() {
        let aligner = aligner();
        let matrix = aligner.feature_matrix("Close").unwrap();
        let window = matrix.lookback_until(&day(3)).tail(2);

        let ranks = RankFeature::cross_sectional_ranks(&window);

        assert_eq!(ranks.len(), 2);
        for row in &ranks {
            assert_ranks(row, &[Some(1.0 / 3.0), Some(2.0 / 3.0), Some(1.0)]);
        }
    }

    #[test]
    fn test_never_reads_past_now() {
        let aligner = aligner();
        let view = HistoryView::new(aligner.feature_matrices(), day(1));
        let params = FeatureParams::new("Close", 5);

        let result = RankFeature
            .compute_for_instrument(0, day(1), &params, "close_rank", &view)
            .unwrap();

        assert_eq!(result.time, Some(day(1)));
        assert_ranks(&result.values, &[Some(1.0), Some(2.0 / 3.0), Some(1.0 / 3.0)]);
    }

    #[test]
    fn test_before_first_row() {
        let aligner = aligner();
        let before = day(1) - chrono::Duration::days(1);
        let view = HistoryView::new(aligner.feature_matrices(), before);
        let result = RankFeature
            .compute_for_instrument(0, before, &FeatureParams::new("Close", 3), "k", &view)
            .unwrap();
        assert_eq!(result.time, None);
        assert_eq!(result.values, vec![None, None, None]);
    }

    #[test]
    fn test_market_rank_self_relative() {
        let aligner = aligner();
        let mut history = MarketHistory::new();
        for (d, v) in [(1, 5.0), (2, 1.0), (3, 3.0)] {
            history.record(day(d), "breadth", Some(v)).unwrap();
        }
        let view = HistoryView::new(aligner.feature_matrices(), day(3)).with_market(&history);

        let full = RankFeature
            .compute_for_market(2, day(3), &FeatureParams::new("breadth", 3), "k", &MarketFeatures::new(), &view)
            .unwrap();
        assert_relative_eq!(full.unwrap(), 2.0 / 3.0, epsilon = 1e-12);

        let short = RankFeature
            .compute_for_market(2, day(3), &FeatureParams::new("breadth", 2), "k", &MarketFeatures::new(), &view)
            .unwrap();
        assert_relative_eq!(short.unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_period_rejected() {
        let aligner = aligner();
        let view = HistoryView::new(aligner.feature_matrices(), day(3));
        assert!(RankFeature
            .compute_for_instrument(0, day(3), &FeatureParams::new("Close", 0), "k", &view)
            .is_err());
    }
}
