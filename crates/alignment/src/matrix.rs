//! Feature matrices and lookback views.
//!
//! A `FeatureMatrix` holds one named feature over the full timeline
//! (rows) and instrument universe (columns), stored row-major.

use quantline_core::{FieldValue, Timestamp};
use std::collections::BTreeMap;

/// All matrices of a run, keyed by feature name.
pub type FeatureMatrices = BTreeMap<String, FeatureMatrix>;

/// Time × instrument table of values for one feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    name: String,
    times: Vec<Timestamp>,
    instruments: Vec<String>,
    cells: Vec<Option<FieldValue>>,
}

/// A cell counts as missing when empty or NaN.
#[inline]
fn is_missing(cell: &Option<FieldValue>) -> bool {
    match cell {
        None => true,
        Some(FieldValue::Number(n)) => n.is_nan(),
        Some(FieldValue::Text(_)) => false,
    }
}

impl FeatureMatrix {
    /// Create a matrix with every cell empty.
    pub fn empty(name: impl Into<String>, times: Vec<Timestamp>, instruments: Vec<String>) -> Self {
        let cells = vec![None; times.len() * instruments.len()];
        Self {
            name: name.into(),
            times,
            instruments,
            cells,
        }
    }

    /// Feature name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Row axis.
    pub fn times(&self) -> &[Timestamp] {
        &self.times
    }

    /// Column axis.
    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.times.len()
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.instruments.len()
    }

    /// Column index of an instrument.
    pub fn instrument_index(&self, instrument_id: &str) -> Option<usize> {
        self.instruments.iter().position(|i| i == instrument_id)
    }

    /// Index of the last row at or before `time`.
    pub fn row_index_at_or_before(&self, time: &Timestamp) -> Option<usize> {
        self.times.partition_point(|t| t <= time).checked_sub(1)
    }

    #[inline]
    fn offset(&self, row: usize, col: usize) -> usize {
        row * self.instruments.len() + col
    }

    /// Cell value, if populated.
    pub fn get(&self, row: usize, col: usize) -> Option<&FieldValue> {
        if row >= self.n_rows() || col >= self.n_cols() {
            return None;
        }
        self.cells[self.offset(row, col)].as_ref()
    }

    /// Numeric cell value, if populated with a number.
    pub fn numeric(&self, row: usize, col: usize) -> Option<f64> {
        self.get(row, col).and_then(FieldValue::as_f64)
    }

    /// All cells of one row, in instrument order.
    pub fn row(&self, row: usize) -> Option<&[Option<FieldValue>]> {
        if row >= self.n_rows() {
            return None;
        }
        let start = self.offset(row, 0);
        Some(&self.cells[start..start + self.n_cols()])
    }

    /// All cells of one instrument, in time order.
    pub fn column(&self, instrument_id: &str) -> Option<Vec<Option<&FieldValue>>> {
        let col = self.instrument_index(instrument_id)?;
        Some((0..self.n_rows()).map(|row| self.get(row, col)).collect())
    }

    /// Write a cell. Later writes to the same cell win.
    pub(crate) fn set(&mut self, row: usize, col: usize, value: FieldValue) {
        let offset = self.offset(row, col);
        self.cells[offset] = Some(value);
    }

    /// Carry each instrument's last observation forward over missing cells.
    ///
    /// Cells before an instrument's first observation stay empty. Running it
    /// twice is a no-op.
    pub fn forward_fill(&mut self) {
        let n_cols = self.n_cols();
        for col in 0..n_cols {
            let mut last: Option<FieldValue> = None;
            for row in 0..self.n_rows() {
                let offset = row * n_cols + col;
                if is_missing(&self.cells[offset]) {
                    if let Some(value) = &last {
                        self.cells[offset] = Some(value.clone());
                    }
                } else {
                    last = self.cells[offset].clone();
                }
            }
        }
    }

    /// Keep only rows whose timestamp satisfies `keep`.
    pub fn retain_rows(&mut self, keep: impl Fn(&Timestamp) -> bool) {
        let n_cols = self.n_cols();
        let mut times = Vec::with_capacity(self.times.len());
        let mut cells = Vec::with_capacity(self.cells.len());

        for (row, time) in self.times.iter().enumerate() {
            if keep(time) {
                times.push(*time);
                cells.extend_from_slice(&self.cells[row * n_cols..(row + 1) * n_cols]);
            }
        }

        self.times = times;
        self.cells = cells;
    }

    /// At most `period` rows ending at `current_row` (inclusive).
    pub fn lookback(&self, current_row: usize, period: usize) -> LookbackWindow<'_> {
        let end = (current_row + 1).min(self.n_rows());
        LookbackWindow {
            matrix: self,
            start: end.saturating_sub(period),
            end,
        }
    }

    /// Every row at or before `time`.
    pub fn lookback_until(&self, time: &Timestamp) -> LookbackWindow<'_> {
        LookbackWindow {
            matrix: self,
            start: 0,
            end: self.times.partition_point(|t| t <= time),
        }
    }
}

/// Read-only contiguous row range of a matrix, ending at "now".
#[derive(Debug, Clone, Copy)]
pub struct LookbackWindow<'a> {
    matrix: &'a FeatureMatrix,
    start: usize,
    end: usize,
}

impl<'a> LookbackWindow<'a> {
    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Feature name of the underlying matrix.
    pub fn name(&self) -> &'a str {
        self.matrix.name()
    }

    pub fn times(&self) -> &'a [Timestamp] {
        &self.matrix.times[self.start..self.end]
    }

    pub fn instruments(&self) -> &'a [String] {
        self.matrix.instruments()
    }

    /// Timestamp of the newest row.
    pub fn end_time(&self) -> Option<Timestamp> {
        self.times().last().copied()
    }

    /// The trailing `period` rows of this window.
    pub fn tail(&self, period: usize) -> LookbackWindow<'a> {
        LookbackWindow {
            matrix: self.matrix,
            start: self.end.saturating_sub(period).max(self.start),
            end: self.end,
        }
    }

    /// Cells of the `i`-th row of the window (0 = oldest).
    ///
    /// `None` past the window's end, even where the matrix has later rows.
    pub fn row(&self, i: usize) -> Option<&'a [Option<FieldValue>]> {
        if i >= self.len() {
            return None;
        }
        self.matrix.row(self.start + i)
    }

    /// Numeric view of the `i`-th row; text cells become `None`.
    pub fn numeric_row(&self, i: usize) -> Option<Vec<Option<f64>>> {
        let cells = self.row(i)?;
        Some(
            cells
                .iter()
                .map(|cell| cell.as_ref().and_then(FieldValue::as_f64))
                .collect(),
        )
    }

    /// One instrument's cells within the window.
    pub fn column(&self, instrument_id: &str) -> Option<Vec<Option<&'a FieldValue>>> {
        let col = self.matrix.instrument_index(instrument_id)?;
        Some(
            (self.start..self.end)
                .map(|row| self.matrix.get(row, col))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn num(v: f64) -> FieldValue {
        FieldValue::from(v)
    }

    fn day(d: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2020, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn matrix(rows: u32) -> FeatureMatrix {
        FeatureMatrix::empty(
            "Close",
            (1..=rows).map(day).collect(),
            vec!["X".to_string(), "Y".to_string()],
        )
    }

    #[test]
    fn test_forward_fill() {
        let mut m = matrix(4);
        m.set(0, 0, num(10.0));
        m.set(2, 0, num(12.0));
        m.set(1, 1, num(5.0));

        m.forward_fill();

        let x: Vec<_> = (0..4).map(|r| m.numeric(r, 0)).collect();
        let y: Vec<_> = (0..4).map(|r| m.numeric(r, 1)).collect();
        assert_eq!(x, vec![Some(10.0), Some(10.0), Some(12.0), Some(12.0)]);
        assert_eq!(y, vec![None, Some(5.0), Some(5.0), Some(5.0)]);
    }

    #[test]
    fn test_forward_fill_idempotent() {
        let mut m = matrix(5);
        m.set(1, 0, num(1.0));
        m.set(3, 0, FieldValue::Text("halted".to_string()));
        m.set(4, 1, num(2.0));

        m.forward_fill();
        let once = m.clone();
        m.forward_fill();
        assert_eq!(m, once);
    }

    #[test]
    fn test_nan_is_filled() {
        let mut m = matrix(3);
        m.set(0, 0, num(7.0));
        m.set(1, 0, num(f64::NAN));
        m.forward_fill();
        assert_eq!(m.numeric(1, 0), Some(7.0));
    }

    #[test]
    fn test_retain_rows() {
        let mut m = matrix(3);
        m.set(0, 0, num(1.0));
        m.set(1, 0, num(2.0));
        m.set(2, 1, num(3.0));

        m.retain_rows(|t| *t >= day(2));

        assert_eq!(m.times(), &[day(2), day(3)]);
        assert_eq!(m.numeric(0, 0), Some(2.0));
        assert_eq!(m.numeric(1, 1), Some(3.0));
        assert_eq!(m.numeric(1, 0), None);
    }

    #[test]
    fn test_lookback_never_crosses_now() {
        let m = matrix(5);

        let w = m.lookback(2, 10);
        assert_eq!(w.len(), 3);
        assert_eq!(w.end_time(), Some(day(3)));

        let w = m.lookback(4, 2);
        assert_eq!(w.times(), &[day(4), day(5)]);

        let w = m.lookback_until(&day(3)).tail(2);
        assert_eq!(w.times(), &[day(2), day(3)]);

        let before_start = m.lookback_until(&(day(1) - Duration::days(1)));
        assert!(before_start.is_empty());
    }

    #[test]
    fn test_row_index_at_or_before() {
        let m = matrix(3);
        assert_eq!(m.row_index_at_or_before(&day(2)), Some(1));
        assert_eq!(m.row_index_at_or_before(&day(9)), Some(2));
        assert_eq!(m.row_index_at_or_before(&(day(1) - Duration::days(1))), None);
    }

    #[test]
    fn test_window_rows_stop_at_now() {
        let mut m = matrix(3);
        m.set(0, 0, num(10.0));
        m.set(2, 0, num(99.0));

        let w = m.lookback_until(&day(1));
        assert_eq!(w.len(), 1);
        assert_eq!(w.numeric_row(0), Some(vec![Some(10.0), None]));
        assert_eq!(w.row(1), None);
        assert_eq!(w.numeric_row(2), None);

        let w = m.lookback(2, 2);
        assert_eq!(w.numeric_row(1), Some(vec![Some(99.0), None]));
        assert_eq!(w.row(2), None);
    }

    #[test]
    fn test_row_out_of_range() {
        let m = matrix(2);
        assert_eq!(m.row(1).map(<[_]>::len), Some(2));
        assert_eq!(m.row(2), None);
        assert_eq!(m.get(2, 0), None);
    }

    #[test]
    fn test_column_view() {
        let mut m = matrix(3);
        m.set(2, 1, num(4.0));
        let col = m.lookback(2, 2).column("Y").unwrap();
        assert_eq!(col, vec![None, Some(&FieldValue::from(4.0))]);
        assert!(m.column("Z").is_none());
    }
}
