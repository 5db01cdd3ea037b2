//! Core data types for the quantline system.

use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Point on the global time axis.
pub type Timestamp = NaiveDateTime;

/// Numeric cell value with total ordering (NaN compares equal to itself).
pub type Number = OrderedFloat<f64>;

/// One source row: header name to raw text.
pub type RawRecord = BTreeMap<String, String>;

/// Canonical date format used for cache keys and logs.
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Date formats accepted for caller-supplied start and end dates.
const CONFIG_DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Parse text as a number.
///
/// Total over all inputs: surrounding whitespace is ignored, empty text is not
/// numeric, and anything `f64` accepts (including `nan` and `inf`) is numeric.
pub fn try_parse_numeric(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Parse a caller-supplied date in either accepted format.
pub fn parse_config_date(text: &str) -> Result<NaiveDate> {
    let trimmed = text.trim();
    CONFIG_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| {
            Error::invalid_date(format!(
                "'{text}' matches neither YYYY-MM-DD nor YYYY/MM/DD"
            ))
        })
}

/// Parse the date field of a source row.
///
/// Plain `YYYY-MM-DD` dates map to midnight.
pub fn parse_record_date(text: &str) -> Option<Timestamp> {
    let trimmed = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, CANONICAL_DATE_FORMAT) {
        return Some(date.and_time(NaiveTime::MIN));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S").ok()
}

/// A single feature value: numeric where parseable, else the original text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(Number),
    Text(String),
}

impl FieldValue {
    /// Coerce raw text, preferring a numeric value.
    pub fn from_text(text: &str) -> Self {
        match try_parse_numeric(text) {
            Some(v) => FieldValue::Number(OrderedFloat(v)),
            None => FieldValue::Text(text.to_string()),
        }
    }

    /// Numeric value, if any.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(n.into_inner()),
            FieldValue::Text(_) => None,
        }
    }

    /// Is this a numeric value?
    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldValue::Number(_))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(OrderedFloat(v))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// Normalized update for one instrument at one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentUpdate {
    /// Instrument identifier, stable across the run.
    pub instrument_id: String,
    /// Time of the update.
    pub time_of_update: Timestamp,
    /// Feature values keyed by feature name (date field excluded).
    pub fields: BTreeMap<String, FieldValue>,
}

impl InstrumentUpdate {
    /// Create an update.
    pub fn new(
        instrument_id: impl Into<String>,
        time_of_update: Timestamp,
        fields: BTreeMap<String, FieldValue>,
    ) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            time_of_update,
            fields,
        }
    }
}

/// All updates sharing one exact timestamp, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeGroup {
    pub timestamp: Timestamp,
    pub updates: Vec<InstrumentUpdate>,
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::config(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse both ends from caller-supplied text.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_config_date(start)?, parse_config_date(end)?)
    }

    /// Does the range contain the timestamp's calendar date?
    #[inline]
    pub fn contains(&self, ts: &Timestamp) -> bool {
        let date = ts.date();
        self.start <= date && date <= self.end
    }

    /// Cache-key suffix, e.g. `_2020-01-01to2020-12-31`.
    pub fn cache_suffix(&self) -> String {
        format!(
            "_{}to{}",
            self.start.format(CANONICAL_DATE_FORMAT),
            self.end.format(CANONICAL_DATE_FORMAT)
        )
    }
}
