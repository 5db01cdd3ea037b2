//! Acquisition contract.
//!
//! A `RecordSource` yields raw rows per instrument, or reports that it has
//! nothing for that instrument. Unavailability never fails a whole run: it is
//! captured per instrument in a `RecordStream`.

use quantline_core::{DateRange, Error, RawRecord, Result};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Source of raw per-instrument rows.
pub trait RecordSource {
    /// Fetch all rows for one instrument within the date range.
    ///
    /// `Err(Error::Unavailable)` means the source has no data for it.
    fn fetch(&self, instrument_id: &str, range: &DateRange) -> Result<Vec<RawRecord>>;

    /// List every instrument the source can provide.
    fn discover_instruments(&self, range: &DateRange) -> Result<Vec<String>>;
}

/// Outcome of acquiring one instrument.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    /// Rows in source order.
    Available(Vec<RawRecord>),
    /// The source had nothing; carries the reason for logging.
    Unavailable(String),
}

/// Raw rows for one instrument, or the reason there are none.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordStream {
    pub instrument_id: String,
    pub outcome: StreamOutcome,
}

impl RecordStream {
    pub fn available(instrument_id: impl Into<String>, records: Vec<RawRecord>) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            outcome: StreamOutcome::Available(records),
        }
    }

    pub fn unavailable(instrument_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            outcome: StreamOutcome::Unavailable(reason.into()),
        }
    }

    #[inline]
    pub fn is_available(&self) -> bool {
        matches!(self.outcome, StreamOutcome::Available(_))
    }
}

/// Acquire every instrument in the universe.
///
/// Per-instrument failures become `StreamOutcome::Unavailable`; this function
/// itself never fails.
pub fn collect_streams(
    source: &dyn RecordSource,
    universe: &[String],
    range: &DateRange,
) -> Vec<RecordStream> {
    universe
        .iter()
        .map(|instrument_id| {
            info!("Processing data for instrument: {}", instrument_id);
            match source.fetch(instrument_id, range) {
                Ok(records) => RecordStream::available(instrument_id.clone(), records),
                Err(e) => {
                    debug!("Acquisition failed for {}: {}", instrument_id, e);
                    RecordStream::unavailable(instrument_id.clone(), e.to_string())
                }
            }
        })
        .collect()
}

/// In-memory source keyed by instrument.
///
/// Rows are returned as stored; the date range is not applied.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: BTreeMap<String, Vec<RawRecord>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) rows for an instrument.
    pub fn insert(&mut self, instrument_id: impl Into<String>, records: Vec<RawRecord>) {
        self.records.insert(instrument_id.into(), records);
    }

    /// Builder-style `insert`.
    pub fn with(mut self, instrument_id: impl Into<String>, records: Vec<RawRecord>) -> Self {
        self.insert(instrument_id, records);
        self
    }
}

impl RecordSource for MemorySource {
    fn fetch(&self, instrument_id: &str, _range: &DateRange) -> Result<Vec<RawRecord>> {
        self.records
            .get(instrument_id)
            .cloned()
            .ok_or_else(|| Error::unavailable(format!("{instrument_id} not present")))
    }

    fn discover_instruments(&self, _range: &DateRange) -> Result<Vec<String>> {
        Ok(self.records.keys().cloned().collect())
    }
}
