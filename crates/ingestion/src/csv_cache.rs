//! On-disk CSV cache.
//!
//! Layout: `{cached_folder_name}/{data_set_id}/{INSTRUMENT}_{start}to{end}.csv`
//!
//! Each file holds one instrument's rows for one date range, with a header
//! line naming the fields. Retrieval from a remote provider is not done here:
//! a missing file means the instrument is unavailable.

use crate::source::RecordSource;
use quantline_core::{DateRange, Error, RawRecord, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Record source backed by cached CSV files.
#[derive(Debug, Clone)]
pub struct CachedCsvSource {
    dataset_dir: PathBuf,
}

impl CachedCsvSource {
    /// Open the cache, creating the dataset directory if needed.
    pub fn open(cached_folder_name: impl AsRef<Path>, data_set_id: &str) -> Result<Self> {
        let dataset_dir = cached_folder_name.as_ref().join(data_set_id);
        fs::create_dir_all(&dataset_dir)?;
        Ok(Self { dataset_dir })
    }

    /// Directory holding this dataset's files.
    pub fn dataset_dir(&self) -> &Path {
        &self.dataset_dir
    }

    /// Path of the cache file for an instrument and range.
    pub fn file_path(&self, instrument_id: &str, range: &DateRange) -> PathBuf {
        self.dataset_dir
            .join(format!("{instrument_id}{}.csv", range.cache_suffix()))
    }

    /// Write rows for an instrument into the cache.
    ///
    /// The header is the union of all row keys; absent fields are left blank.
    pub fn store(&self, instrument_id: &str, range: &DateRange, records: &[RawRecord]) -> Result<()> {
        let headers: BTreeSet<&str> = records
            .iter()
            .flat_map(|r| r.keys().map(String::as_str))
            .collect();

        let path = self.file_path(instrument_id, range);
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(&headers)?;
        for record in records {
            writer.write_record(
                headers
                    .iter()
                    .map(|h| record.get(*h).map(String::as_str).unwrap_or("")),
            )?;
        }
        writer.flush()?;
        debug!(instrument_id, rows = records.len(), path = %path.display(), "Cached rows");
        Ok(())
    }
}

impl RecordSource for CachedCsvSource {
    fn fetch(&self, instrument_id: &str, range: &DateRange) -> Result<Vec<RawRecord>> {
        let path = self.file_path(instrument_id, range);
        if !path.is_file() {
            return Err(Error::unavailable(format!(
                "{instrument_id}: no cached file at {}",
                path.display()
            )));
        }

        let mut reader = csv::Reader::from_path(&path)?;
        let headers = reader.headers()?.clone();
        let mut records = Vec::new();

        for (line, row) in reader.records().enumerate() {
            match row {
                Ok(row) => records.push(
                    headers
                        .iter()
                        .zip(row.iter())
                        .map(|(h, v)| (h.to_string(), v.to_string()))
                        .collect(),
                ),
                Err(e) => warn!("{}: dropping row {}: {}", instrument_id, line + 1, e),
            }
        }

        Ok(records)
    }

    fn discover_instruments(&self, range: &DateRange) -> Result<Vec<String>> {
        let suffix = format!("{}.csv", range.cache_suffix());
        let mut instruments = Vec::new();

        for entry in fs::read_dir(&self.dataset_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(instrument_id) = name.strip_suffix(&suffix) {
                if !instrument_id.is_empty() {
                    instruments.push(instrument_id.to_string());
                }
            }
        }

        instruments.sort();
        Ok(instruments)
    }
}
