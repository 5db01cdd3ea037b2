//! Row normalization.
//!
//! Turns raw source rows into `InstrumentUpdate`s. Every non-date field goes
//! through the same numeric coercion; the date field becomes the update time.
//! Blank fields are not observations and are left out.

use quantline_core::{
    parse_record_date, Error, FieldValue, InstrumentUpdate, RawRecord, Result,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Normalize a single row.
///
/// Fails if the row has no date field or the date does not parse.
pub fn normalize_record(
    instrument_id: &str,
    record: &RawRecord,
    date_field: &str,
) -> Result<InstrumentUpdate> {
    let raw_date = record.get(date_field).ok_or_else(|| {
        Error::malformed(format!("{instrument_id}: row has no '{date_field}' field"))
    })?;
    let time_of_update = parse_record_date(raw_date).ok_or_else(|| {
        Error::malformed(format!("{instrument_id}: unparseable date '{raw_date}'"))
    })?;

    let fields: BTreeMap<String, FieldValue> = record
        .iter()
        .filter(|(key, value)| key.as_str() != date_field && !value.trim().is_empty())
        .map(|(key, value)| (key.clone(), FieldValue::from_text(value)))
        .collect();

    Ok(InstrumentUpdate::new(instrument_id, time_of_update, fields))
}

/// Normalize all rows of one instrument, dropping malformed rows.
pub fn normalize_records(
    instrument_id: &str,
    records: &[RawRecord],
    date_field: &str,
) -> Vec<InstrumentUpdate> {
    let mut updates = Vec::with_capacity(records.len());
    let mut dropped = 0usize;

    for record in records {
        match normalize_record(instrument_id, record, date_field) {
            Ok(update) => updates.push(update),
            Err(e) => {
                dropped += 1;
                debug!("Dropping row: {}", e);
            }
        }
    }

    if dropped > 0 {
        debug!(
            instrument_id,
            dropped,
            kept = updates.len(),
            "Dropped malformed rows"
        );
    }

    updates
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn row(pairs: &[(&str, &str)]) -> RawRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_normalize_numeric_and_text() {
        let record = row(&[("Date", "2020-01-02"), ("Close", "101.5"), ("Note", "split")]);
        let update = normalize_record("AAPL", &record, "Date").unwrap();

        assert_eq!(update.instrument_id, "AAPL");
        assert_eq!(update.time_of_update.date().to_string(), "2020-01-02");
        assert!(!update.fields.contains_key("Date"));
        assert_relative_eq!(update.fields["Close"].as_f64().unwrap(), 101.5);
        assert_eq!(update.fields["Note"], FieldValue::Text("split".to_string()));
    }

    #[test]
    fn test_blank_fields_skipped() {
        let record = row(&[("Date", "2020-01-02"), ("Close", "1"), ("Volume", " ")]);
        let update = normalize_record("X", &record, "Date").unwrap();
        assert_eq!(update.fields.len(), 1);
        assert!(!update.fields.contains_key("Volume"));
    }

    #[test]
    fn test_missing_date_is_malformed() {
        let record = row(&[("Close", "1.0")]);
        assert!(matches!(
            normalize_record("AAPL", &record, "Date"),
            Err(Error::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_custom_date_field() {
        let record = row(&[("day", "2020-03-01"), ("v", "2")]);
        assert!(normalize_record("X", &record, "Date").is_err());
        assert!(normalize_record("X", &record, "day").is_ok());
    }

    #[test]
    fn test_bad_rows_dropped_individually() {
        let records = vec![
            row(&[("Date", "2020-01-01"), ("Close", "10")]),
            row(&[("Date", "not a date"), ("Close", "11")]),
            row(&[("Date", "2020-01-03"), ("Close", "12")]),
        ];
        let updates = normalize_records("X", &records, "Date");

        assert_eq!(updates.len(), 2);
        assert_relative_eq!(updates[1].fields["Close"].as_f64().unwrap(), 12.0);
    }
}
