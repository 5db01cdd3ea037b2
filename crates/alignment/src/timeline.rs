//! Timeline construction.
//!
//! Two shapes of the same input:
//! - `GroupedTimeline`: every update bucketed by exact timestamp (live path)
//! - `InstrumentSeries`: each instrument's series kept whole, timestamps
//!   unioned (batch path)
//!
//! Unavailable instruments are dropped from the universe here.

use quantline_core::{InstrumentUpdate, TimeGroup, Timestamp};
use quantline_ingestion::{normalize_records, RecordStream, StreamOutcome};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Updates grouped by timestamp, ascending.
#[derive(Debug, Clone, Default)]
pub struct GroupedTimeline {
    /// Instruments that produced a stream (post-skip).
    pub universe: Vec<String>,
    /// Distinct timestamps, strictly ascending.
    pub timeline: Vec<Timestamp>,
    /// One group per timeline entry, same order.
    pub groups: Vec<TimeGroup>,
}

/// Whole per-instrument series on a unioned timeline.
#[derive(Debug, Clone, Default)]
pub struct InstrumentSeries {
    /// Instruments that produced a stream (post-skip).
    pub universe: Vec<String>,
    /// Union of all instruments' timestamps, strictly ascending.
    pub timeline: Vec<Timestamp>,
    /// Parsed updates per instrument, in source order.
    pub series: Vec<(String, Vec<InstrumentUpdate>)>,
}

/// Normalize every available stream; skip unavailable ones.
///
/// The first stream for an instrument id wins; repeats are ignored.
fn parse_streams(streams: Vec<RecordStream>, date_field: &str) -> Vec<(String, Vec<InstrumentUpdate>)> {
    let mut series: Vec<(String, Vec<InstrumentUpdate>)> = Vec::with_capacity(streams.len());

    for stream in streams {
        if series.iter().any(|(id, _)| *id == stream.instrument_id) {
            warn!("Ignoring repeated stream for {}", stream.instrument_id);
            continue;
        }

        let records = match stream.outcome {
            StreamOutcome::Available(records) => records,
            StreamOutcome::Unavailable(reason) => {
                warn!("Skipping {}: {}", stream.instrument_id, reason);
                continue;
            }
        };

        let updates = normalize_records(&stream.instrument_id, &records, date_field);
        info!(
            instrument_id = %stream.instrument_id,
            rows = records.len(),
            updates = updates.len(),
            "Parsed instrument"
        );

        series.push((stream.instrument_id, updates));
    }

    series
}

/// Flatten all instruments' updates and group them by exact timestamp.
///
/// Within a group, updates keep insertion order: instrument order first,
/// then source row order.
pub fn build_timeline(streams: Vec<RecordStream>, date_field: &str) -> GroupedTimeline {
    let series = parse_streams(streams, date_field);
    let universe: Vec<String> = series.iter().map(|(id, _)| id.clone()).collect();

    let mut by_time: BTreeMap<Timestamp, Vec<InstrumentUpdate>> = BTreeMap::new();
    for (_, updates) in series {
        for update in updates {
            by_time.entry(update.time_of_update).or_default().push(update);
        }
    }

    let groups: Vec<TimeGroup> = by_time
        .into_iter()
        .map(|(timestamp, updates)| TimeGroup { timestamp, updates })
        .collect();
    let timeline = groups.iter().map(|g| g.timestamp).collect();

    GroupedTimeline {
        universe,
        timeline,
        groups,
    }
}

/// Keep each instrument's series whole and union their timestamps.
///
/// Per-instrument series need not be sorted; placement on the timeline is
/// by timestamp lookup.
pub fn flatten_per_instrument(streams: Vec<RecordStream>, date_field: &str) -> InstrumentSeries {
    let series = parse_streams(streams, date_field);
    let universe = series.iter().map(|(id, _)| id.clone()).collect();

    let timeline: BTreeSet<Timestamp> = series
        .iter()
        .flat_map(|(_, updates)| updates.iter().map(|u| u.time_of_update))
        .collect();

    InstrumentSeries {
        universe,
        timeline: timeline.into_iter().collect(),
        series,
    }
}
