//! Record acquisition and normalization for the quantline system.
//!
//! This crate handles:
//! - The acquisition contract (`RecordSource`) and per-instrument streams
//! - Reading the on-disk CSV cache
//! - Row normalization into `InstrumentUpdate`s

pub mod csv_cache;
pub mod normalize;
pub mod source;

pub use csv_cache::CachedCsvSource;
pub use normalize::{normalize_record, normalize_records};
pub use source::{collect_streams, MemorySource, RecordSource, RecordStream, StreamOutcome};
