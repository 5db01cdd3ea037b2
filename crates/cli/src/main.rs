//! quantline command line.
//!
//! `quantline align --config run.json` aligns the cached instrument files
//! named by the configuration and prints a JSON summary, including every
//! configured feature evaluated at the chosen point in time.
//! `quantline import` copies a downloaded CSV into that cache.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use quantline_align::SeriesAligner;
use quantline_core::{parse_config_date, Config, RawRecord, Timestamp};
use quantline_features::{FeatureEngine, HistoryView, InstrumentValues};
use quantline_ingestion::CachedCsvSource;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "quantline", about = "Align per-instrument history and compute rolling features")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Align cached data and evaluate configured features.
    Align {
        /// JSON configuration file.
        #[arg(long)]
        config: PathBuf,
        /// Evaluate features as of this date instead of the closing time.
        #[arg(long)]
        at: Option<String>,
    },
    /// Copy an instrument's CSV export into the data cache.
    Import {
        /// JSON configuration file naming the cache and date range.
        #[arg(long)]
        config: PathBuf,
        /// Instrument the file belongs to.
        #[arg(long)]
        instrument: String,
        /// CSV file with a header row.
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Serialize)]
struct AlignSummary {
    mode: String,
    timestamps: usize,
    first_time: Option<Timestamp>,
    closing_time: Option<Timestamp>,
    instruments: Vec<String>,
    features: Vec<String>,
    evaluated_at: Option<Timestamp>,
    derived: BTreeMap<String, InstrumentValues>,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run_align(config_path: PathBuf, at: Option<String>) -> Result<()> {
    let config = Config::load(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    let source = CachedCsvSource::open(&config.data.cached_folder_name, &config.data.data_set_id)
        .context("opening data cache")?;

    let aligner = SeriesAligner::from_source(&config.data, &source)?;
    let engine = FeatureEngine::new(&config)?;

    let evaluated_at = match at {
        Some(text) => {
            let date = parse_config_date(&text)?;
            let Some(end_of_day) = date.and_hms_opt(23, 59, 59) else {
                bail!("invalid evaluation date {text}");
            };
            Some(end_of_day)
        }
        None => aligner.closing_time(),
    };

    let derived = match evaluated_at {
        Some(time) => {
            let update_num = aligner.timeline().partition_point(|t| *t <= time);
            let view = HistoryView::new(aligner.feature_matrices(), time);
            engine.compute_instrument_features(update_num.saturating_sub(1), time, &view)?
        }
        None => BTreeMap::new(),
    };

    let summary = AlignSummary {
        mode: format!("{:?}", aligner.mode()),
        timestamps: aligner.timeline().len(),
        first_time: aligner.timeline().first().copied(),
        closing_time: aligner.closing_time(),
        instruments: aligner.instrument_ids().to_vec(),
        features: aligner.feature_names().map(str::to_string).collect(),
        evaluated_at,
        derived,
    };
    info!(
        timestamps = summary.timestamps,
        instruments = summary.instruments.len(),
        "Run summary ready"
    );

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_import(config_path: PathBuf, instrument: String, file: PathBuf) -> Result<()> {
    let config = Config::load(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    let range = config.data.date_range()?;

    let mut reader = csv::Reader::from_path(&file)
        .with_context(|| format!("opening {}", file.display()))?;
    let headers = reader.headers()?.clone();
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let record: RawRecord = headers
            .iter()
            .zip(row.iter())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        records.push(record);
    }

    let cache = CachedCsvSource::open(&config.data.cached_folder_name, &config.data.data_set_id)
        .context("opening data cache")?;
    cache.store(&instrument, &range, &records)?;
    info!(
        instrument = %instrument,
        rows = records.len(),
        path = %cache.file_path(&instrument, &range).display(),
        "Imported instrument"
    );
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Align { config, at } => run_align(config, at),
        Command::Import {
            config,
            instrument,
            file,
        } => run_import(config, instrument, file),
    }
}
