//! tzdb-ingest - tz database and gazetteer loader
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tzdb_ingest::config::{CliArgs, IngestConfig};
use tzdb_ingest::db::{keys, MemorySink, RecordSink, SqliteSink};
use tzdb_ingest::fs::LocalFs;
use tzdb_ingest::pipeline::{IngestCoordinator, IngestResult, Progress};
use tzdb_ingest::progress::{print_header, print_summary, ProgressReporter};
use tzdb_ingest::report::TracingReporter;

/// Channel capacity of the SQLite writer, in batches
const SINK_CHANNEL_SIZE: usize = 64;

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every input file was loaded
fn run() -> Result<bool> {
    let args = CliArgs::parse();

    setup_logging(args.verbose)?;

    let config = IngestConfig::from_args(args).context("Invalid configuration")?;

    let output = config.output_path.display().to_string();
    if config.show_progress {
        print_header(
            config.tzdb_dir.as_deref().map(display).as_deref(),
            config.gazetteer_dir.as_deref().map(display).as_deref(),
            config.worker_count,
            if config.dry_run { "(dry run)" } else { &output },
        );
    }

    let reporter = Arc::new(TracingReporter::new());
    let progress_bar = config.show_progress.then(|| Arc::new(ProgressReporter::new()));
    let progress = match &progress_bar {
        Some(bar) => Arc::new(Progress::with_listener(bar.clone())),
        None => Arc::new(Progress::new()),
    };

    let start_time = Utc::now();

    let (result, db_size) = if config.dry_run {
        let sink = Arc::new(MemorySink::new());
        let result = ingest(&config, reporter, sink, progress)?;
        (result, None)
    } else {
        let sqlite = Arc::new(
            SqliteSink::new(&config.output_path, config.batch_size, SINK_CHANNEL_SIZE)
                .with_context(|| format!("Failed to open database '{}'", output))?,
        );
        let result = ingest(&config, reporter, sqlite.clone(), progress)?;

        let sqlite = Arc::try_unwrap(sqlite)
            .map_err(|_| anyhow::anyhow!("Database writer still in use"))?;
        let rows = sqlite
            .finish(&run_info(&config, &result, start_time))
            .context("Failed to finalize database")?;
        info!(rows, path = %output, "Database written");

        let db_size = std::fs::metadata(&config.output_path).map(|m| m.len()).ok();
        (result, db_size)
    };

    if let Some(bar) = &progress_bar {
        if result.is_complete() {
            bar.finish("Ingest completed");
        } else {
            bar.finish("Ingest completed with failures");
        }
    }

    if config.show_progress {
        print_summary(&result, (!config.dry_run).then_some(output.as_str()), db_size);
    }

    if !result.is_complete() {
        warn!(
            failed = result.failed_files.len(),
            unprocessed = result.unprocessed_files.len(),
            "Some gazetteer files were not loaded"
        );
    }

    Ok(result.is_complete())
}

fn ingest(
    config: &IngestConfig,
    reporter: Arc<TracingReporter>,
    sink: Arc<dyn RecordSink>,
    progress: Arc<Progress>,
) -> Result<IngestResult> {
    IngestCoordinator::new(config.clone(), Arc::new(LocalFs), reporter, sink)
        .with_progress(progress)
        .run()
        .context("Ingest failed")
}

/// Metadata stored in the `ingest_info` table
fn run_info(
    config: &IngestConfig,
    result: &IngestResult,
    start_time: chrono::DateTime<Utc>,
) -> Vec<(&'static str, String)> {
    let mut info = vec![
        (keys::START_TIME, start_time.to_rfc3339()),
        (keys::END_TIME, Utc::now().to_rfc3339()),
        (keys::DURATION_SECS, result.duration.as_secs().to_string()),
        (keys::WORKER_COUNT, config.worker_count.to_string()),
        (keys::CURRENT_YEAR, config.current_year.to_string()),
        (keys::TIMEZONE_COUNT, result.time_zones.to_string()),
        (keys::RULE_COUNT, result.rules.to_string()),
        (keys::LEAP_COUNT, result.leaps.to_string()),
        (keys::CITY_COUNT, result.cities_loaded.to_string()),
        (keys::FEATURE_CODE_COUNT, result.feature_codes.to_string()),
        (keys::ISSUE_COUNT, result.issues.total().to_string()),
    ];
    if let Some(dir) = &config.tzdb_dir {
        info.push((keys::SOURCE_TZDB, display(dir)));
    }
    if let Some(dir) = &config.gazetteer_dir {
        info.push((keys::SOURCE_GAZETTEER, display(dir)));
    }
    info
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("tzdb_ingest=debug,warn")
    } else {
        EnvFilter::new("tzdb_ingest=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
