//! Ingest coordinator - orchestrates the stage graph
//!
//! The coordinator is responsible for:
//! - Checking the configured directories (fail fast when none is usable)
//! - Populating the validated-file queues on a producer thread
//! - Running the tz database parser and publishing the name index
//! - Sinking time zones, rules and leaps concurrently
//! - Running the gazetteer parser once the index is published
//! - Flushing city batches per finished file
//! - Final statistics

use crate::config::IngestConfig;
use crate::db::RecordSink;
use crate::error::{IngestError, Result, WorkerError};
use crate::events::{EventBus, ParseEvent, ParseObserver};
use crate::fs::FileSystem;
use crate::gazetteer::{read_feature_codes, CityBatch, GazetteerOutcome, GazetteerParser};
use crate::pipeline::progress::Progress;
use crate::queue::{FileQueueProducer, FileValidator, PopulateStats, ValidatedFileQueue};
use crate::records::RecordBatch;
use crate::report::{Issue, IssueCounts, IssueKind, IssueReporter, Location};
use crate::tzdb::{pending, IndexPublisher, PendingIndex, TzDatabaseParser, TzNameIndex, TzParseStats};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Result of a completed run
#[derive(Debug, Default)]
pub struct IngestResult {
    /// Time zones written (zones plus resolved links)
    pub time_zones: u64,

    /// Rules written
    pub rules: u64,

    /// Leap lines written
    pub leaps: u64,

    /// Links turned into time zones
    pub links_resolved: u64,

    /// Cities joined and written
    pub cities_loaded: u64,

    /// Cities dropped because their time zone is unknown
    pub cities_dropped: u64,

    /// Feature codes written
    pub feature_codes: u64,

    /// Input files fully parsed
    pub files_processed: u64,

    /// Bytes of accepted input files
    pub input_bytes: u64,

    /// Gazetteer files aborted by a strict column failure or a read error
    pub failed_files: Vec<PathBuf>,

    /// Gazetteer files no worker was left to parse
    pub unprocessed_files: Vec<PathBuf>,

    /// Issues reported during the run
    pub issues: IssueCounts,

    /// Tz parser counters, when a tz directory was ingested
    pub tz_stats: Option<TzParseStats>,

    /// Time taken for the run
    pub duration: Duration,
}

impl IngestResult {
    /// True when every gazetteer file was parsed to the end
    pub fn is_complete(&self) -> bool {
        self.failed_files.is_empty() && self.unprocessed_files.is_empty()
    }
}

/// Flushes the shared city batch to the sink whenever a file finishes
struct CityBatchFlusher {
    batch: Arc<CityBatch>,
    sink: Arc<dyn RecordSink>,
    reporter: Arc<dyn IssueReporter>,
    progress: Arc<Progress>,
}

impl CityBatchFlusher {
    fn flush(&self) -> Result<()> {
        let cities = self.batch.drain();
        if !cities.is_empty() {
            debug!(rows = cities.len(), "Flushing cities");
            upload(self.sink.as_ref(), self.reporter.as_ref(), RecordBatch::Cities(cities))?;
        }
        Ok(())
    }
}

impl ParseObserver for CityBatchFlusher {
    fn on_event(&self, event: &ParseEvent<'_>) -> Result<()> {
        match event {
            ParseEvent::FileStarted { path } => {
                self.progress.set_status(format!("Parsing {}", file_name(path)));
            }
            ParseEvent::FileFinished { path } => {
                self.progress.set_status(format!("Uploading {}", file_name(path)));
                self.flush()?;
                self.progress.advance();
            }
            ParseEvent::DirectoryFinished { .. } => self.flush()?,
            ParseEvent::EntryParsed(_) => {}
        }
        Ok(())
    }
}

/// Advances progress once per parsed file
struct FileProgress {
    progress: Arc<Progress>,
}

impl ParseObserver for FileProgress {
    fn on_event(&self, event: &ParseEvent<'_>) -> Result<()> {
        match event {
            ParseEvent::FileStarted { path } => {
                self.progress.set_status(format!("Parsing {}", file_name(path)));
            }
            ParseEvent::FileFinished { .. } => self.progress.advance(),
            _ => {}
        }
        Ok(())
    }
}

/// Write one batch, reporting a failure before it aborts the run
fn upload(sink: &dyn RecordSink, reporter: &dyn IssueReporter, batch: RecordBatch) -> Result<()> {
    let table = batch.table();
    sink.write(batch).map_err(|e| {
        error!(table = table.as_str(), error = %e, "Upload failed");
        reporter.report(Issue::critical(
            IssueKind::Sink,
            format!("upload to {} failed: {}", table.as_str(), e),
        ));
        IngestError::from(e)
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Output of the tz stage
#[derive(Default)]
struct TzStageOutput {
    stats: Option<TzParseStats>,
}

/// Output of the gazetteer stage
#[derive(Default)]
struct GazetteerStageOutput {
    feature_codes: u64,
    outcome: Option<GazetteerOutcome>,
}

/// Coordinates one ingest run
pub struct IngestCoordinator {
    config: Arc<IngestConfig>,
    fs: Arc<dyn FileSystem>,
    reporter: Arc<dyn IssueReporter>,
    sink: Arc<dyn RecordSink>,
    progress: Arc<Progress>,
}

impl IngestCoordinator {
    pub fn new(
        config: IngestConfig,
        fs: Arc<dyn FileSystem>,
        reporter: Arc<dyn IssueReporter>,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            fs,
            reporter,
            sink,
            progress: Arc::new(Progress::new()),
        }
    }

    /// Use a progress object observed by a UI
    pub fn with_progress(mut self, progress: Arc<Progress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn progress(&self) -> Arc<Progress> {
        Arc::clone(&self.progress)
    }

    /// Run every stage to completion
    pub fn run(&self) -> Result<IngestResult> {
        let start_time = Instant::now();

        self.progress.set_status("Verifying directories");
        let tz_validator = FileValidator::tz(self.config.tz_files.iter().cloned())
            .with_excludes(self.config.exclude_patterns.clone());
        let gazetteer_validator =
            FileValidator::gazetteer().with_excludes(self.config.exclude_patterns.clone());

        let tz_dir = self.usable_directory(self.config.tzdb_dir.as_deref(), &tz_validator);
        let gazetteer_dir =
            self.usable_directory(self.config.gazetteer_dir.as_deref(), &gazetteer_validator);

        if tz_dir.is_none() && gazetteer_dir.is_none() {
            self.reporter.report(Issue::medium(
                IssueKind::FileRejected,
                IngestError::NoValidDirectory.to_string(),
            ));
            return Err(IngestError::NoValidDirectory);
        }

        info!(
            tzdb = ?tz_dir,
            gazetteer = ?gazetteer_dir,
            workers = self.config.worker_count,
            year = self.config.current_year,
            "Starting ingest"
        );

        let tz_queue = tz_dir.as_ref().map(|_| ValidatedFileQueue::new());
        let gazetteer_queue = gazetteer_dir.as_ref().map(|_| ValidatedFileQueue::new());

        // Without a tz directory the join runs against an empty index
        let (publisher, pending_index) = if tz_dir.is_some() {
            let (publisher, pending_index) = pending();
            (Some(publisher), pending_index)
        } else {
            (None, PendingIndex::ready(TzNameIndex::empty()))
        };

        let (tz_queue, tz_producer) = split(tz_queue);
        let (gazetteer_queue, gazetteer_producer) = split(gazetteer_queue);

        let tz_dir = tz_dir.as_deref();
        let gazetteer_dir = gazetteer_dir.as_deref();
        let populate_plan = vec![
            (tz_dir, &tz_validator, tz_producer),
            (gazetteer_dir, &gazetteer_validator, gazetteer_producer),
        ];

        let (populated, tz_output, gazetteer_output) = thread::scope(|s| -> Result<_> {
            let populate = spawn_stage(s, "populate", move || self.populate(populate_plan))?;

            let gazetteer = spawn_stage(s, "gazetteer", move || {
                self.gazetteer_stage(gazetteer_dir, gazetteer_queue, pending_index)
            })?;

            let tz = spawn_stage(s, "tz-parser", move || {
                self.tz_stage(s, tz_dir, tz_queue, publisher)
            })?;

            // Join everything before surfacing the first error
            let populated = join_stage("populate", populate);
            let tz_output = join_stage("tz-parser", tz);
            let gazetteer_output = join_stage("gazetteer", gazetteer);

            Ok((populated?, tz_output?, gazetteer_output?))
        })?;

        let mut result = IngestResult {
            input_bytes: populated.iter().map(|p| p.bytes).sum(),
            tz_stats: tz_output.stats,
            feature_codes: gazetteer_output.feature_codes,
            ..Default::default()
        };

        if let Some(stats) = &result.tz_stats {
            result.time_zones = stats.zones + stats.links_resolved;
            result.rules = stats.rules;
            result.leaps = stats.leaps;
            result.links_resolved = stats.links_resolved;
            result.files_processed += stats.files;
        }

        if let Some(outcome) = gazetteer_output.outcome {
            result.cities_loaded = outcome.counts.loaded;
            result.cities_dropped = outcome.counts.dropped;
            result.files_processed += outcome.counts.files;
            result.failed_files = outcome.failed_files;
            result.unprocessed_files = outcome.unprocessed_files;
        }

        result.issues = self.reporter.counts();
        result.duration = start_time.elapsed();
        self.progress.set_status("Done");

        info!(
            time_zones = result.time_zones,
            rules = result.rules,
            cities = result.cities_loaded,
            dropped = result.cities_dropped,
            issues = result.issues.total(),
            duration_secs = result.duration.as_secs(),
            "Ingest completed"
        );

        Ok(result)
    }

    /// A configured directory that passes validation, or `None`
    fn usable_directory(&self, dir: Option<&Path>, validator: &FileValidator) -> Option<PathBuf> {
        let dir = dir?;
        match validator.validate_directory(self.fs.as_ref(), dir) {
            Ok(()) => Some(dir.to_path_buf()),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Skipping directory");
                self.reporter.report(
                    Issue::medium(IssueKind::FileRejected, e.to_string())
                        .at(Location::file(dir)),
                );
                None
            }
        }
    }

    /// Stage 1: enumerate each directory into its queue, one after the other
    fn populate(
        &self,
        plan: Vec<(Option<&Path>, &FileValidator, Option<FileQueueProducer>)>,
    ) -> Result<Vec<PopulateStats>> {
        self.progress.set_status("Populating files");
        let mut populated = Vec::with_capacity(plan.len());

        for (dir, validator, producer) in plan {
            let (Some(dir), Some(producer)) = (dir, producer) else {
                continue;
            };
            let stats =
                validator.populate(self.fs.as_ref(), dir, producer, self.reporter.as_ref())?;
            self.progress.add_maximum(stats.accepted);
            populated.push(stats);
        }

        Ok(populated)
    }

    /// Stages 2 and 3: parse the tz directory, publish the index, sink tables
    fn tz_stage<'scope, 'env>(
        &self,
        scope: &'scope Scope<'scope, 'env>,
        dir: Option<&Path>,
        files: Option<ValidatedFileQueue>,
        publisher: Option<IndexPublisher>,
    ) -> Result<TzStageOutput> {
        let (Some(dir), Some(files), Some(publisher)) = (dir, files, publisher) else {
            return Ok(TzStageOutput::default());
        };

        let mut events = EventBus::new();
        events.register(Arc::new(FileProgress {
            progress: Arc::clone(&self.progress),
        }));

        let parser = TzDatabaseParser::new(
            Arc::clone(&self.fs),
            Arc::clone(&self.reporter),
            events,
            self.config.current_year,
        );

        // Dropping the publisher on error wakes the gazetteer stage
        let output = parser.parse(dir, files)?;
        publisher.publish(output.index);

        self.progress.set_status("Uploading time zones and rules");
        let sinks = [
            ("sink-timezones", RecordBatch::TimeZones(output.time_zones)),
            ("sink-rules", RecordBatch::Rules(output.rules)),
            ("sink-leaps", RecordBatch::Leaps(output.leaps)),
        ]
        .into_iter()
        .map(|(stage, batch)| {
            let sink = Arc::clone(&self.sink);
            let reporter = Arc::clone(&self.reporter);
            spawn_stage(scope, stage, move || {
                upload(sink.as_ref(), reporter.as_ref(), batch)
            })
            .map(|h| (stage, h))
        })
        .collect::<Result<Vec<_>>>()?;

        for (stage, handle) in sinks {
            join_stage(stage, handle)?;
        }

        Ok(TzStageOutput {
            stats: Some(output.stats),
        })
    }

    /// Stage 4: feature codes, then cities once the index is ready
    fn gazetteer_stage(
        &self,
        dir: Option<&Path>,
        files: Option<ValidatedFileQueue>,
        index: PendingIndex,
    ) -> Result<GazetteerStageOutput> {
        let mut output = GazetteerStageOutput::default();

        if let Some(path) = &self.config.feature_codes_path {
            self.progress.add_maximum(1);
            self.progress.set_status("Parsing feature codes");
            let codes = read_feature_codes(
                self.fs.as_ref(),
                path,
                self.reporter.as_ref(),
                &EventBus::new(),
            )?;
            output.feature_codes = codes.len() as u64;
            upload(
                self.sink.as_ref(),
                self.reporter.as_ref(),
                RecordBatch::FeatureCodes(codes),
            )?;
            self.progress.advance();
        }

        let (Some(dir), Some(files)) = (dir, files) else {
            return Ok(output);
        };

        let batch = Arc::new(CityBatch::new());
        let mut events = EventBus::new();
        events.register(Arc::new(CityBatchFlusher {
            batch: Arc::clone(&batch),
            sink: Arc::clone(&self.sink),
            reporter: Arc::clone(&self.reporter),
            progress: Arc::clone(&self.progress),
        }));

        let parser = GazetteerParser::new(
            Arc::clone(&self.fs),
            Arc::clone(&self.reporter),
            events,
            self.config.worker_count,
        )
        .with_batch(batch);

        self.progress.set_status("Waiting for the time zone index");
        output.outcome = Some(parser.parse(dir, files, index)?);
        Ok(output)
    }
}

fn split(
    queue: Option<(ValidatedFileQueue, FileQueueProducer)>,
) -> (Option<ValidatedFileQueue>, Option<FileQueueProducer>) {
    match queue {
        Some((queue, producer)) => (Some(queue), Some(producer)),
        None => (None, None),
    }
}

/// Spawn a named scoped thread for one stage
fn spawn_stage<'scope, 'env, T, F>(
    scope: &'scope Scope<'scope, 'env>,
    stage: &'static str,
    f: F,
) -> Result<ScopedJoinHandle<'scope, Result<T>>>
where
    T: Send + 'scope,
    F: FnOnce() -> Result<T> + Send + 'scope,
{
    thread::Builder::new()
        .name(stage.into())
        .spawn_scoped(scope, f)
        .map_err(|e| {
            IngestError::Worker(WorkerError::SpawnFailed {
                name: stage.to_string(),
                reason: e.to_string(),
            })
        })
}

fn join_stage<T>(stage: &'static str, handle: ScopedJoinHandle<'_, Result<T>>) -> Result<T> {
    handle
        .join()
        .map_err(|_| IngestError::Worker(WorkerError::StagePanicked { stage }))?
}
