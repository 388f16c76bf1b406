//! Parallel gazetteer parser
//!
//! N workers pull files from a [`DynamicPartitioner`] until the queue is
//! exhausted; every file is read by exactly one worker. Per line a worker:
//! - borrows a field buffer from the [`BufferPool`]
//! - tokenizes the line into it and parses the columns
//! - returns the buffer
//! - joins the time zone name against the [`TzNameIndex`]
//! - appends the joined record to the shared [`CityBatch`]
//!
//! A strict column failure or a read error ends the file and the worker that
//! owns it. The file still raises its finished event.
//! The other workers keep draining the queue.

use super::fields::{parse_city, CITY_FIELDS};
use crate::error::{GazetteerError, IngestError, Result, WorkerError};
use crate::events::{EntryRef, EventBus};
use crate::fs::FileSystem;
use crate::queue::{BufferPool, DynamicPartitioner, Partition, ValidatedFile, ValidatedFileQueue};
use crate::records::CityRecord;
use crate::report::{Issue, IssueKind, IssueReporter, Location};
use crate::tzdb::{PendingIndex, TzNameIndex};
use parking_lot::Mutex;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Mutex-guarded output shared by all workers
#[derive(Debug, Default)]
pub struct CityBatch {
    records: Mutex<Vec<CityRecord>>,
}

impl CityBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: CityRecord) {
        self.records.lock().push(record);
    }

    /// Take everything accumulated so far
    pub fn drain(&self) -> Vec<CityRecord> {
        std::mem::take(&mut *self.records.lock())
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

/// Counters shared by all workers
#[derive(Debug, Default)]
pub struct GazetteerStats {
    /// Files fully parsed
    pub files: AtomicU64,

    /// Non-blank lines processed
    pub entries: AtomicU64,

    /// Records joined and added to the batch
    pub loaded: AtomicU64,

    /// Records dropped because their time zone is not indexed
    pub dropped: AtomicU64,

    /// Files aborted by a strict column failure
    pub aborted: AtomicU64,

    /// Bytes of fully parsed files
    pub bytes: AtomicU64,
}

impl GazetteerStats {
    fn record_file(&self, bytes: u64) {
        self.files.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    fn record_entry(&self) {
        self.entries.fetch_add(1, Ordering::Relaxed);
    }

    fn record_loaded(&self) {
        self.loaded.fetch_add(1, Ordering::Relaxed);
    }

    fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    fn record_aborted(&self) {
        self.aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> GazetteerCounts {
        GazetteerCounts {
            files: self.files.load(Ordering::Relaxed),
            entries: self.entries.load(Ordering::Relaxed),
            loaded: self.loaded.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`GazetteerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GazetteerCounts {
    pub files: u64,
    pub entries: u64,
    pub loaded: u64,
    pub dropped: u64,
    pub aborted: u64,
    pub bytes: u64,
}

/// Result of a gazetteer run
#[derive(Debug, Default)]
pub struct GazetteerOutcome {
    pub counts: GazetteerCounts,
    /// Files aborted by a strict column failure or a read error
    pub failed_files: Vec<PathBuf>,
    /// Files still queued when every worker had stopped
    pub unprocessed_files: Vec<PathBuf>,
}

/// State shared by every worker
struct Shared {
    fs: Arc<dyn FileSystem>,
    reporter: Arc<dyn IssueReporter>,
    events: EventBus,
    index: TzNameIndex,
    pool: Arc<BufferPool>,
    batch: Arc<CityBatch>,
    stats: Arc<GazetteerStats>,
}

/// A gazetteer worker thread
struct Worker {
    id: usize,
    handle: Option<JoinHandle<Result<()>>>,
}

impl Worker {
    fn spawn(
        id: usize,
        partition: Partition,
        shared: Arc<Shared>,
    ) -> std::result::Result<Self, WorkerError> {
        let handle = thread::Builder::new()
            .name(format!("gazetteer-{}", id))
            .spawn(move || worker_loop(id, partition, &shared))
            .map_err(|e| WorkerError::SpawnFailed {
                name: format!("gazetteer-{}", id),
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
        })
    }

    fn join(mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => match handle.join() {
                Ok(result) => result,
                Err(_) => Err(WorkerError::Panicked {
                    id: self.id,
                    message: "Worker thread panicked".into(),
                }
                .into()),
            },
            None => Ok(()),
        }
    }
}

fn worker_loop(id: usize, partition: Partition, shared: &Shared) -> Result<()> {
    debug!(worker = id, "Gazetteer worker started");

    let mut taken = 0u64;
    for file in partition {
        taken += 1;
        if let Err(e) = parse_file(&file, shared) {
            if matches!(e, IngestError::Gazetteer(_)) {
                // Aborted files still finish, so their rows are flushed now
                shared.events.file_finished(file.path())?;
            }
            return Err(e);
        }
    }

    debug!(worker = id, files = taken, "Gazetteer worker finished");
    Ok(())
}

fn parse_file(file: &ValidatedFile, shared: &Shared) -> Result<()> {
    let path = file.path();
    let read_failed = |e: std::io::Error| GazetteerError::ReadFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    shared.events.file_started(path)?;
    let reader = shared.fs.open(path).map_err(read_failed)?;

    for (number, line) in (1u64..).zip(reader.lines()) {
        let line = line.map_err(read_failed)?;
        if line.trim().is_empty() {
            continue;
        }
        let location = || Location::line(path, number);

        let mut buffer = shared.pool.pop_or_backoff();
        buffer.fill(&line);
        let parsed = parse_city(&buffer, shared.reporter.as_ref(), location);
        shared.pool.push(buffer);

        let mut city = parsed.map_err(|source| GazetteerError::Field {
            path: path.to_path_buf(),
            line: number,
            source,
        })?;

        city.timezone_id = city
            .timezone_name
            .as_deref()
            .and_then(|name| shared.index.id_of(name));

        shared.events.entry_parsed(EntryRef::City(&city))?;
        shared.stats.record_entry();

        if city.timezone_id.is_some() {
            shared.batch.push(city);
            shared.stats.record_loaded();
        } else {
            shared.stats.record_dropped();
            shared.reporter.report(
                Issue::low(
                    IssueKind::UnresolvedTimeZone,
                    format!(
                        "time zone '{}' is not indexed",
                        city.timezone_name.as_deref().unwrap_or_default()
                    ),
                )
                .at(location()),
            );
        }
    }

    shared.stats.record_file(file.size);
    shared.events.file_finished(path)?;
    Ok(())
}

/// Parallel parser for a gazetteer directory
pub struct GazetteerParser {
    fs: Arc<dyn FileSystem>,
    reporter: Arc<dyn IssueReporter>,
    events: EventBus,
    workers: usize,
    pool: Arc<BufferPool>,
    batch: Arc<CityBatch>,
    stats: Arc<GazetteerStats>,
}

impl GazetteerParser {
    /// Create a parser with `workers` threads and one pooled buffer each
    pub fn new(
        fs: Arc<dyn FileSystem>,
        reporter: Arc<dyn IssueReporter>,
        events: EventBus,
        workers: usize,
    ) -> Self {
        let workers = workers.max(1);
        Self {
            fs,
            reporter,
            events,
            workers,
            pool: Arc::new(BufferPool::with_capacity(workers, CITY_FIELDS)),
            batch: Arc::new(CityBatch::new()),
            stats: Arc::new(GazetteerStats::default()),
        }
    }

    /// Use an existing batch, typically one shared with a flushing observer
    pub fn with_batch(mut self, batch: Arc<CityBatch>) -> Self {
        self.batch = batch;
        self
    }

    pub fn batch(&self) -> Arc<CityBatch> {
        Arc::clone(&self.batch)
    }

    pub fn stats(&self) -> Arc<GazetteerStats> {
        Arc::clone(&self.stats)
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Parse the files arriving on `files` once `index` is published.
    ///
    /// Strict column failures and unreadable files are reported and listed
    /// in the outcome; observer failures and worker panics abort the run.
    pub fn parse(
        &self,
        dir: &Path,
        files: ValidatedFileQueue,
        index: PendingIndex,
    ) -> Result<GazetteerOutcome> {
        let index = index.wait().ok_or(IngestError::IndexUnavailable)?;
        debug!(zones = index.len(), "Name index available");

        let shared = Arc::new(Shared {
            fs: Arc::clone(&self.fs),
            reporter: Arc::clone(&self.reporter),
            events: self.events.clone(),
            index,
            pool: Arc::clone(&self.pool),
            batch: Arc::clone(&self.batch),
            stats: Arc::clone(&self.stats),
        });

        let partitioner = DynamicPartitioner::new(files);
        let mut workers = Vec::with_capacity(self.workers);
        for (id, partition) in partitioner.partitions(self.workers).into_iter().enumerate() {
            workers.push(Worker::spawn(id, partition, Arc::clone(&shared))?);
        }
        info!(workers = workers.len(), dir = %dir.display(), "Gazetteer workers started");

        let mut outcome = GazetteerOutcome::default();
        let mut fatal: Option<IngestError> = None;

        for worker in workers {
            let id = worker.id;
            match worker.join() {
                Ok(()) => {}
                Err(IngestError::Gazetteer(err)) => {
                    let (path, location, reason) = match err {
                        GazetteerError::Field { path, line, source } => {
                            let location = Location::line(&path, line);
                            (path, location, source.to_string())
                        }
                        GazetteerError::ReadFailed { path, reason } => {
                            let location = Location::file(&path);
                            (path, location, reason)
                        }
                    };
                    self.stats.record_aborted();
                    warn!(worker = id, file = %path.display(), %reason, "Gazetteer file aborted");
                    self.reporter.report(
                        Issue::medium(
                            IssueKind::FileAborted,
                            format!("{}; file aborted and worker {} stopped", reason, id),
                        )
                        .at(location),
                    );
                    outcome.failed_files.push(path);
                }
                Err(e) => {
                    if fatal.is_none() {
                        fatal = Some(e);
                    }
                }
            }
        }

        if let Some(e) = fatal {
            return Err(e);
        }

        // Only reachable when every worker stopped early
        for file in partitioner.partition(self.workers) {
            self.reporter.report(
                Issue::medium(IssueKind::FileAborted, "no worker left to parse file")
                    .at(Location::file(&file.path)),
            );
            outcome.unprocessed_files.push(file.path);
        }

        self.events.directory_finished(dir)?;

        outcome.counts = self.stats.snapshot();
        info!(
            files = outcome.counts.files,
            loaded = outcome.counts.loaded,
            dropped = outcome.counts.dropped,
            aborted = outcome.counts.aborted,
            "Gazetteer parsed"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventCounter;
    use crate::fs::MemoryFs;
    use crate::queue::FileValidator;
    use crate::records::TimeZoneRecord;
    use crate::report::CollectingReporter;
    use crate::tzdb::TzIndexBuilder;
    use std::fs;

    fn city(id: u32, name: &str, tz: &str) -> String {
        format!(
            "{}\t{}\t{}\t\t10.0\t20.0\tP\tPPL\tFR\t\t11\t\t\t\t1000\t\t5\t{}\t2020-01-01\n",
            id, name, name, tz
        )
    }

    fn index() -> TzNameIndex {
        let mut builder = TzIndexBuilder::new();
        builder.insert(TimeZoneRecord {
            id: 7,
            name: "Europe/Paris".into(),
            bias: 3600,
            rule_name: Some("EU".into()),
            format: "CE%sT".into(),
            country_code: "FR".into(),
            country_name: "France".into(),
            comment: None,
            coordinates: None,
        });
        builder.freeze()
    }

    fn run(
        fs: MemoryFs,
        workers: usize,
    ) -> (
        Result<GazetteerOutcome>,
        Arc<CityBatch>,
        Arc<EventCounter>,
        Arc<CollectingReporter>,
    ) {
        let fs: Arc<dyn FileSystem> = Arc::new(fs);
        let reporter = Arc::new(CollectingReporter::new());
        let counter = Arc::new(EventCounter::default());
        let mut bus = EventBus::new();
        bus.register(counter.clone());

        let (queue, producer) = ValidatedFileQueue::new();
        FileValidator::gazetteer()
            .populate(fs.as_ref(), Path::new("/geo"), producer, reporter.as_ref())
            .unwrap();

        let parser = GazetteerParser::new(fs, reporter.clone(), bus, workers);
        let batch = parser.batch();
        let outcome = parser.parse(Path::new("/geo"), queue, PendingIndex::ready(index()));
        (outcome, batch, counter, reporter)
    }

    #[test]
    fn test_entry_events_and_join() {
        let content = format!(
            "{}{}\n{}",
            city(1, "Paris", "Europe/Paris"),
            city(2, "Lyon", "Europe/Paris"),
            city(3, "Nowhere", "Mars/Olympus")
        );
        let fs = MemoryFs::new().with_file("/geo/FR.txt", content);

        let (outcome, batch, counter, reporter) = run(fs, 2);
        let outcome = outcome.unwrap();

        // Three non-blank lines, three entry events
        assert_eq!(counter.entries(), 3);
        assert_eq!(outcome.counts.entries, 3);
        assert_eq!(outcome.counts.loaded, 2);
        assert_eq!(outcome.counts.dropped, 1);
        assert_eq!(reporter.count(IssueKind::UnresolvedTimeZone), 1);

        let cities = batch.drain();
        assert_eq!(cities.len(), 2);
        assert!(cities.iter().all(|c| c.timezone_id == Some(7)));
        assert_eq!(cities[0].name.as_deref(), Some("Paris"));
    }

    #[test]
    fn test_many_files_each_parsed_once() {
        let mut fs = MemoryFs::new();
        for f in 0..20 {
            let mut content = String::new();
            for i in 0..10 {
                content.push_str(&city(f * 100 + i, "Town", "Europe/Paris"));
            }
            fs = fs.with_file(format!("/geo/part{:02}.txt", f), content);
        }

        let (outcome, batch, counter, _) = run(fs, 4);
        let outcome = outcome.unwrap();

        assert_eq!(outcome.counts.files, 20);
        assert_eq!(counter.files_finished(), 20);
        assert_eq!(batch.len(), 200);
        assert!(outcome.failed_files.is_empty());
    }

    #[test]
    fn test_strict_failure_aborts_file_not_run() {
        let good = city(1, "Paris", "Europe/Paris");
        let bad = format!(
            "{}{}",
            city(2, "Lyon", "Europe/Paris"),
            "3\tBad\tBad\t\t10.0\t20.0\tP\tPPL\tFR\t\t11\t\t\t\tmany\t\t5\tEurope/Paris\t2020-01-01\n"
        );
        let fs = MemoryFs::new()
            .with_file("/geo/a.txt", good)
            .with_file("/geo/b.txt", bad);

        let (outcome, batch, _, reporter) = run(fs, 2);
        let outcome = outcome.unwrap();

        assert_eq!(outcome.failed_files, vec![PathBuf::from("/geo/b.txt")]);
        assert_eq!(outcome.counts.aborted, 1);
        assert_eq!(reporter.count(IssueKind::FileAborted), 1);
        // Lines before the failure were kept
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_single_worker_abort_leaves_files_unprocessed() {
        let bad = "1\tBad\tBad\t\tnorth\t20.0\tP\tPPL\tFR\t\t11\t\t\t\t1\t\t5\tEurope/Paris\t2020-01-01\n";
        let fs = MemoryFs::new()
            .with_file("/geo/a.txt", bad)
            .with_file("/geo/b.txt", city(2, "Lyon", "Europe/Paris"));

        let (outcome, _, _, _) = run(fs, 1);
        let outcome = outcome.unwrap();

        assert_eq!(outcome.failed_files, vec![PathBuf::from("/geo/a.txt")]);
        assert_eq!(outcome.unprocessed_files, vec![PathBuf::from("/geo/b.txt")]);
    }

    #[test]
    fn test_aborted_file_raises_finished_event() {
        let bad = "1\tBad\tBad\t\tnorth\t20.0\tP\tPPL\tFR\t\t11\t\t\t\t1\t\t5\tEurope/Paris\t2020-01-01\n";
        let fs = MemoryFs::new()
            .with_file("/geo/a.txt", city(1, "Paris", "Europe/Paris"))
            .with_file("/geo/b.txt", bad);

        let (outcome, _, counter, _) = run(fs, 2);
        let outcome = outcome.unwrap();

        assert_eq!(outcome.failed_files, vec![PathBuf::from("/geo/b.txt")]);
        // Only a.txt was fully parsed, but both files finished
        assert_eq!(outcome.counts.files, 1);
        assert_eq!(counter.files_finished(), 2);
    }

    #[test]
    fn test_unreadable_line_aborts_file_not_run() {
        use crate::fs::LocalFs;
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("A.txt"), city(1, "Paris", "Europe/Paris")).unwrap();
        let mut bad = fs::File::create(dir.path().join("B.txt")).unwrap();
        bad.write_all(city(2, "Lyon", "Europe/Paris").as_bytes()).unwrap();
        bad.write_all(b"3\tBad\xff\xfe\tBad\n").unwrap();
        drop(bad);

        let local: Arc<dyn FileSystem> = Arc::new(LocalFs);
        let reporter = Arc::new(CollectingReporter::new());
        let (queue, producer) = ValidatedFileQueue::new();
        let stats = FileValidator::gazetteer()
            .populate(local.as_ref(), dir.path(), producer, reporter.as_ref())
            .unwrap();
        assert_eq!(stats.accepted, 2);

        let parser = GazetteerParser::new(local, reporter.clone(), EventBus::new(), 2);
        let batch = parser.batch();
        let outcome = parser
            .parse(dir.path(), queue, PendingIndex::ready(index()))
            .unwrap();

        assert_eq!(outcome.failed_files, vec![dir.path().join("B.txt")]);
        assert_eq!(outcome.counts.aborted, 1);
        assert_eq!(reporter.count(IssueKind::FileAborted), 1);
        // A.txt in full, plus the line of B.txt read before the bad bytes
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_unpublished_index_fails() {
        let fs: Arc<dyn FileSystem> =
            Arc::new(MemoryFs::new().with_file("/geo/FR.txt", city(1, "Paris", "Europe/Paris")));
        let reporter = Arc::new(CollectingReporter::new());
        let (queue, producer) = ValidatedFileQueue::new();
        drop(producer);

        let (publisher, pending) = crate::tzdb::index::pending();
        drop(publisher);

        let parser = GazetteerParser::new(fs, reporter, EventBus::new(), 2);
        assert!(matches!(
            parser.parse(Path::new("/geo"), queue, pending),
            Err(IngestError::IndexUnavailable)
        ));
    }

    #[test]
    fn test_pool_is_reused() {
        let mut content = String::new();
        for i in 0..50 {
            content.push_str(&city(i, "Town", "Europe/Paris"));
        }
        let fs: Arc<dyn FileSystem> = Arc::new(MemoryFs::new().with_file("/geo/FR.txt", content));
        let reporter = Arc::new(CollectingReporter::new());
        let (queue, producer) = ValidatedFileQueue::new();
        FileValidator::gazetteer()
            .populate(fs.as_ref(), Path::new("/geo"), producer, reporter.as_ref())
            .unwrap();

        let parser = GazetteerParser::new(fs, reporter, EventBus::new(), 1);
        parser
            .parse(Path::new("/geo"), queue, PendingIndex::ready(index()))
            .unwrap();

        assert_eq!(parser.pool().available(), 1);
        assert_eq!(parser.pool().stats().reused(), 50);
        assert_eq!(parser.pool().stats().allocated(), 0);
    }
}
