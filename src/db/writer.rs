//! Batched SQLite sink
//!
//! A dedicated `db-writer` thread owns the connection and receives record
//! batches over a bounded channel. Rows are buffered per table and committed
//! in transactions of `batch_size` rows with cached prepared statements.

use crate::db::schema::{self, format_duration, keys};
use crate::db::sink::RecordSink;
use crate::error::{SinkError, SinkResult};
use crate::records::{
    CityRecord, FeatureCodeRecord, LeapRecord, RecordBatch, RuleRecord, TimeZoneRecord,
};
use crossbeam_channel::{bounded, Receiver, Sender};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

/// Message types sent to the writer thread
#[derive(Debug)]
pub enum WriterMessage {
    /// Buffer a batch of rows
    Batch(RecordBatch),

    /// Commit everything buffered
    Flush,

    /// Commit and stop
    Shutdown,
}

/// Statistics about write operations
#[derive(Debug, Default)]
pub struct WriterStats {
    /// Total rows written
    pub rows_written: AtomicU64,

    /// Total transactions committed
    pub transactions_committed: AtomicU64,

    /// Total batches received from the pipeline
    pub batches_received: AtomicU64,
}

impl WriterStats {
    pub fn rows_written(&self) -> u64 {
        self.rows_written.load(Ordering::Relaxed)
    }

    pub fn transactions_committed(&self) -> u64 {
        self.transactions_committed.load(Ordering::Relaxed)
    }

    pub fn batches_received(&self) -> u64 {
        self.batches_received.load(Ordering::Relaxed)
    }
}

/// Cloneable handle feeding the writer thread
#[derive(Clone)]
pub struct SinkHandle {
    sender: Sender<WriterMessage>,
    stats: Arc<WriterStats>,
}

impl SinkHandle {
    /// Request a commit of everything buffered
    pub fn flush(&self) -> SinkResult<()> {
        self.sender
            .send(WriterMessage::Flush)
            .map_err(|_| SinkError::ChannelClosed)
    }

    fn shutdown(&self) -> SinkResult<()> {
        self.sender
            .send(WriterMessage::Shutdown)
            .map_err(|_| SinkError::ChannelClosed)
    }

    pub fn stats(&self) -> &WriterStats {
        &self.stats
    }
}

impl RecordSink for SinkHandle {
    fn write(&self, batch: RecordBatch) -> SinkResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.stats.batches_received.fetch_add(1, Ordering::Relaxed);
        self.sender
            .send(WriterMessage::Batch(batch))
            .map_err(|_| SinkError::ChannelClosed)
    }
}

/// SQLite sink backed by its own writer thread
pub struct SqliteSink {
    handle: Option<JoinHandle<SinkResult<()>>>,
    sink_handle: SinkHandle,
    db_path: PathBuf,
}

impl SqliteSink {
    /// Open (and reset) the database and spawn the writer thread
    pub fn new(db_path: &Path, batch_size: usize, channel_size: usize) -> SinkResult<Self> {
        let (sender, receiver) = bounded(channel_size);
        let stats = Arc::new(WriterStats::default());

        let conn = Connection::open(db_path).map_err(|e| SinkError::CreateFailed {
            path: db_path.to_path_buf(),
            reason: e.to_string(),
        })?;
        schema::create_database(&conn)?;

        schema::set_ingest_info(&conn, keys::SCHEMA_VERSION, &schema::SCHEMA_VERSION.to_string())?;
        schema::set_ingest_info(&conn, keys::TOOL_VERSION, env!("CARGO_PKG_VERSION"))?;
        schema::set_ingest_info(&conn, keys::STATUS, "running")?;

        let thread_stats = Arc::clone(&stats);
        let handle = thread::Builder::new()
            .name("db-writer".into())
            .spawn(move || writer_thread(conn, receiver, thread_stats, batch_size))
            .map_err(|e| SinkError::CreateFailed {
                path: db_path.to_path_buf(),
                reason: format!("Failed to spawn writer thread: {}", e),
            })?;

        debug!(path = %db_path.display(), batch_size, "SQLite sink opened");

        Ok(Self {
            handle: Some(handle),
            sink_handle: SinkHandle { sender, stats },
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn handle(&self) -> SinkHandle {
        self.sink_handle.clone()
    }

    pub fn stats(&self) -> &WriterStats {
        self.sink_handle.stats()
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Drain the writer, then create indexes and record run metadata
    pub fn finish(mut self, info: &[(&str, String)]) -> SinkResult<u64> {
        let _ = self.sink_handle.shutdown();

        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(result) => result?,
                Err(_) => return Err(SinkError::Transaction("Writer thread panicked".into())),
            }
        }

        let conn = Connection::open(&self.db_path)?;
        schema::create_indexes(&conn)?;
        for (key, value) in info {
            schema::set_ingest_info(&conn, key, value)?;
        }
        schema::set_ingest_info(&conn, keys::STATUS, "completed")?;
        schema::optimize_for_reads(&conn)?;

        let rows = self.sink_handle.stats().rows_written();
        info!(path = %self.db_path.display(), rows, "Database finalized");
        Ok(rows)
    }
}

impl RecordSink for SqliteSink {
    fn write(&self, batch: RecordBatch) -> SinkResult<()> {
        self.sink_handle.write(batch)
    }
}

/// Rows waiting for the next commit, one buffer per table
#[derive(Default)]
struct PendingRows {
    time_zones: Vec<TimeZoneRecord>,
    rules: Vec<RuleRecord>,
    leaps: Vec<LeapRecord>,
    cities: Vec<CityRecord>,
    feature_codes: Vec<FeatureCodeRecord>,
}

impl PendingRows {
    fn push(&mut self, batch: RecordBatch) {
        match batch {
            RecordBatch::TimeZones(rows) => self.time_zones.extend(rows),
            RecordBatch::Rules(rows) => self.rules.extend(rows),
            RecordBatch::Leaps(rows) => self.leaps.extend(rows),
            RecordBatch::Cities(rows) => self.cities.extend(rows),
            RecordBatch::FeatureCodes(rows) => self.feature_codes.extend(rows),
        }
    }

    fn len(&self) -> usize {
        self.time_zones.len()
            + self.rules.len()
            + self.leaps.len()
            + self.cities.len()
            + self.feature_codes.len()
    }
}

fn writer_thread(
    conn: Connection,
    receiver: Receiver<WriterMessage>,
    stats: Arc<WriterStats>,
    batch_size: usize,
) -> SinkResult<()> {
    let mut pending = PendingRows::default();

    // A closed channel is treated like Shutdown
    for msg in receiver.iter() {
        match msg {
            WriterMessage::Batch(batch) => {
                pending.push(batch);
                if pending.len() >= batch_size {
                    commit(&conn, &mut pending, &stats)?;
                }
            }
            WriterMessage::Flush => commit(&conn, &mut pending, &stats)?,
            WriterMessage::Shutdown => break,
        }
    }

    commit(&conn, &mut pending, &stats)
}

/// Write every buffered row in one transaction
fn commit(conn: &Connection, pending: &mut PendingRows, stats: &WriterStats) -> SinkResult<()> {
    let rows = pending.len();
    if rows == 0 {
        return Ok(());
    }

    let tx = conn.unchecked_transaction()?;
    insert_time_zones(&tx, &mut pending.time_zones)?;
    insert_rules(&tx, &mut pending.rules)?;
    insert_leaps(&tx, &mut pending.leaps)?;
    insert_cities(&tx, &mut pending.cities)?;
    insert_feature_codes(&tx, &mut pending.feature_codes)?;
    tx.commit()?;

    stats.rows_written.fetch_add(rows as u64, Ordering::Relaxed);
    stats.transactions_committed.fetch_add(1, Ordering::Relaxed);
    debug!(rows, "Committed transaction");
    Ok(())
}

fn insert_time_zones(conn: &Connection, rows: &mut Vec<TimeZoneRecord>) -> SinkResult<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO timezones (id, name, bias, rule_name, abbreviation_format, country_code, country_name, comments, coordinates)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;
    for tz in rows.drain(..) {
        stmt.execute(params![
            tz.id,
            tz.name,
            tz.bias,
            tz.rule_name,
            tz.format,
            tz.country_code,
            tz.country_name,
            tz.comment,
            tz.coordinates,
        ])?;
    }
    Ok(())
}

fn insert_rules(conn: &Connection, rows: &mut Vec<RuleRecord>) -> SinkResult<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO rules (name, bias, start_year, end_year, month, date, time, time_type, letter)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;
    for rule in rows.drain(..) {
        stmt.execute(params![
            rule.name,
            rule.bias,
            rule.start_year,
            rule.end_year,
            rule.month,
            rule.day,
            format_duration(rule.at),
            rule.at_type.to_string(),
            rule.letter,
        ])?;
    }
    Ok(())
}

fn insert_leaps(conn: &Connection, rows: &mut Vec<LeapRecord>) -> SinkResult<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO leaps (year, month, day, time, correction, rs)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for leap in rows.drain(..) {
        stmt.execute(params![
            leap.year,
            leap.month,
            leap.day,
            format_duration(leap.time),
            leap.correction.map(String::from),
            leap.rs.map(String::from),
        ])?;
    }
    Ok(())
}

fn insert_cities(conn: &Connection, rows: &mut Vec<CityRecord>) -> SinkResult<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO cities (geoname_id, name, ascii_name, alternate_names, latitude, longitude,
                             feature_class, feature_code, country_code, country_code2,
                             admin1_code, admin2_code, admin3_code, admin4_code,
                             population, elevation, gtopo30, timezone_id, timezone_name, modification_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
    )?;
    for city in rows.drain(..) {
        stmt.execute(params![
            city.geoname_id,
            city.name,
            city.ascii_name,
            city.alternate_names,
            city.latitude,
            city.longitude,
            city.feature_class.map(String::from),
            city.feature_code,
            city.country_code,
            city.country_code2,
            city.admin1_code,
            city.admin2_code,
            city.admin3_code,
            city.admin4_code,
            city.population,
            city.elevation,
            city.gtopo30,
            city.timezone_id,
            city.timezone_name,
            city.modification_date.format("%Y-%m-%d").to_string(),
        ])?;
    }
    Ok(())
}

fn insert_feature_codes(conn: &Connection, rows: &mut Vec<FeatureCodeRecord>) -> SinkResult<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO feature_codes (code, name, description) VALUES (?1, ?2, ?3)",
    )?;
    for code in rows.drain(..) {
        stmt.execute(params![code.code, code.name, code.description])?;
    }
    Ok(())
}
