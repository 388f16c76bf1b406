//! tzdb-ingest - tz database and gazetteer loader
//!
//! Reads two line-oriented datasets and writes normalized tables to SQLite:
//! the tz rule database (Zone, Rule, Link and Leap lines plus the
//! `iso3166.tab`/`zone.tab` reference files) and a geonames-style gazetteer
//! (one city per tab-separated line). Every city is joined to the surrogate
//! id of its time zone.
//!
//! # Features
//!
//! - **Single-pass tz parser**: one thread walks the tz files in order so
//!   surrogate ids, link resolution and year filtering stay deterministic.
//!
//! - **Parallel gazetteer parser**: N workers pull files from one queue and
//!   tokenize lines into pooled field buffers.
//!
//! - **Explicit barrier**: the name index is published once, after the tz
//!   pass; gazetteer workers block until it arrives.
//!
//! - **SQLite Output**: a dedicated writer thread commits rows in batches.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐            ┌────────────────────────┐
//! │   tz directory     │            │  gazetteer directory   │
//! └─────────┬──────────┘            └───────────┬────────────┘
//!           │ FileValidator::populate           │
//!           ▼                                   ▼
//! ┌────────────────────┐            ┌────────────────────────┐
//! │ ValidatedFileQueue │            │  ValidatedFileQueue    │
//! └─────────┬──────────┘            │  + DynamicPartitioner  │
//!           ▼                       └───────────┬────────────┘
//! ┌────────────────────┐  TzNameIndex           ▼
//! │  TzDatabaseParser  │ ─────────────► ┌────────────────────────┐
//! │  (one thread)      │   (published)  │  GazetteerParser       │
//! └─────────┬──────────┘                │  Worker 1 .. Worker N  │
//!           │ timezones, rules, leaps   └───────────┬────────────┘
//!           │                                       │ cities per file
//!           ▼                                       ▼
//!     ┌──────────────────────────────────────────────────────┐
//!     │          RecordSink (SQLite writer thread)           │
//!     └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! tzdb-ingest --tzdb ./tzdata --gazetteer ./geonames -o world.db
//!
//! sqlite3 world.db "SELECT c.name, t.name FROM cities c JOIN timezones t ON t.id = c.timezone_id LIMIT 5"
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod fs;
pub mod gazetteer;
pub mod pipeline;
pub mod progress;
pub mod queue;
pub mod records;
pub mod report;
pub mod tzdb;

pub use config::{CliArgs, IngestConfig};
pub use error::{IngestError, Result};
pub use pipeline::{IngestCoordinator, IngestResult};
