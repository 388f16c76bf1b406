//! Record sinks: the SQLite writer thread and an in-memory collector
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │        IngestCoordinator (stage threads)            │
//! │  - Hands RecordBatch values to a RecordSink         │
//! └─────────────────────┬───────────────────────────────┘
//!                       │ WriterMessage
//!                       ▼
//! ┌─────────────────────────────────────────────────────┐
//! │              db-writer thread                       │
//! │  - Buffers rows per table                           │
//! │  - Commits every `batch_size` rows                  │
//! └─────────────────────┬───────────────────────────────┘
//!                       │
//!                       ▼
//! ┌─────────────────────────────────────────────────────┐
//! │   SQLite file: timezones, rules, leaps, cities,     │
//! │   feature_codes, ingest_info                        │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod schema;
pub mod sink;
pub mod writer;

pub use schema::{create_database, create_indexes, keys, optimize_for_reads};
pub use sink::{MemorySink, RecordSink};
pub use writer::{SinkHandle, SqliteSink, WriterMessage, WriterStats};
