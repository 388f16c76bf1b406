//! Concurrency infrastructure shared by both parsers
//!
//! # Architecture
//!
//! ```text
//!  directory ──► FileValidator::populate ──► FileQueueProducer
//!                                                 │ (drop = complete)
//!                                                 ▼
//!                                        ValidatedFileQueue
//!                                           │            │
//!                         exclusive consumer│            │DynamicPartitioner
//!                                           ▼            ▼
//!                                   TzDatabaseParser   Partition × N ──► GazetteerParser workers
//!                                                                              │
//!                                                                    BufferPool (pop/push)
//! ```

pub mod file_queue;
pub mod partitioner;
pub mod pool;
pub mod validator;

pub use file_queue::{FileKind, FileQueueProducer, QueueStats, ValidatedFile, ValidatedFileQueue};
pub use partitioner::{DynamicPartitioner, Partition};
pub use pool::{BufferPool, FieldBuffer, PoolStats};
pub use validator::{FileValidator, PopulateStats, DEFAULT_TZ_FILES, ISO3166_TAB, ZONE_TAB};
