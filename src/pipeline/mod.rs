//! Stage graph for one ingest run
//!
//! ```text
//!  populate ──► tz queue ──► TzDatabaseParser ──► publish TzNameIndex
//!     │                           │                       │
//!     │                           ▼                       │ (barrier)
//!     │                  sink timezones/rules/leaps       ▼
//!     └────────► gazetteer queue ──────────────► GazetteerParser (N workers)
//!                                                         │
//!                                                flush cities per file
//! ```

pub mod coordinator;
pub mod progress;

pub use coordinator::{IngestCoordinator, IngestResult};
pub use progress::{Progress, ProgressListener, ProgressSnapshot};
