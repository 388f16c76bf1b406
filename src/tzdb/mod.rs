//! Time zone database parsing
//!
//! - `fields`: pure parsers for years, months, times and offsets
//! - `tab`: the `iso3166.tab` / `zone.tab` reference files
//! - `index`: the name index and its publish/wait handoff
//! - `parser`: the sequential [`TzDatabaseParser`]

pub mod fields;
pub mod index;
pub mod parser;
pub mod tab;

pub use index::{pending, IndexPublisher, PendingIndex, TzIndexBuilder, TzNameIndex};
pub use parser::{TzDatabaseParser, TzParseOutput, TzParseStats};
pub use tab::{ReferenceIndex, ZoneInfo};
