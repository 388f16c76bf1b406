//! Gazetteer feature-code reference file (`code<TAB>name<TAB>description`)

use crate::error::{GazetteerError, Result};
use crate::events::{EntryRef, EventBus};
use crate::fs::FileSystem;
use crate::records::FeatureCodeRecord;
use crate::report::{Issue, IssueKind, IssueReporter, Location};
use std::io::BufRead;
use std::path::Path;
use tracing::debug;

/// Parse a feature-code file, raising the usual file and entry events
pub fn read_feature_codes(
    fs: &dyn FileSystem,
    path: &Path,
    reporter: &dyn IssueReporter,
    events: &EventBus,
) -> Result<Vec<FeatureCodeRecord>> {
    let read_failed = |e: std::io::Error| GazetteerError::ReadFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    events.file_started(path)?;
    let reader = fs.open(path).map_err(read_failed)?;
    let mut codes = Vec::new();

    for (number, line) in (1u64..).zip(reader.lines()) {
        let line = line.map_err(read_failed)?;
        if line.trim().is_empty() {
            continue;
        }

        let mut columns = line.split('\t');
        let (Some(code), Some(name)) = (columns.next(), columns.next()) else {
            reporter.report(
                Issue::low(IssueKind::MalformedRecord, "feature code line needs a name")
                    .at(Location::line(path, number)),
            );
            continue;
        };

        let record = FeatureCodeRecord {
            code: code.to_string(),
            name: name.to_string(),
            description: columns
                .next()
                .filter(|d| !d.is_empty())
                .map(str::to_string),
        };
        events.entry_parsed(EntryRef::FeatureCode(&record))?;
        codes.push(record);
    }

    events.file_finished(path)?;
    debug!(file = %path.display(), codes = codes.len(), "Read feature codes");
    Ok(codes)
}
