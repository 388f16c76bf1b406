//! Issue reporting
//!
//! Every component receives an `Arc<dyn IssueReporter>` and reports the
//! non-fatal problems it absorbs (rejected files, bad field tokens, failed
//! joins). Nothing here is process-global.

use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, warn};

/// How serious a reported issue is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Absorbed: a default was substituted or a record was dropped
    Low,
    /// A whole file or directory was excluded
    Medium,
    /// The run cannot continue
    Critical,
}

/// What kind of problem was reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    /// A file failed validation and was excluded from its queue
    FileRejected,
    /// A field token could not be parsed; a default was used
    FieldGrammar,
    /// A line did not carry the fields its keyword requires
    MalformedRecord,
    /// A zone name was not present in the reference files
    MissingReference,
    /// A name was already present in the name index
    DuplicateName,
    /// A link pointed at a name that was never defined
    UnresolvedLink,
    /// A city referenced a time zone name that is not indexed
    UnresolvedTimeZone,
    /// A gazetteer file was aborted by a strict field
    FileAborted,
    /// Writing to the sink failed
    Sink,
}

/// Where an issue was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: PathBuf,
    pub line: Option<u64>,
}

impl Location {
    pub fn file(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            line: None,
        }
    }

    pub fn line(path: &Path, line: u64) -> Self {
        Self {
            path: path.to_path_buf(),
            line: Some(line),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.path.display(), line),
            None => write!(f, "{}", self.path.display()),
        }
    }
}

/// A single reported issue
#[derive(Debug, Clone)]
pub struct Issue {
    pub severity: Severity,
    pub kind: IssueKind,
    pub message: String,
    pub location: Option<Location>,
}

impl Issue {
    /// Create a low-severity issue
    pub fn low(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Low,
            kind,
            message: message.into(),
            location: None,
        }
    }

    /// Create a medium-severity issue
    pub fn medium(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Medium,
            ..Self::low(kind, message)
        }
    }

    /// Create a critical issue
    pub fn critical(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Critical,
            ..Self::low(kind, message)
        }
    }

    /// Attach a location
    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

/// Sink for non-fatal problems found during a run
pub trait IssueReporter: Send + Sync {
    /// Report an issue
    fn report(&self, issue: Issue);

    /// Issues reported so far, by severity
    fn counts(&self) -> IssueCounts;
}

/// Counts of reported issues by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IssueCounts {
    pub low: u64,
    pub medium: u64,
    pub critical: u64,
}

impl IssueCounts {
    pub fn total(&self) -> u64 {
        self.low + self.medium + self.critical
    }
}

/// Reporter that logs through `tracing` and counts issues
#[derive(Debug, Default)]
pub struct TracingReporter {
    low: AtomicU64,
    medium: AtomicU64,
    critical: AtomicU64,
}

impl TracingReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IssueReporter for TracingReporter {
    fn report(&self, issue: Issue) {
        let location = issue
            .location
            .as_ref()
            .map(|l| l.to_string())
            .unwrap_or_default();

        match issue.severity {
            Severity::Low => {
                self.low.fetch_add(1, Ordering::Relaxed);
                debug!(kind = ?issue.kind, location = %location, "{}", issue.message);
            }
            Severity::Medium => {
                self.medium.fetch_add(1, Ordering::Relaxed);
                warn!(kind = ?issue.kind, location = %location, "{}", issue.message);
            }
            Severity::Critical => {
                self.critical.fetch_add(1, Ordering::Relaxed);
                error!(kind = ?issue.kind, location = %location, "{}", issue.message);
            }
        }
    }

    fn counts(&self) -> IssueCounts {
        IssueCounts {
            low: self.low.load(Ordering::Relaxed),
            medium: self.medium.load(Ordering::Relaxed),
            critical: self.critical.load(Ordering::Relaxed),
        }
    }
}

/// Reporter that keeps every issue in memory
#[derive(Debug, Default)]
pub struct CollectingReporter {
    issues: Mutex<Vec<Issue>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All issues reported so far
    pub fn issues(&self) -> Vec<Issue> {
        self.issues.lock().clone()
    }

    /// Number of issues of the given kind
    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.lock().iter().filter(|i| i.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.lock().is_empty()
    }
}

impl IssueReporter for CollectingReporter {
    fn report(&self, issue: Issue) {
        self.issues.lock().push(issue);
    }

    fn counts(&self) -> IssueCounts {
        let mut counts = IssueCounts::default();
        for issue in self.issues.lock().iter() {
            match issue.severity {
                Severity::Low => counts.low += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Critical => counts.critical += 1,
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_reporter_counts() {
        let reporter = TracingReporter::new();
        reporter.report(Issue::low(IssueKind::FieldGrammar, "bad month"));
        reporter.report(Issue::low(IssueKind::FieldGrammar, "bad year"));
        reporter.report(Issue::medium(IssueKind::FileRejected, "no header"));

        let counts = reporter.counts();
        assert_eq!(counts.low, 2);
        assert_eq!(counts.medium, 1);
        assert_eq!(counts.critical, 0);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_collecting_reporter() {
        let reporter = CollectingReporter::new();
        assert!(reporter.is_empty());

        reporter.report(
            Issue::low(IssueKind::UnresolvedLink, "no target")
                .at(Location::line(Path::new("backward"), 7)),
        );

        assert_eq!(reporter.count(IssueKind::UnresolvedLink), 1);
        let issues = reporter.issues();
        assert_eq!(issues[0].location.as_ref().unwrap().to_string(), "backward:7");
    }
}
