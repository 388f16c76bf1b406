//! Parser notifications
//!
//! Both parsers raise the same four notifications: a file started, a file
//! finished, an entry was parsed, the directory finished. Observers are
//! registered on an [`EventBus`] before the parser runs; the bus is then
//! shared read-only by every worker.

use crate::error::Result;
use crate::records::{
    CityRecord, FeatureCodeRecord, LeapRecord, LinkRecord, RuleRecord, TimeZoneRecord,
};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A borrowed view of a freshly parsed record
#[derive(Debug, Clone, Copy)]
pub enum EntryRef<'a> {
    TimeZone(&'a TimeZoneRecord),
    Rule(&'a RuleRecord),
    /// A `Link` line, before resolution
    Link(&'a LinkRecord),
    Leap(&'a LeapRecord),
    City(&'a CityRecord),
    FeatureCode(&'a FeatureCodeRecord),
}

/// A parser notification
#[derive(Debug, Clone, Copy)]
pub enum ParseEvent<'a> {
    FileStarted { path: &'a Path },
    FileFinished { path: &'a Path },
    EntryParsed(EntryRef<'a>),
    DirectoryFinished { path: &'a Path },
}

/// Receives parser notifications
///
/// May be called from several worker threads at once. Returning an error
/// aborts the parser that emitted the event.
pub trait ParseObserver: Send + Sync {
    fn on_event(&self, event: &ParseEvent<'_>) -> Result<()>;
}

/// Ordered list of observers
#[derive(Clone, Default)]
pub struct EventBus {
    observers: Vec<Arc<dyn ParseObserver>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Only possible before the bus is shared.
    pub fn register(&mut self, observer: Arc<dyn ParseObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Deliver an event to every observer in registration order
    pub fn emit(&self, event: ParseEvent<'_>) -> Result<()> {
        for observer in &self.observers {
            observer.on_event(&event)?;
        }
        Ok(())
    }

    pub fn file_started(&self, path: &Path) -> Result<()> {
        self.emit(ParseEvent::FileStarted { path })
    }

    pub fn file_finished(&self, path: &Path) -> Result<()> {
        self.emit(ParseEvent::FileFinished { path })
    }

    pub fn entry_parsed(&self, entry: EntryRef<'_>) -> Result<()> {
        self.emit(ParseEvent::EntryParsed(entry))
    }

    pub fn directory_finished(&self, path: &Path) -> Result<()> {
        self.emit(ParseEvent::DirectoryFinished { path })
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Observer that counts notifications by kind
#[derive(Debug, Default)]
pub struct EventCounter {
    pub files_started: AtomicU64,
    pub files_finished: AtomicU64,
    pub entries: AtomicU64,
    pub directories: AtomicU64,
}

impl EventCounter {
    pub fn entries(&self) -> u64 {
        self.entries.load(Ordering::Relaxed)
    }

    pub fn files_finished(&self) -> u64 {
        self.files_finished.load(Ordering::Relaxed)
    }
}

impl ParseObserver for EventCounter {
    fn on_event(&self, event: &ParseEvent<'_>) -> Result<()> {
        let counter = match event {
            ParseEvent::FileStarted { .. } => &self.files_started,
            ParseEvent::FileFinished { .. } => &self.files_finished,
            ParseEvent::EntryParsed(_) => &self.entries,
            ParseEvent::DirectoryFinished { .. } => &self.directories,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;
    use std::path::PathBuf;

    struct Failing;

    impl ParseObserver for Failing {
        fn on_event(&self, _event: &ParseEvent<'_>) -> Result<()> {
            Err(IngestError::ChannelClosed)
        }
    }

    #[test]
    fn test_bus_delivers_in_order() {
        let counter = Arc::new(EventCounter::default());
        let mut bus = EventBus::new();
        bus.register(counter.clone());

        let path = PathBuf::from("/tz/europe");
        bus.file_started(&path).unwrap();
        bus.file_finished(&path).unwrap();
        bus.directory_finished(Path::new("/tz")).unwrap();

        assert_eq!(counter.files_started.load(Ordering::Relaxed), 1);
        assert_eq!(counter.files_finished(), 1);
        assert_eq!(counter.directories.load(Ordering::Relaxed), 1);
        assert_eq!(counter.entries(), 0);
    }

    #[test]
    fn test_observer_error_stops_delivery() {
        let counter = Arc::new(EventCounter::default());
        let mut bus = EventBus::new();
        bus.register(Arc::new(Failing));
        bus.register(counter.clone());

        assert!(bus.file_started(Path::new("/x")).is_err());
        assert_eq!(counter.files_started.load(Ordering::Relaxed), 0);
    }
}
