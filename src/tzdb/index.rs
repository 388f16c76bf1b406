//! Time zone name index
//!
//! The tz parser owns a [`TzIndexBuilder`] while it runs. When it is done it
//! freezes the builder into a [`TzNameIndex`] and publishes it through an
//! [`IndexPublisher`]; the gazetteer side waits on the matching
//! [`PendingIndex`] so that no join ever sees a half-built index.

use crate::records::TimeZoneRecord;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

/// Mutable index used while parsing. Names can be added but never replaced.
#[derive(Debug, Default)]
pub struct TzIndexBuilder {
    entries: HashMap<String, TimeZoneRecord>,
}

impl TzIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record` under its name.
    ///
    /// Returns `false` and leaves the index unchanged if the name exists.
    pub fn insert(&mut self, record: TimeZoneRecord) -> bool {
        match self.entries.entry(record.name.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&TimeZoneRecord> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Freeze into a read-only, shareable index
    pub fn freeze(self) -> TzNameIndex {
        TzNameIndex {
            entries: Arc::new(self.entries),
        }
    }
}

/// Read-only name index, cheap to clone and share across threads
#[derive(Debug, Clone, Default)]
pub struct TzNameIndex {
    entries: Arc<HashMap<String, TimeZoneRecord>>,
}

impl TzNameIndex {
    /// An index with no names, used when no tz directory is configured
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&TimeZoneRecord> {
        self.entries.get(name)
    }

    /// Surrogate id for `name`
    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.entries.get(name).map(|r| r.id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Create a linked publisher / pending pair
pub fn pending() -> (IndexPublisher, PendingIndex) {
    let (sender, receiver) = bounded(1);
    (IndexPublisher { sender }, PendingIndex { receiver })
}

/// Write side of the index handoff
#[derive(Debug)]
pub struct IndexPublisher {
    sender: Sender<TzNameIndex>,
}

impl IndexPublisher {
    /// Publish the finished index. Consumes the publisher.
    pub fn publish(self, index: TzNameIndex) {
        // Nobody waiting is fine: the gazetteer stage may not be configured
        let _ = self.sender.send(index);
    }
}

/// Read side of the index handoff
#[derive(Debug)]
pub struct PendingIndex {
    receiver: Receiver<TzNameIndex>,
}

impl PendingIndex {
    /// A pending index that resolves immediately
    pub fn ready(index: TzNameIndex) -> Self {
        let (publisher, pending) = pending();
        publisher.publish(index);
        pending
    }

    /// Block until the index is published.
    ///
    /// Returns `None` if the publisher was dropped without publishing,
    /// i.e. the tz stage failed.
    pub fn wait(self) -> Option<TzNameIndex> {
        self.receiver.recv().ok()
    }
}
