//! Table-keyed bulk sink abstraction
//!
//! The parsers never talk to storage directly. The coordinator hands every
//! finished batch to a [`RecordSink`], which is either the SQLite writer
//! thread or an in-memory collector for dry runs and tests.

use crate::error::SinkResult;
use crate::records::{
    CityRecord, FeatureCodeRecord, LeapRecord, RecordBatch, RuleRecord, Table, TimeZoneRecord,
};
use parking_lot::Mutex;

/// Destination for parsed record batches
pub trait RecordSink: Send + Sync {
    /// Hand one batch to the sink. An error aborts the run.
    fn write(&self, batch: RecordBatch) -> SinkResult<()>;
}

/// Keeps every batch in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    batches: Mutex<Vec<RecordBatch>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of batches received so far
    pub fn batch_count(&self) -> usize {
        self.batches.lock().len()
    }

    /// Total rows received for one table
    pub fn rows(&self, table: Table) -> usize {
        self.batches
            .lock()
            .iter()
            .filter(|b| b.table() == table)
            .map(RecordBatch::len)
            .sum()
    }

    pub fn time_zones(&self) -> Vec<TimeZoneRecord> {
        self.collect(|b| match b {
            RecordBatch::TimeZones(v) => Some(v.clone()),
            _ => None,
        })
    }

    pub fn rules(&self) -> Vec<RuleRecord> {
        self.collect(|b| match b {
            RecordBatch::Rules(v) => Some(v.clone()),
            _ => None,
        })
    }

    pub fn leaps(&self) -> Vec<LeapRecord> {
        self.collect(|b| match b {
            RecordBatch::Leaps(v) => Some(v.clone()),
            _ => None,
        })
    }

    pub fn cities(&self) -> Vec<CityRecord> {
        self.collect(|b| match b {
            RecordBatch::Cities(v) => Some(v.clone()),
            _ => None,
        })
    }

    pub fn feature_codes(&self) -> Vec<FeatureCodeRecord> {
        self.collect(|b| match b {
            RecordBatch::FeatureCodes(v) => Some(v.clone()),
            _ => None,
        })
    }

    fn collect<T>(&self, pick: impl Fn(&RecordBatch) -> Option<Vec<T>>) -> Vec<T> {
        self.batches.lock().iter().filter_map(pick).flatten().collect()
    }
}

impl RecordSink for MemorySink {
    fn write(&self, batch: RecordBatch) -> SinkResult<()> {
        if !batch.is_empty() {
            self.batches.lock().push(batch);
        }
        Ok(())
    }
}
