//! Validated-file queue
//!
//! A producer-consumer queue of accepted files. The single producer is a
//! [`FileQueueProducer`]; dropping it closes the channel, which is the
//! "no more items" signal. Because the signal is tied to `Drop`, it fires on
//! every exit path of the populating code, including early returns and
//! panics.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Kind of an accepted file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// A `.tab` reference file in the tz database
    TabReference,
    /// A record-bearing data file
    Data,
}

/// A file that passed validation
///
/// Rejected files are reported and never constructed, so every value is valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFile {
    pub path: PathBuf,
    pub kind: FileKind,
    /// Size in bytes at validation time
    pub size: u64,
}

impl ValidatedFile {
    pub fn new(path: PathBuf, kind: FileKind, size: u64) -> Self {
        Self { path, kind, size }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_data(&self) -> bool {
        self.kind == FileKind::Data
    }
}

/// Statistics for the file queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Files pushed by the producer
    pub enqueued: AtomicU64,

    /// Files handed to a consumer
    pub dequeued: AtomicU64,

    /// Bytes of all enqueued files
    pub bytes_enqueued: AtomicU64,

    /// Set once the producer is gone
    pub completed: AtomicBool,
}

impl QueueStats {
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    pub fn dequeued(&self) -> u64 {
        self.dequeued.load(Ordering::Relaxed)
    }

    pub fn bytes_enqueued(&self) -> u64 {
        self.bytes_enqueued.load(Ordering::Relaxed)
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }
}

/// Consumer side of the queue
///
/// Cloning shares the same underlying channel; each file is delivered to
/// exactly one receiver.
#[derive(Debug, Clone)]
pub struct ValidatedFileQueue {
    receiver: Receiver<ValidatedFile>,
    stats: Arc<QueueStats>,
}

/// Producer side of the queue. Dropping it marks the queue complete.
#[derive(Debug)]
pub struct FileQueueProducer {
    sender: Option<Sender<ValidatedFile>>,
    stats: Arc<QueueStats>,
}

impl ValidatedFileQueue {
    /// Create a queue and its single producer
    pub fn new() -> (ValidatedFileQueue, FileQueueProducer) {
        let (sender, receiver) = unbounded();
        let stats = Arc::new(QueueStats::default());

        let queue = ValidatedFileQueue {
            receiver,
            stats: Arc::clone(&stats),
        };
        let producer = FileQueueProducer {
            sender: Some(sender),
            stats,
        };
        (queue, producer)
    }

    /// Take the next file, blocking until one is available.
    /// Returns `None` once the producer is gone and the queue is drained.
    pub fn take(&self) -> Option<ValidatedFile> {
        let file = self.receiver.recv().ok()?;
        self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
        Some(file)
    }

    /// Blocking iterator that ends when the queue is complete and drained
    pub fn consume(&self) -> impl Iterator<Item = ValidatedFile> + '_ {
        std::iter::from_fn(move || self.take())
    }

    /// Number of files waiting
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Whether the producer has signalled completion
    pub fn is_completed(&self) -> bool {
        self.stats.is_completed()
    }

    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }
}

impl FileQueueProducer {
    /// Push an accepted file
    pub fn push(&self, file: ValidatedFile) {
        if let Some(sender) = &self.sender {
            self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
            self.stats
                .bytes_enqueued
                .fetch_add(file.size, Ordering::Relaxed);
            // All receivers gone means nobody will read; nothing to do
            let _ = sender.send(file);
        }
    }

    /// Signal that no more files will be pushed
    pub fn complete(self) {
        drop(self);
    }
}

impl Drop for FileQueueProducer {
    fn drop(&mut self) {
        self.sender.take();
        self.stats.completed.store(true, Ordering::Release);
    }
}
