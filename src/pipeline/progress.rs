//! Run progress: `(current, maximum)` and a status line under one mutex

use parking_lot::Mutex;
use std::sync::Arc;

/// Point-in-time copy of [`Progress`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub current: u64,
    pub maximum: u64,
    pub status: String,
}

impl ProgressSnapshot {
    /// Completed fraction in `0.0..=1.0`
    pub fn fraction(&self) -> f64 {
        if self.maximum == 0 {
            0.0
        } else {
            self.current as f64 / self.maximum as f64
        }
    }
}

/// Notified after every change, outside the lock
pub trait ProgressListener: Send + Sync {
    fn on_progress(&self, snapshot: &ProgressSnapshot);
}

/// Shared progress counters
///
/// Both counters only grow. `current` never exceeds `maximum`: advancing
/// past the maximum raises the maximum with it.
///
/// The pipeline advances once per finished file, aborted files included.
/// Files left unprocessed after every gazetteer worker stopped never
/// advance, so such a run ends below its maximum.
#[derive(Default)]
pub struct Progress {
    state: Mutex<ProgressSnapshot>,
    listener: Option<Arc<dyn ProgressListener>>,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listener(listener: Arc<dyn ProgressListener>) -> Self {
        Self {
            state: Mutex::new(ProgressSnapshot::default()),
            listener: Some(listener),
        }
    }

    /// Raise the maximum by `amount`
    pub fn add_maximum(&self, amount: u64) {
        self.update(|s| s.maximum += amount);
    }

    /// Count one unit of work as done
    pub fn advance(&self) {
        self.update(|s| {
            s.current += 1;
            s.maximum = s.maximum.max(s.current);
        });
    }

    pub fn set_status(&self, status: impl Into<String>) {
        let status = status.into();
        self.update(move |s| s.status = status);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state.lock().clone()
    }

    fn update(&self, change: impl FnOnce(&mut ProgressSnapshot)) {
        let snapshot = {
            let mut state = self.state.lock();
            change(&mut state);
            self.listener.as_ref().map(|_| state.clone())
        };

        if let (Some(listener), Some(snapshot)) = (&self.listener, snapshot) {
            listener.on_progress(&snapshot);
        }
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("state", &*self.state.lock())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}
