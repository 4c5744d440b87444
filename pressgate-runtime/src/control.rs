//! Cooperative worker enable/disable
//!
//! The supervisor publishes the enabled [`WorkerSet`] on a watch channel.
//! Each worker holds a [`WorkerHandle`] and checks it at the top of every
//! iteration, parking until it is enabled again. Nothing is preempted in
//! the middle of an operation.

use pressgate_core::{Worker, WorkerSet};
use tokio::sync::watch;

/// Publisher of the enabled worker set
#[derive(Debug)]
pub struct WorkerControl {
    tx: watch::Sender<WorkerSet>,
}

impl WorkerControl {
    /// Control with every worker disabled
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(WorkerSet::EMPTY);
        Self { tx }
    }

    /// Publish `set`; returns true if it differs from the current one
    ///
    /// Re-applying the same set wakes nobody.
    pub fn apply(&self, set: WorkerSet) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == set {
                false
            } else {
                *current = set;
                true
            }
        })
    }

    /// Currently enabled workers
    pub fn enabled(&self) -> WorkerSet {
        *self.tx.borrow()
    }

    /// Handle for `worker`
    pub fn handle(&self, worker: Worker) -> WorkerHandle {
        WorkerHandle {
            worker,
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for WorkerControl {
    fn default() -> Self {
        Self::new()
    }
}

/// A worker's view of the enabled set
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    worker: Worker,
    rx: watch::Receiver<WorkerSet>,
}

impl WorkerHandle {
    /// Worker this handle belongs to
    pub fn worker(&self) -> Worker {
        self.worker
    }

    /// True if currently enabled
    pub fn is_enabled(&self) -> bool {
        self.rx.borrow().contains(self.worker)
    }

    /// Park until enabled
    ///
    /// Returns false once the control is gone; the worker should exit.
    pub async fn wait_enabled(&mut self) -> bool {
        let worker = self.worker;
        self.rx.wait_for(|set| set.contains(worker)).await.is_ok()
    }
}
