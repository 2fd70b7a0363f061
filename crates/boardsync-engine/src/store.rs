use std::sync::Arc;

use boardsync_core::BoardResult;
use boardsync_domain::{ContainerId, Snapshot, Task, TaskId};
use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Why the snapshot changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    Loaded,
    Applied,
    RolledBack,
    Reconciled,
    Merged,
    ViewState,
}

/// Published on every snapshot replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotChanged {
    pub version: u64,
    pub reason: ChangeReason,
}

/// Holder of the current board snapshot.
///
/// Every state change goes through [`SnapshotStore::update`], which reads the
/// current snapshot, lets the caller compute the next one, and swaps it in
/// under a single lock. Readers get an `Arc` handle and never see a partially
/// applied change.
pub struct SnapshotStore {
    current: Mutex<Arc<Snapshot>>,
    tx: broadcast::Sender<SnapshotChanged>,
}

impl SnapshotStore {
    pub fn new(initial: Snapshot, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            current: Mutex::new(Arc::new(initial)),
            tx,
        }
    }

    pub fn get(&self) -> Arc<Snapshot> {
        self.current.lock().clone()
    }

    /// Swap in `next` unconditionally. Returns the new version.
    pub fn replace(&self, next: Snapshot, reason: ChangeReason) -> u64 {
        let version = {
            let mut current = self.current.lock();
            let version = current.version() + 1;
            *current = Arc::new(next.with_version(version));
            version
        };
        self.publish(version, reason);
        version
    }

    /// Compute and install the next snapshot atomically.
    ///
    /// `f` returns the next snapshot (or `None` to leave the store as is)
    /// together with a value handed back to the caller. Subscribers are only
    /// notified when a snapshot was installed. An error leaves the store
    /// untouched.
    pub fn update<T, F>(&self, reason: ChangeReason, f: F) -> BoardResult<T>
    where
        F: FnOnce(&Snapshot) -> BoardResult<(Option<Snapshot>, T)>,
    {
        let (value, version) = {
            let mut current = self.current.lock();
            let (next, value) = f(&**current)?;
            let version = next.map(|next| {
                let version = current.version() + 1;
                *current = Arc::new(next.with_version(version));
                version
            });
            (value, version)
        };

        if let Some(version) = version {
            self.publish(version, reason);
        }
        Ok(value)
    }

    pub fn tasks_in(&self, container_id: ContainerId) -> Vec<Task> {
        self.get()
            .tasks_in(container_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Record which task is being dragged. View state only.
    pub fn set_dragging(&self, dragging: Option<TaskId>) -> BoardResult<()> {
        self.update(ChangeReason::ViewState, |current| {
            if current.dragging() == dragging {
                return Ok((None, ()));
            }
            Ok((Some(current.clone().with_dragging(dragging)), ()))
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SnapshotChanged> {
        self.tx.subscribe()
    }

    fn publish(&self, version: u64, reason: ChangeReason) {
        tracing::trace!("Snapshot v{} published ({:?})", version, reason);
        let _ = self.tx.send(SnapshotChanged { version, reason });
    }
}
