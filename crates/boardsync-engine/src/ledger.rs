use std::collections::{BTreeMap, BTreeSet};

use boardsync_domain::{MoveId, MoveIntent, TaskId};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};

/// The one outstanding move that counts for a task.
#[derive(Debug, Clone, PartialEq)]
pub struct InFlightMove {
    pub move_id: MoveId,
    pub intent: MoveIntent,
    pub registered_at: DateTime<Utc>,
}

/// Tracks at most one authoritative in-flight move per task.
///
/// A newer move for the same task replaces the older entry instead of
/// queueing behind it. Entries are only removed by the move that owns them.
///
/// The ledger lock also serializes snapshot changes that depend on it. Code
/// that must see the ledger and the store agree holds a [`LedgerGuard`]
/// while it updates the store; the ledger is always locked before the store.
#[derive(Debug, Default)]
pub struct InFlightLedger {
    entries: Mutex<BTreeMap<TaskId, InFlightMove>>,
}

impl InFlightLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> LedgerGuard<'_> {
        LedgerGuard {
            entries: self.entries.lock(),
        }
    }

    /// Register `intent` as the current move for its task. Returns the entry
    /// it supersedes, if any.
    pub fn register(&self, intent: &MoveIntent) -> Option<InFlightMove> {
        self.lock().register(intent)
    }

    pub fn is_current(&self, task_id: TaskId, move_id: MoveId) -> bool {
        self.lock().is_current(task_id, move_id)
    }

    /// Remove the entry for `task_id` if `move_id` still owns it.
    pub fn resolve(&self, task_id: TaskId, move_id: MoveId) -> bool {
        self.lock().resolve(task_id, move_id)
    }

    pub fn get(&self, task_id: TaskId) -> Option<InFlightMove> {
        self.entries.lock().get(&task_id).cloned()
    }

    pub fn in_flight_ids(&self) -> BTreeSet<TaskId> {
        self.lock().in_flight_ids()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Exclusive access to the ledger.
pub struct LedgerGuard<'a> {
    entries: MutexGuard<'a, BTreeMap<TaskId, InFlightMove>>,
}

impl LedgerGuard<'_> {
    pub fn register(&mut self, intent: &MoveIntent) -> Option<InFlightMove> {
        let entry = InFlightMove {
            move_id: intent.move_id,
            intent: intent.clone(),
            registered_at: Utc::now(),
        };
        self.entries.insert(intent.task_id, entry)
    }

    pub fn is_current(&self, task_id: TaskId, move_id: MoveId) -> bool {
        self.entries
            .get(&task_id)
            .is_some_and(|entry| entry.move_id == move_id)
    }

    pub fn resolve(&mut self, task_id: TaskId, move_id: MoveId) -> bool {
        if self.is_current(task_id, move_id) {
            self.entries.remove(&task_id);
            true
        } else {
            false
        }
    }

    pub fn in_flight_ids(&self) -> BTreeSet<TaskId> {
        self.entries.keys().copied().collect()
    }
}
