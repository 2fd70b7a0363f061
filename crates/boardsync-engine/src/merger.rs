use std::collections::BTreeSet;
use std::sync::Arc;

use boardsync_core::BoardResult;
use boardsync_domain::{
    AdoptServerTask, BoardPayload, MergeFragment, MergeReport, Snapshot, Task, TaskId, Transition,
};

use crate::ledger::{InFlightLedger, LedgerGuard};
use crate::store::{ChangeReason, SnapshotStore};

/// Local state as it stood when a board fetch was issued.
///
/// A fetched board can be older than moves that settled while it was on the
/// wire. Tasks that were in flight at the mark, or whose move stamp changed
/// since, keep their local placement when the fetch is merged.
#[derive(Debug, Clone)]
pub struct FetchMark {
    snapshot: Arc<Snapshot>,
    in_flight: BTreeSet<TaskId>,
}

impl FetchMark {
    fn settled_since(&self, current: &Snapshot) -> BTreeSet<TaskId> {
        let mut pinned = self.in_flight.clone();
        pinned.extend(
            current
                .tasks()
                .map(|task| task.id)
                .filter(|id| current.move_stamp(*id) != self.snapshot.move_stamp(*id)),
        );
        pinned
    }
}

/// Folds server data into the store while respecting in-flight moves.
#[derive(Clone)]
pub struct ReconciliationMerger {
    store: Arc<SnapshotStore>,
    ledger: Arc<InFlightLedger>,
}

impl ReconciliationMerger {
    pub fn new(store: Arc<SnapshotStore>, ledger: Arc<InFlightLedger>) -> Self {
        Self { store, ledger }
    }

    /// Merge a board fragment from a fetch or refresh.
    pub fn merge(&self, fragment: BoardPayload) -> BoardResult<MergeReport> {
        self.merge_pinned(fragment, |_| BTreeSet::new())
    }

    /// Record what is in flight before fetching a board.
    pub fn mark(&self) -> FetchMark {
        let entries = self.ledger.lock();
        FetchMark {
            snapshot: self.store.get(),
            in_flight: entries.in_flight_ids(),
        }
    }

    /// Merge a board fetched after `mark`, keeping tasks whose moves
    /// settled while the fetch was outstanding.
    pub fn merge_since(
        &self,
        fragment: BoardPayload,
        mark: &FetchMark,
    ) -> BoardResult<MergeReport> {
        self.merge_pinned(fragment, |current| mark.settled_since(current))
    }

    fn merge_pinned<P>(&self, fragment: BoardPayload, pinned: P) -> BoardResult<MergeReport>
    where
        P: FnOnce(&Snapshot) -> BTreeSet<TaskId>,
    {
        let entries = self.ledger.lock();
        let (report, description) = self.store.update(ChangeReason::Merged, |current| {
            let mut keep = entries.in_flight_ids();
            keep.extend(pinned(current));
            let merge = MergeFragment::new(fragment, keep);
            let (next, report) = merge.merge(current)?;
            let next = next.with_version(current.version());
            let changed = next != *current;
            Ok((changed.then_some(next), (report, merge.description())))
        })?;
        drop(entries);

        tracing::debug!(
            "{}: {} adopted, {} kept in flight, {} inserted, {} removed",
            description,
            report.adopted.len(),
            report.kept_in_flight.len(),
            report.inserted.len(),
            report.removed.len()
        );
        Ok(report)
    }

    /// Take the server's canonical copy of one task after a confirmed move.
    ///
    /// Returns true when the local snapshot changed.
    pub fn adopt(&self, server_task: Task) -> BoardResult<bool> {
        let entries = self.ledger.lock();
        self.adopt_locked(&entries, server_task)
    }

    /// [`adopt`](Self::adopt) for a caller already holding the ledger.
    pub fn adopt_locked(
        &self,
        entries: &LedgerGuard<'_>,
        server_task: Task,
    ) -> BoardResult<bool> {
        let mut in_flight = entries.in_flight_ids();
        in_flight.remove(&server_task.id);
        let adopt = AdoptServerTask::new(server_task, in_flight);

        let changed = self.store.update(ChangeReason::Reconciled, |current| {
            let next = adopt.transition(current)?;
            let changed = next.is_some();
            Ok((next, changed))
        })?;

        if changed {
            tracing::debug!("Reconciled: {}", adopt.description());
        }
        Ok(changed)
    }
}
