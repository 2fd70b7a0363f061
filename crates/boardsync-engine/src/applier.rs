use std::sync::Arc;

use boardsync_core::BoardResult;
use boardsync_domain::{ApplyMove, MoveIntent, RollbackToken, Transition};

use crate::store::{ChangeReason, SnapshotStore};

/// Result of a conditional rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackOutcome {
    Reverted,
    /// A newer move owns the task; nothing was changed.
    StaleNoop,
}

/// Applies move intents to the store immediately and undoes them on demand.
#[derive(Clone)]
pub struct OptimisticApplier {
    store: Arc<SnapshotStore>,
}

impl OptimisticApplier {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self { store }
    }

    pub fn apply(&self, intent: &MoveIntent) -> BoardResult<RollbackToken> {
        let transition = ApplyMove::new(intent.clone());
        let token = self.store.update(ChangeReason::Applied, |current| {
            let (next, token) = transition.apply(current)?;
            Ok((Some(next), token))
        })?;
        tracing::debug!("Applied: {}", transition.description());
        Ok(token)
    }

    /// Revert the move behind `token` if no newer move has replaced it.
    pub fn rollback(&self, token: RollbackToken) -> BoardResult<RollbackOutcome> {
        let revert = token.into_revert();
        let reverted = self.store.update(ChangeReason::RolledBack, |current| {
            let next = revert.transition(current)?;
            let reverted = next.is_some();
            Ok((next, reverted))
        })?;

        if reverted {
            tracing::debug!("Rolled back: {}", revert.description());
            Ok(RollbackOutcome::Reverted)
        } else {
            tracing::debug!(
                "Rollback of move {} skipped: task {} has moved since",
                revert.token().move_id(),
                revert.token().task_id()
            );
            Ok(RollbackOutcome::StaleNoop)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardsync_domain::{
        BoardPayload, Placement, PlacementRequest, PlacementTarget, Snapshot, Task,
    };

    struct Fixture {
        store: Arc<SnapshotStore>,
        applier: OptimisticApplier,
        backlog: PlacementTarget,
        column: PlacementTarget,
        tasks: Vec<Task>,
    }

    fn fixture() -> Fixture {
        let backlog = PlacementTarget::backlog("Backlog".to_string());
        let sprint = PlacementTarget::sprint("Sprint".to_string());
        let column = PlacementTarget::column(sprint.id, "Todo".to_string(), 0);
        let tasks: Vec<Task> = (0..3)
            .map(|i| Task::new(format!("Task {}", i), Placement::backlog(backlog.id, i)))
            .collect();
        let snapshot = Snapshot::from_payload(BoardPayload::new(
            tasks.clone(),
            vec![backlog.clone(), sprint, column.clone()],
        ));
        let store = Arc::new(SnapshotStore::new(snapshot, 8));
        Fixture {
            applier: OptimisticApplier::new(store.clone()),
            store,
            backlog,
            column,
            tasks,
        }
    }

    fn intent(f: &Fixture, task: usize, request: PlacementRequest) -> MoveIntent {
        let snapshot = f.store.get();
        let id = f.tasks[task].id;
        MoveIntent::build(&snapshot, id, snapshot.task(id).unwrap().placement, request).unwrap()
    }

    #[test]
    fn test_apply_publishes_new_snapshot() {
        let f = fixture();
        let mut rx = f.store.subscribe();
        let version = f.store.get().version();

        let token = f
            .applier
            .apply(&intent(&f, 0, PlacementRequest::new(f.column.id, 0)))
            .unwrap();

        assert_eq!(token.prior_snapshot_version(), version);
        assert_eq!(f.store.tasks_in(f.column.id).len(), 1);
        assert_eq!(f.store.tasks_in(f.backlog.id).len(), 2);
        assert_eq!(rx.try_recv().unwrap().reason, ChangeReason::Applied);
    }

    #[test]
    fn test_rollback_reverts_and_then_goes_stale() {
        let f = fixture();
        let before = f.store.get();

        let token_a = f
            .applier
            .apply(&intent(&f, 1, PlacementRequest::new(f.column.id, 0)))
            .unwrap();
        assert_eq!(f.applier.rollback(token_a).unwrap(), RollbackOutcome::Reverted);
        assert_eq!(
            f.store.tasks_in(f.backlog.id),
            before
                .tasks_in(f.backlog.id)
                .into_iter()
                .cloned()
                .collect::<Vec<_>>()
        );

        let token_b = f
            .applier
            .apply(&intent(&f, 1, PlacementRequest::new(f.column.id, 0)))
            .unwrap();
        f.applier
            .apply(&intent(&f, 1, PlacementRequest::append(f.backlog.id)))
            .unwrap();
        let version = f.store.get().version();

        assert_eq!(f.applier.rollback(token_b).unwrap(), RollbackOutcome::StaleNoop);
        assert_eq!(f.store.get().version(), version);
    }
}
