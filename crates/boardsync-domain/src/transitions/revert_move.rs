use boardsync_core::BoardResult;

use super::{relocate, Transition};
use crate::{MoveId, Placement, Snapshot, TaskId};

/// Undo information for one optimistic move.
///
/// Deliberately not `Clone`: a token is consumed exactly once, either by
/// [`RollbackToken::discard`] when the move is confirmed or by
/// [`RollbackToken::into_revert`] when it fails.
#[derive(Debug, PartialEq, Eq)]
pub struct RollbackToken {
    move_id: MoveId,
    task_id: TaskId,
    prior_placement: Placement,
    /// Move that owned the task before this one, if any.
    prior_stamp: Option<MoveId>,
    prior_snapshot_version: u64,
    expected_placement: Placement,
}

impl RollbackToken {
    pub(crate) fn new(
        move_id: MoveId,
        task_id: TaskId,
        prior_placement: Placement,
        prior_stamp: Option<MoveId>,
        prior_snapshot_version: u64,
        expected_placement: Placement,
    ) -> Self {
        Self {
            move_id,
            task_id,
            prior_placement,
            prior_stamp,
            prior_snapshot_version,
            expected_placement,
        }
    }

    pub fn move_id(&self) -> MoveId {
        self.move_id
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn prior_placement(&self) -> Placement {
        self.prior_placement
    }

    pub fn prior_snapshot_version(&self) -> u64 {
        self.prior_snapshot_version
    }

    /// Placement the move produced.
    pub fn expected_placement(&self) -> Placement {
        self.expected_placement
    }

    pub fn discard(self) {}

    pub fn into_revert(self) -> RevertMove {
        RevertMove { token: self }
    }
}

/// Conditionally put a task back where it was before a move.
///
/// This is a compare-and-swap: the task is only moved back if it still sits
/// in the container the move produced and no later move has been applied to
/// it. Otherwise the transition is a no-op. Only the container is compared,
/// not the index, because moves of neighbouring tasks shift indices without
/// superseding this one.
///
/// Reverting hands ownership back to the move that preceded this one, so an
/// older move that fails afterwards can still undo itself.
pub struct RevertMove {
    token: RollbackToken,
}

impl RevertMove {
    pub fn token(&self) -> &RollbackToken {
        &self.token
    }

    pub fn is_current(&self, snapshot: &Snapshot) -> bool {
        let token = &self.token;
        let still_there = snapshot
            .task(token.task_id)
            .is_some_and(|t| t.placement.same_container(&token.expected_placement));
        still_there && snapshot.move_stamp(token.task_id) == Some(token.move_id)
    }
}

impl Transition for RevertMove {
    fn transition(&self, snapshot: &Snapshot) -> BoardResult<Option<Snapshot>> {
        if !self.is_current(snapshot) {
            return Ok(None);
        }

        let token = &self.token;
        let mut tasks = snapshot.tasks_map().clone();
        relocate(&mut tasks, token.task_id, token.prior_placement)?;

        let mut stamps = snapshot.stamps_map().clone();
        match token.prior_stamp {
            Some(previous) => stamps.insert(token.task_id, previous),
            None => stamps.remove(&token.task_id),
        };

        Ok(Some(Snapshot::from_parts(
            tasks,
            snapshot.targets_map().clone(),
            stamps,
            snapshot.dragging(),
        )))
    }

    fn description(&self) -> String {
        format!(
            "Revert task {} to container {} at {}",
            self.token.task_id,
            self.token.prior_placement.container_id,
            self.token.prior_placement.index
        )
    }
}
