//! Pure snapshot transitions.
//!
//! Every change to placement state is expressed as a transition from one
//! snapshot to the next. Transitions never touch the previous snapshot, so
//! a published snapshot stays valid for any reader still holding it.

use std::collections::BTreeMap;

use boardsync_core::{BoardError, BoardResult};

use crate::ordering;
use crate::{Placement, Snapshot, Task, TaskId};

pub mod apply_move;
pub mod merge_fragment;
pub mod revert_move;

pub use apply_move::ApplyMove;
pub use merge_fragment::{AdoptServerTask, MergeFragment, MergeReport};
pub use revert_move::{RevertMove, RollbackToken};

/// A state change computed from a snapshot.
pub trait Transition {
    /// Compute the next snapshot. `Ok(None)` means nothing changes.
    fn transition(&self, snapshot: &Snapshot) -> BoardResult<Option<Snapshot>>;

    /// Human-readable description of what this transition does
    fn description(&self) -> String;
}

/// Take a task out of its container and insert it at `to`, reindexing both
/// containers. The index is clamped to the destination's length. Returns the
/// placement the task ends up with.
pub(crate) fn relocate(
    tasks: &mut BTreeMap<TaskId, Task>,
    task_id: TaskId,
    to: Placement,
) -> BoardResult<Placement> {
    let from = tasks
        .get(&task_id)
        .map(|t| t.placement)
        .ok_or_else(|| BoardError::NotFound(format!("Task {}", task_id)))?;

    let mut source = ordering::ordered_ids(tasks, from.container_id);
    source.retain(|id| *id != task_id);

    let mut destination = if from.container_id == to.container_id {
        source.clone()
    } else {
        ordering::reindex(tasks, &source);
        ordering::ordered_ids(tasks, to.container_id)
    };

    let index = to.index.min(destination.len());
    destination.insert(index, task_id);

    let landed = to.at(index);
    if let Some(task) = tasks.get_mut(&task_id) {
        task.placement = landed;
    }
    ordering::reindex(tasks, &destination);

    Ok(landed)
}
