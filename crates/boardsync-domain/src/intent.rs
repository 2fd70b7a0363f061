use boardsync_core::BoardError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{ContainerId, MoveId, Placement, Snapshot, SprintId, TargetKind, TaskId};

/// Where a drag gesture wants the task to land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRequest {
    pub container_id: ContainerId,
    pub index: usize,
}

impl PlacementRequest {
    pub fn new(container_id: ContainerId, index: usize) -> Self {
        Self {
            container_id,
            index,
        }
    }

    /// Drop after the last task of the container.
    pub fn append(container_id: ContainerId) -> Self {
        Self::new(container_id, usize::MAX)
    }
}

/// Reasons a drag is refused before anything is mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("Unknown task: {0}")]
    UnknownTask(TaskId),

    #[error("Unknown placement target: {0}")]
    UnknownTarget(ContainerId),

    #[error("Target {0} does not accept placements")]
    TargetClosed(ContainerId),

    #[error("Sprint {0} has no columns to place tasks in")]
    NoColumns(SprintId),

    #[error("Task {task_id} is no longer where the drag started")]
    StalePlacement { task_id: TaskId },
}

impl From<Rejection> for BoardError {
    fn from(rejection: Rejection) -> Self {
        BoardError::Rejected(rejection.to_string())
    }
}

/// A validated move, ready to be applied optimistically.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveIntent {
    pub move_id: MoveId,
    pub task_id: TaskId,
    pub from: Placement,
    /// Destination with the index already clamped.
    pub to: Placement,
    pub generated_at: DateTime<Utc>,
}

impl MoveIntent {
    /// Validate a drag against `snapshot` and compute the destination.
    ///
    /// Dropping onto a sprint lands in its first column. The index is
    /// clamped to the number of other tasks in the destination, so a
    /// too-large index appends.
    pub fn build(
        snapshot: &Snapshot,
        task_id: TaskId,
        from: Placement,
        request: PlacementRequest,
    ) -> Result<Self, Rejection> {
        let task = snapshot
            .task(task_id)
            .ok_or(Rejection::UnknownTask(task_id))?;

        let requested = snapshot
            .target(request.container_id)
            .ok_or(Rejection::UnknownTarget(request.container_id))?;

        let target = match requested.kind {
            TargetKind::Sprint => {
                if !requested.accepts_placements {
                    return Err(Rejection::TargetClosed(requested.id));
                }
                *snapshot
                    .columns_of(requested.id)
                    .first()
                    .ok_or(Rejection::NoColumns(requested.id))?
            }
            TargetKind::Column { sprint_id } => {
                if snapshot.target(sprint_id).is_none() {
                    return Err(Rejection::UnknownTarget(sprint_id));
                }
                requested
            }
            TargetKind::Backlog => requested,
        };

        if !snapshot.accepts(target.id) {
            return Err(Rejection::TargetClosed(target.id));
        }

        // Neighbours shift the index while a drag is held; only a change of
        // container makes the drag stale.
        if !task.placement.same_container(&from) {
            return Err(Rejection::StalePlacement { task_id });
        }

        let kind = target
            .container_kind()
            .ok_or(Rejection::UnknownTarget(target.id))?;
        let others = snapshot
            .tasks_in(target.id)
            .iter()
            .filter(|t| t.id != task_id)
            .count();

        Ok(Self {
            move_id: Uuid::new_v4(),
            task_id,
            from: task.placement,
            to: Placement {
                kind,
                container_id: target.id,
                index: request.index.min(others),
            },
            generated_at: Utc::now(),
        })
    }

    /// Dropped back where it started.
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}
