use boardsync_core::{BoardError, BoardResult};

use super::{relocate, RollbackToken, Transition};
use crate::{MoveIntent, Snapshot};

/// Optimistically move a task to its intent's destination.
pub struct ApplyMove {
    pub intent: MoveIntent,
}

impl ApplyMove {
    pub fn new(intent: MoveIntent) -> Self {
        Self { intent }
    }

    /// Produce the moved snapshot plus the token that can undo it.
    pub fn apply(&self, snapshot: &Snapshot) -> BoardResult<(Snapshot, RollbackToken)> {
        let intent = &self.intent;
        let mut tasks = snapshot.tasks_map().clone();
        let prior = tasks
            .get(&intent.task_id)
            .map(|t| t.placement)
            .ok_or_else(|| BoardError::NotFound(format!("Task {}", intent.task_id)))?;

        let landed = relocate(&mut tasks, intent.task_id, intent.to)?;

        let mut stamps = snapshot.stamps_map().clone();
        let prior_stamp = stamps.insert(intent.task_id, intent.move_id);

        let next = Snapshot::from_parts(
            tasks,
            snapshot.targets_map().clone(),
            stamps,
            snapshot.dragging(),
        );
        let token = RollbackToken::new(
            intent.move_id,
            intent.task_id,
            prior,
            prior_stamp,
            snapshot.version(),
            landed,
        );
        Ok((next, token))
    }
}

impl Transition for ApplyMove {
    fn transition(&self, snapshot: &Snapshot) -> BoardResult<Option<Snapshot>> {
        self.apply(snapshot).map(|(next, _)| Some(next))
    }

    fn description(&self) -> String {
        format!(
            "Move task {} to container {} at {}",
            self.intent.task_id, self.intent.to.container_id, self.intent.to.index
        )
    }
}
