//! Versioned, immutable view of a board's tasks and placement targets.
//!
//! A `Snapshot` is never edited in place once published: every apply,
//! rollback and merge produces a new snapshot from the previous one. The
//! per-container task lists are derived from the task map on demand, so
//! there is a single source of truth for order.

use std::collections::{BTreeMap, BTreeSet};

use boardsync_core::{BoardError, BoardResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ordering;
use crate::{ContainerId, PlacementTarget, SprintId, Task, TaskId, TargetKind};

/// Identity of one optimistic move.
pub type MoveId = Uuid;

/// Board data as delivered by the board-fetch endpoint.
///
/// Both fields default so partial refresh payloads deserialize.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardPayload {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub containers: Vec<PlacementTarget>,
}

impl BoardPayload {
    pub fn new(tasks: Vec<Task>, containers: Vec<PlacementTarget>) -> Self {
        Self { tasks, containers }
    }

    pub fn from_json(data: &str) -> BoardResult<Self> {
        serde_json::from_str(data).map_err(|e| BoardError::Serialization(e.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    version: u64,
    tasks: BTreeMap<TaskId, Task>,
    targets: BTreeMap<ContainerId, PlacementTarget>,
    /// Last optimistic move applied to each task.
    move_stamps: BTreeMap<TaskId, MoveId>,
    /// Task currently being dragged. View state only.
    dragging: Option<TaskId>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from a fetch payload, compacting every container.
    pub fn from_payload(payload: BoardPayload) -> Self {
        let targets = payload
            .containers
            .into_iter()
            .map(|target| (target.id, target))
            .collect();
        let mut tasks: BTreeMap<TaskId, Task> =
            payload.tasks.into_iter().map(|task| (task.id, task)).collect();

        for container_id in ordering::occupied_containers(&tasks) {
            ordering::compact(&mut tasks, container_id);
        }

        Self {
            version: 0,
            tasks,
            targets,
            move_stamps: BTreeMap::new(),
            dragging: None,
        }
    }

    pub(crate) fn from_parts(
        tasks: BTreeMap<TaskId, Task>,
        targets: BTreeMap<ContainerId, PlacementTarget>,
        move_stamps: BTreeMap<TaskId, MoveId>,
        dragging: Option<TaskId>,
    ) -> Self {
        Self {
            version: 0,
            tasks,
            targets,
            move_stamps,
            dragging,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn with_dragging(mut self, dragging: Option<TaskId>) -> Self {
        self.dragging = dragging;
        self
    }

    pub fn dragging(&self) -> Option<TaskId> {
        self.dragging
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn target(&self, id: ContainerId) -> Option<&PlacementTarget> {
        self.targets.get(&id)
    }

    pub fn targets(&self) -> impl Iterator<Item = &PlacementTarget> {
        self.targets.values()
    }

    pub fn move_stamp(&self, task_id: TaskId) -> Option<MoveId> {
        self.move_stamps.get(&task_id).copied()
    }

    /// Tasks in a container, ordered by index then id.
    pub fn tasks_in(&self, container_id: ContainerId) -> Vec<&Task> {
        ordering::ordered_ids(&self.tasks, container_id)
            .into_iter()
            .filter_map(|id| self.tasks.get(&id))
            .collect()
    }

    /// Columns of a sprint, ordered by position then id.
    pub fn columns_of(&self, sprint_id: SprintId) -> Vec<&PlacementTarget> {
        let mut columns: Vec<&PlacementTarget> = self
            .targets
            .values()
            .filter(|t| t.kind == TargetKind::Column { sprint_id })
            .collect();
        columns.sort_by_key(|c| (c.position, c.id));
        columns
    }

    /// Whether a target takes new placements. A column also needs its
    /// sprint to accept. Unknown targets accept nothing.
    pub fn accepts(&self, container_id: ContainerId) -> bool {
        let Some(target) = self.targets.get(&container_id) else {
            return false;
        };
        if !target.accepts_placements {
            return false;
        }
        match target.parent_sprint() {
            Some(sprint_id) => self
                .targets
                .get(&sprint_id)
                .is_some_and(|sprint| sprint.accepts_placements),
            None => true,
        }
    }

    /// Check that every container is indexed 0..n with no gaps or repeats.
    pub fn validate(&self) -> BoardResult<()> {
        for container_id in ordering::occupied_containers(&self.tasks) {
            if !ordering::is_contiguous(&self.tasks, container_id) {
                return Err(BoardError::Validation(format!(
                    "Container {} is not contiguously indexed",
                    container_id
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn tasks_map(&self) -> &BTreeMap<TaskId, Task> {
        &self.tasks
    }

    pub(crate) fn targets_map(&self) -> &BTreeMap<ContainerId, PlacementTarget> {
        &self.targets
    }

    pub(crate) fn stamps_map(&self) -> &BTreeMap<TaskId, MoveId> {
        &self.move_stamps
    }

    pub(crate) fn occupied_containers(&self) -> BTreeSet<ContainerId> {
        ordering::occupied_containers(&self.tasks)
    }
}
