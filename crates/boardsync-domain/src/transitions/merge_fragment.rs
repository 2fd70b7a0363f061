use std::collections::{BTreeMap, BTreeSet};

use boardsync_core::BoardResult;

use super::Transition;
use crate::ordering;
use crate::{BoardPayload, ContainerId, PlacementTarget, Snapshot, Task, TaskId};

/// What a merge did, per task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub adopted: Vec<TaskId>,
    pub kept_in_flight: Vec<TaskId>,
    pub inserted: Vec<TaskId>,
    pub removed: Vec<TaskId>,
}

impl MergeReport {
    pub fn is_empty(&self) -> bool {
        self.adopted.is_empty()
            && self.kept_in_flight.is_empty()
            && self.inserted.is_empty()
            && self.removed.is_empty()
    }
}

/// Fold server data into the local snapshot without clobbering moves that
/// are still in flight.
///
/// - Known task, move in flight: local placement kept, other fields refreshed.
/// - Known task, nothing in flight: server placement adopted.
/// - Only on the server: inserted.
/// - Only local and nothing in flight: removed.
///
/// Afterwards every container is re-indexed, keeping in-flight tasks at their
/// optimistic index where possible.
pub struct MergeFragment {
    pub fragment: BoardPayload,
    pub in_flight: BTreeSet<TaskId>,
}

impl MergeFragment {
    pub fn new(fragment: BoardPayload, in_flight: BTreeSet<TaskId>) -> Self {
        Self {
            fragment,
            in_flight,
        }
    }

    pub fn merge(&self, snapshot: &Snapshot) -> BoardResult<(Snapshot, MergeReport)> {
        let local = snapshot.tasks_map();
        let mut report = MergeReport::default();
        let mut tasks: BTreeMap<TaskId, Task> = BTreeMap::new();
        let mut stamps = snapshot.stamps_map().clone();
        let mut touched: BTreeSet<ContainerId> = snapshot.occupied_containers();

        for server_task in &self.fragment.tasks {
            let id = server_task.id;
            match local.get(&id) {
                Some(local_task) if self.in_flight.contains(&id) => {
                    let mut kept = server_task.clone();
                    kept.placement = local_task.placement;
                    tasks.insert(id, kept);
                    report.kept_in_flight.push(id);
                }
                Some(_) => {
                    tasks.insert(id, server_task.clone());
                    stamps.remove(&id);
                    report.adopted.push(id);
                }
                None => {
                    tasks.insert(id, server_task.clone());
                    report.inserted.push(id);
                }
            }
            touched.insert(server_task.placement.container_id);
        }

        for (id, local_task) in local {
            if tasks.contains_key(id) {
                continue;
            }
            if self.in_flight.contains(id) {
                tasks.insert(*id, local_task.clone());
                report.kept_in_flight.push(*id);
            } else {
                stamps.remove(id);
                report.removed.push(*id);
            }
        }

        for container_id in touched {
            ordering::normalize(&mut tasks, container_id, &self.in_flight);
        }

        let targets: BTreeMap<ContainerId, PlacementTarget> = if self.fragment.containers.is_empty()
        {
            snapshot.targets_map().clone()
        } else {
            self.fragment
                .containers
                .iter()
                .map(|target| (target.id, target.clone()))
                .collect()
        };

        let dragging = snapshot.dragging().filter(|id| tasks.contains_key(id));

        Ok((
            Snapshot::from_parts(tasks, targets, stamps, dragging),
            report,
        ))
    }
}

impl Transition for MergeFragment {
    fn transition(&self, snapshot: &Snapshot) -> BoardResult<Option<Snapshot>> {
        self.merge(snapshot).map(|(next, _)| Some(next))
    }

    fn description(&self) -> String {
        format!(
            "Merge {} tasks and {} containers from server",
            self.fragment.tasks.len(),
            self.fragment.containers.len()
        )
    }
}

/// Take the server's canonical version of one confirmed task.
///
/// Used when a move is confirmed with a placement that differs from the
/// optimistic one. Only this task and the containers it leaves or enters are
/// re-indexed; other in-flight tasks keep their optimistic index.
pub struct AdoptServerTask {
    pub task: Task,
    pub in_flight: BTreeSet<TaskId>,
}

impl AdoptServerTask {
    pub fn new(task: Task, in_flight: BTreeSet<TaskId>) -> Self {
        Self { task, in_flight }
    }
}

impl Transition for AdoptServerTask {
    fn transition(&self, snapshot: &Snapshot) -> BoardResult<Option<Snapshot>> {
        let id = self.task.id;
        if snapshot.task(id) == Some(&self.task) {
            return Ok(None);
        }

        let mut tasks = snapshot.tasks_map().clone();
        let previous = tasks.insert(id, self.task.clone());

        let mut pinned = self.in_flight.clone();
        pinned.insert(id);

        if let Some(previous) = previous {
            if previous.placement.container_id != self.task.placement.container_id {
                ordering::normalize(&mut tasks, previous.placement.container_id, &pinned);
            }
        }
        ordering::normalize(&mut tasks, self.task.placement.container_id, &pinned);

        let mut stamps = snapshot.stamps_map().clone();
        stamps.remove(&id);

        Ok(Some(Snapshot::from_parts(
            tasks,
            snapshot.targets_map().clone(),
            stamps,
            snapshot.dragging(),
        )))
    }

    fn description(&self) -> String {
        format!(
            "Adopt server placement for task {} in container {}",
            self.task.id, self.task.placement.container_id
        )
    }
}
