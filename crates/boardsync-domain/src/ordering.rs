//! Index bookkeeping for containers.
//!
//! Container order is never stored on its own: it is derived from each
//! task's `placement.index`, ties broken by task id. These helpers rewrite
//! those indices so every container stays contiguous from zero.

use std::collections::{BTreeMap, BTreeSet};

use crate::{ContainerId, Task, TaskId};

/// Task ids in a container, in render order.
pub fn ordered_ids(tasks: &BTreeMap<TaskId, Task>, container_id: ContainerId) -> Vec<TaskId> {
    let mut members: Vec<&Task> = tasks
        .values()
        .filter(|t| t.placement.container_id == container_id)
        .collect();
    members.sort_by_key(|t| (t.placement.index, t.id));
    members.into_iter().map(|t| t.id).collect()
}

/// Assign indices 0..n following `order`.
pub fn reindex(tasks: &mut BTreeMap<TaskId, Task>, order: &[TaskId]) {
    for (index, id) in order.iter().enumerate() {
        if let Some(task) = tasks.get_mut(id) {
            task.placement.index = index;
        }
    }
}

/// Close gaps and break index ties, keeping the current relative order.
pub fn compact(tasks: &mut BTreeMap<TaskId, Task>, container_id: ContainerId) {
    let order = ordered_ids(tasks, container_id);
    reindex(tasks, &order);
}

/// Like [`compact`], but pinned tasks keep their index whenever it still fits.
///
/// Unpinned tasks fill the remaining slots in their current order. Pinned
/// tasks competing for the same slot are resolved by id.
pub fn normalize(
    tasks: &mut BTreeMap<TaskId, Task>,
    container_id: ContainerId,
    pinned: &BTreeSet<TaskId>,
) {
    let (pins, rest): (Vec<TaskId>, Vec<TaskId>) = ordered_ids(tasks, container_id)
        .into_iter()
        .partition(|id| pinned.contains(id));

    let mut pins = pins.into_iter().peekable();
    let mut rest = rest.into_iter();
    let mut order = Vec::new();

    loop {
        let slot = order.len();
        let pin_due = pins
            .peek()
            .and_then(|id| tasks.get(id))
            .is_some_and(|t| t.placement.index <= slot);

        let next = if pin_due {
            pins.next()
        } else {
            rest.next().or_else(|| pins.next())
        };

        match next {
            Some(id) => order.push(id),
            None => break,
        }
    }

    reindex(tasks, &order);
}

/// Containers currently holding at least one task.
pub fn occupied_containers(tasks: &BTreeMap<TaskId, Task>) -> BTreeSet<ContainerId> {
    tasks.values().map(|t| t.placement.container_id).collect()
}

/// Whether every container's indices run 0..n with no gaps or repeats.
pub fn is_contiguous(tasks: &BTreeMap<TaskId, Task>, container_id: ContainerId) -> bool {
    let mut indices: Vec<usize> = tasks
        .values()
        .filter(|t| t.placement.container_id == container_id)
        .map(|t| t.placement.index)
        .collect();
    indices.sort_unstable();
    indices.iter().enumerate().all(|(expected, index)| expected == *index)
}
