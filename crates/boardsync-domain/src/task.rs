use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::target::ContainerId;

pub type TaskId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Backlog,
    SprintColumn,
}

/// Where a task sits: a container and its zero-based index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub kind: ContainerKind,
    pub container_id: ContainerId,
    pub index: usize,
}

impl Placement {
    pub fn backlog(container_id: ContainerId, index: usize) -> Self {
        Self {
            kind: ContainerKind::Backlog,
            container_id,
            index,
        }
    }

    pub fn column(container_id: ContainerId, index: usize) -> Self {
        Self {
            kind: ContainerKind::SprintColumn,
            container_id,
            index,
        }
    }

    pub fn at(self, index: usize) -> Self {
        Self { index, ..self }
    }

    pub fn same_container(&self, other: &Placement) -> bool {
        self.kind == other.kind && self.container_id == other.container_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub title: String,
    pub placement: Placement,
    /// Everything else the board service sends (type, assignees, labels).
    #[serde(default, flatten)]
    pub attributes: Map<String, Value>,
}

impl Task {
    pub fn new(title: String, placement: Placement) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            placement,
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: Value) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }

    pub fn container_id(&self) -> ContainerId {
        self.placement.container_id
    }

    pub fn display_name(&self) -> String {
        if self.title.is_empty() {
            self.id.to_string()
        } else {
            self.title.clone()
        }
    }
}
