use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::ContainerKind;

pub type ContainerId = Uuid;
pub type SprintId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetKind {
    Backlog,
    Sprint,
    Column { sprint_id: SprintId },
}

/// A container tasks can be dropped onto.
///
/// Backlog and sprints are top level; every column belongs to one sprint.
/// Whether a target accepts placements is decided by the sprint lifecycle
/// service and only mirrored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementTarget {
    pub id: ContainerId,
    pub kind: TargetKind,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_accepts")]
    pub accepts_placements: bool,
}

fn default_accepts() -> bool {
    true
}

impl PlacementTarget {
    pub fn backlog(name: String) -> Self {
        Self::with_kind(TargetKind::Backlog, name, 0)
    }

    pub fn sprint(name: String) -> Self {
        Self::with_kind(TargetKind::Sprint, name, 0)
    }

    pub fn column(sprint_id: SprintId, name: String, position: i32) -> Self {
        Self::with_kind(TargetKind::Column { sprint_id }, name, position)
    }

    fn with_kind(kind: TargetKind, name: String, position: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            name,
            position,
            accepts_placements: true,
        }
    }

    pub fn closed(mut self) -> Self {
        self.accepts_placements = false;
        self
    }

    pub fn is_top_level(&self) -> bool {
        !matches!(self.kind, TargetKind::Column { .. })
    }

    pub fn parent_sprint(&self) -> Option<SprintId> {
        match self.kind {
            TargetKind::Column { sprint_id } => Some(sprint_id),
            _ => None,
        }
    }

    /// The kind of placement a task dropped here receives. Sprints hold no
    /// tasks directly.
    pub fn container_kind(&self) -> Option<ContainerKind> {
        match self.kind {
            TargetKind::Backlog => Some(ContainerKind::Backlog),
            TargetKind::Column { .. } => Some(ContainerKind::SprintColumn),
            TargetKind::Sprint => None,
        }
    }
}
