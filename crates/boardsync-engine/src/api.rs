use async_trait::async_trait;
use boardsync_core::BoardError;
use boardsync_domain::{
    BoardPayload, ContainerId, ContainerKind, Placement, Snapshot, SprintId, Task, TaskId,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The server's canonical representation of a task after a move.
pub type ServerTask = Task;

/// Machine-readable refusal reasons from the board service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    CapacityExceeded,
    TargetClosed,
    NotFound,
    Conflict,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::CapacityExceeded => "capacity_exceeded",
            Self::TargetClosed => "target_closed",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
        };
        f.write_str(text)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Rejected by server ({reason}): {message}")]
    Rejected {
        reason: RejectReason,
        message: String,
    },

    #[error("Network failure: {0}")]
    Network(String),
}

impl RemoteError {
    pub fn rejected(reason: RejectReason) -> Self {
        Self::Rejected {
            reason,
            message: String::new(),
        }
    }
}

impl From<RemoteError> for BoardError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Rejected {
                reason: RejectReason::NotFound,
                message,
            } => BoardError::NotFound(message),
            RemoteError::Rejected { .. } => BoardError::Rejected(err.to_string()),
            RemoteError::Network(message) => BoardError::Internal(message),
        }
    }
}

/// Board service operations the engine depends on.
///
/// Implemented by the REST client of the host application.
#[async_trait]
pub trait BoardApi: Send + Sync {
    /// Move a task to the backlog.
    async fn move_to_backlog(&self, task_id: TaskId, index: usize)
        -> Result<ServerTask, RemoteError>;

    /// Move a task into a column of a sprint.
    async fn move_to_sprint(
        &self,
        task_id: TaskId,
        sprint_id: SprintId,
        column_id: ContainerId,
        index: usize,
    ) -> Result<ServerTask, RemoteError>;

    /// Fetch the board's tasks and containers.
    async fn fetch_board(&self) -> Result<BoardPayload, RemoteError>;
}

/// Which remote operation carries a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRoute {
    Backlog {
        index: usize,
    },
    Sprint {
        sprint_id: SprintId,
        column_id: ContainerId,
        index: usize,
    },
}

impl MoveRoute {
    /// Work out the route for a destination placement.
    pub fn resolve(snapshot: &Snapshot, to: Placement) -> Result<Self, BoardError> {
        match to.kind {
            ContainerKind::Backlog => Ok(Self::Backlog { index: to.index }),
            ContainerKind::SprintColumn => {
                let sprint_id = snapshot
                    .target(to.container_id)
                    .and_then(|column| column.parent_sprint())
                    .ok_or_else(|| {
                        BoardError::NotFound(format!("Sprint for column {}", to.container_id))
                    })?;
                Ok(Self::Sprint {
                    sprint_id,
                    column_id: to.container_id,
                    index: to.index,
                })
            }
        }
    }

    pub async fn call(
        self,
        api: &dyn BoardApi,
        task_id: TaskId,
    ) -> Result<ServerTask, RemoteError> {
        match self {
            Self::Backlog { index } => api.move_to_backlog(task_id, index).await,
            Self::Sprint {
                sprint_id,
                column_id,
                index,
            } => api.move_to_sprint(task_id, sprint_id, column_id, index).await,
        }
    }
}
