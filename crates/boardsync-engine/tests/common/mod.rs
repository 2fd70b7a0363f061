#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use boardsync_domain::{
    BoardPayload, ContainerId, Placement, PlacementTarget, SprintId, Task, TaskId,
};
use boardsync_engine::{BoardApi, RemoteError, ServerTask};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

/// Backlog, one sprint with two columns, and backlog tasks `t0..tn`.
pub struct Board {
    pub backlog: PlacementTarget,
    pub sprint: PlacementTarget,
    pub c1: PlacementTarget,
    pub c2: PlacementTarget,
    pub tasks: Vec<Task>,
}

impl Board {
    pub fn new(task_count: usize) -> Self {
        let backlog = PlacementTarget::backlog("Backlog".to_string());
        let sprint = PlacementTarget::sprint("Sprint 1".to_string());
        let c1 = PlacementTarget::column(sprint.id, "Todo".to_string(), 0);
        let c2 = PlacementTarget::column(sprint.id, "Doing".to_string(), 1);
        let tasks = (0..task_count)
            .map(|i| Task::new(format!("t{}", i), Placement::backlog(backlog.id, i)))
            .collect();
        Self {
            backlog,
            sprint,
            c1,
            c2,
            tasks,
        }
    }

    pub fn payload(&self) -> BoardPayload {
        BoardPayload::new(self.tasks.clone(), self.containers())
    }

    pub fn containers(&self) -> Vec<PlacementTarget> {
        vec![
            self.backlog.clone(),
            self.sprint.clone(),
            self.c1.clone(),
            self.c2.clone(),
        ]
    }

    pub fn task(&self, title: &str) -> &Task {
        self.tasks
            .iter()
            .find(|t| t.title == title)
            .unwrap_or_else(|| panic!("no task titled {}", title))
    }

    /// The task as the server would return it after accepting `call`.
    pub fn confirmed(&self, call: &Call) -> ServerTask {
        let mut task = self
            .tasks
            .iter()
            .find(|t| t.id == call.task_id())
            .cloned()
            .unwrap_or_else(|| panic!("unknown task {}", call.task_id()));
        task.placement = match *call {
            Call::Backlog { index, .. } => Placement::backlog(self.backlog.id, index),
            Call::Sprint {
                column_id, index, ..
            } => Placement::column(column_id, index),
        };
        task
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Backlog {
        task_id: TaskId,
        index: usize,
    },
    Sprint {
        task_id: TaskId,
        sprint_id: SprintId,
        column_id: ContainerId,
        index: usize,
    },
}

impl Call {
    pub fn task_id(&self) -> TaskId {
        match self {
            Call::Backlog { task_id, .. } | Call::Sprint { task_id, .. } => *task_id,
        }
    }
}

/// A remote move call the test resolves by hand.
pub struct PendingCall {
    pub call: Call,
    reply: oneshot::Sender<Result<ServerTask, RemoteError>>,
}

impl PendingCall {
    pub fn task_id(&self) -> TaskId {
        self.call.task_id()
    }

    pub fn reply(self, result: Result<ServerTask, RemoteError>) {
        let _ = self.reply.send(result);
    }
}

/// `BoardApi` whose move calls block until the test replies to them.
pub struct ScriptedApi {
    calls: mpsc::UnboundedSender<PendingCall>,
    board: Mutex<BoardPayload>,
}

impl ScriptedApi {
    pub fn new(board: BoardPayload) -> (Arc<Self>, mpsc::UnboundedReceiver<PendingCall>) {
        let (calls, rx) = mpsc::unbounded_channel();
        let api = Arc::new(Self {
            calls,
            board: Mutex::new(board),
        });
        (api, rx)
    }

    /// What the next `fetch_board` returns.
    pub fn set_board(&self, board: BoardPayload) {
        *self.board.lock() = board;
    }

    async fn submit(&self, call: Call) -> Result<ServerTask, RemoteError> {
        let (reply, rx) = oneshot::channel();
        self.calls
            .send(PendingCall { call, reply })
            .map_err(|_| RemoteError::Network("script closed".to_string()))?;
        rx.await
            .unwrap_or_else(|_| Err(RemoteError::Network("reply dropped".to_string())))
    }
}

#[async_trait]
impl BoardApi for ScriptedApi {
    async fn move_to_backlog(
        &self,
        task_id: TaskId,
        index: usize,
    ) -> Result<ServerTask, RemoteError> {
        self.submit(Call::Backlog { task_id, index }).await
    }

    async fn move_to_sprint(
        &self,
        task_id: TaskId,
        sprint_id: SprintId,
        column_id: ContainerId,
        index: usize,
    ) -> Result<ServerTask, RemoteError> {
        self.submit(Call::Sprint {
            task_id,
            sprint_id,
            column_id,
            index,
        })
        .await
    }

    async fn fetch_board(&self) -> Result<BoardPayload, RemoteError> {
        Ok(self.board.lock().clone())
    }
}
