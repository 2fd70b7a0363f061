use boardsync_domain::TaskId;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::api::{RejectReason, RemoteError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveFailureKind {
    RemoteRejected(RejectReason),
    NetworkFailure(String),
}

impl From<RemoteError> for MoveFailureKind {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Rejected { reason, .. } => Self::RemoteRejected(reason),
            RemoteError::Network(message) => Self::NetworkFailure(message),
        }
    }
}

/// User-facing notice for a move that was rolled back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", self.message())]
pub struct MoveFailure {
    pub task_id: TaskId,
    pub title: String,
    pub kind: MoveFailureKind,
}

impl MoveFailure {
    pub fn new(task_id: TaskId, title: impl Into<String>, kind: MoveFailureKind) -> Self {
        Self {
            task_id,
            title: title.into(),
            kind,
        }
    }

    pub fn message(&self) -> String {
        match &self.kind {
            MoveFailureKind::RemoteRejected(reason) => {
                format!("Move not allowed for \"{}\" ({})", self.title, reason)
            }
            MoveFailureKind::NetworkFailure(_) => {
                format!("Couldn't reach server, \"{}\" was moved back", self.title)
            }
        }
    }
}

/// Surface for user-facing move failures.
pub trait Notifier: Send + Sync {
    fn notify(&self, failure: &MoveFailure);
}

/// Forwards failures to a channel drained by the view layer.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<MoveFailure>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MoveFailure>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, failure: &MoveFailure) {
        if self.tx.send(failure.clone()).is_err() {
            tracing::debug!("Notice for task {} dropped: no receiver", failure.task_id);
        }
    }
}

/// Logs failures only. For headless hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, failure: &MoveFailure) {
        tracing::warn!(task_id = %failure.task_id, "{}", failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_messages_differ_by_kind() {
        let id = Uuid::new_v4();
        let rejected = MoveFailure::new(
            id,
            "Fix login",
            MoveFailureKind::RemoteRejected(RejectReason::CapacityExceeded),
        );
        let offline = MoveFailure::new(
            id,
            "Fix login",
            MoveFailureKind::NetworkFailure("timeout".to_string()),
        );

        assert!(rejected.to_string().contains("Move not allowed"));
        assert!(rejected.to_string().contains("capacity_exceeded"));
        assert!(offline.to_string().contains("Couldn't reach server"));
        assert!(offline.to_string().contains("Fix login"));
    }

    #[test]
    fn test_kind_from_remote_error() {
        let kind: MoveFailureKind = RemoteError::rejected(RejectReason::Conflict).into();
        assert_eq!(kind, MoveFailureKind::RemoteRejected(RejectReason::Conflict));

        let kind: MoveFailureKind = RemoteError::Network("reset".to_string()).into();
        assert_eq!(kind, MoveFailureKind::NetworkFailure("reset".to_string()));
    }

    #[tokio::test]
    async fn test_channel_notifier_forwards() {
        let (notifier, mut rx) = ChannelNotifier::new();
        let failure = MoveFailure::new(
            Uuid::new_v4(),
            "Task",
            MoveFailureKind::NetworkFailure("down".to_string()),
        );

        notifier.notify(&failure);
        assert_eq!(rx.recv().await, Some(failure));
    }

    #[test]
    fn test_channel_notifier_survives_closed_receiver() {
        let (notifier, rx) = ChannelNotifier::new();
        drop(rx);
        notifier.notify(&MoveFailure::new(
            Uuid::new_v4(),
            "Task",
            MoveFailureKind::RemoteRejected(RejectReason::NotFound),
        ));
    }
}
