use std::future::Future;
use std::sync::Arc;

use boardsync_core::{BoardResult, Loggable, Severity};
use boardsync_domain::{MoveIntent, RollbackToken};
use parking_lot::Mutex;

use crate::api::{RemoteError, ServerTask};
use crate::applier::{OptimisticApplier, RollbackOutcome};
use crate::journal::MoveJournal;
use crate::ledger::{InFlightLedger, InFlightMove};
use crate::merger::ReconciliationMerger;
use crate::notify::{MoveFailure, Notifier};
use crate::store::SnapshotStore;

/// How a move's remote call was settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The server accepted the move. `reconciled` is set when the server's
    /// placement differed and was adopted locally.
    Confirmed { reconciled: bool },
    /// The server accepted, but a newer move for the task is authoritative.
    Superseded,
    /// The call failed and the optimistic move was undone.
    Reverted(MoveFailure),
    /// The call failed after a newer move took over the task. Nothing was
    /// undone and the user was not notified.
    StaleRollbackNoop(RemoteError),
}

/// Drives moves from optimistic apply to server confirmation or rollback.
///
/// Each move is registered in the [`InFlightLedger`] before its remote call
/// is issued. When the call resolves, only the move still registered for the
/// task gets to change the snapshot; older calls for the same task are
/// neutralized by the ledger and by the conditional rollback.
#[derive(Clone)]
pub struct SyncCoordinator {
    store: Arc<SnapshotStore>,
    ledger: Arc<InFlightLedger>,
    applier: OptimisticApplier,
    merger: ReconciliationMerger,
    notifier: Arc<dyn Notifier>,
    journal: Arc<Mutex<MoveJournal>>,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<SnapshotStore>,
        ledger: Arc<InFlightLedger>,
        applier: OptimisticApplier,
        merger: ReconciliationMerger,
        notifier: Arc<dyn Notifier>,
        journal: Arc<Mutex<MoveJournal>>,
    ) -> Self {
        Self {
            store,
            ledger,
            applier,
            merger,
            notifier,
            journal,
        }
    }

    /// Apply `intent` to the store and register it as in flight.
    ///
    /// Both happen under the ledger lock, so a concurrent merge sees the
    /// move either not at all or applied and in flight.
    pub fn start(&self, intent: MoveIntent) -> BoardResult<InFlightSync> {
        let mut entries = self.ledger.lock();
        let token = self.applier.apply(&intent)?;
        let superseded = entries.register(&intent);
        drop(entries);
        Ok(self.track(intent, token, superseded))
    }

    /// Register a move the caller has already applied.
    ///
    /// Runs synchronously so that a second drag of the same task, issued
    /// before this call's future is polled, still supersedes it.
    pub fn begin(&self, intent: MoveIntent, token: RollbackToken) -> InFlightSync {
        let superseded = self.ledger.register(&intent);
        self.track(intent, token, superseded)
    }

    fn track(
        &self,
        intent: MoveIntent,
        token: RollbackToken,
        superseded: Option<InFlightMove>,
    ) -> InFlightSync {
        if let Some(previous) = superseded {
            tracing::info!(
                "Move {} for task {} supersedes move {}",
                intent.move_id,
                intent.task_id,
                previous.move_id
            );
            self.record(
                Severity::Info,
                format!(
                    "Move {} superseded by {} for task {}",
                    previous.move_id, intent.move_id, intent.task_id
                ),
            );
        }

        InFlightSync {
            coordinator: self.clone(),
            intent,
            token,
        }
    }

    /// Register, await the remote call, and settle the move.
    pub async fn sync<F, Fut>(
        &self,
        intent: MoveIntent,
        token: RollbackToken,
        remote_call: F,
    ) -> SyncOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ServerTask, RemoteError>>,
    {
        self.begin(intent, token).finish(remote_call).await
    }

    fn confirm(
        &self,
        intent: MoveIntent,
        token: RollbackToken,
        server_task: ServerTask,
    ) -> SyncOutcome {
        token.discard();

        let mut entries = self.ledger.lock();
        if !entries.resolve(intent.task_id, intent.move_id) {
            drop(entries);
            tracing::debug!(
                "Move {} for task {} confirmed after being superseded",
                intent.move_id,
                intent.task_id
            );
            self.record(
                Severity::Info,
                format!(
                    "Move {} confirmed late for task {}, ignored",
                    intent.move_id, intent.task_id
                ),
            );
            return SyncOutcome::Superseded;
        }

        let reconciled = if server_task.placement != intent.to {
            match self.merger.adopt_locked(&entries, server_task) {
                Ok(changed) => changed,
                Err(e) => {
                    tracing::error!(
                        "Failed to reconcile task {} after move {}: {}",
                        intent.task_id,
                        intent.move_id,
                        e
                    );
                    false
                }
            }
        } else {
            false
        };
        drop(entries);

        tracing::debug!(
            "Move {} confirmed for task {} (reconciled: {})",
            intent.move_id,
            intent.task_id,
            reconciled
        );
        self.record(
            Severity::Info,
            format!(
                "Move {} confirmed for task {}{}",
                intent.move_id,
                intent.task_id,
                if reconciled { ", server placement adopted" } else { "" }
            ),
        );
        SyncOutcome::Confirmed { reconciled }
    }

    fn fail(&self, intent: MoveIntent, token: RollbackToken, err: RemoteError) -> SyncOutcome {
        let title = self
            .store
            .get()
            .task(intent.task_id)
            .map(|task| task.display_name())
            .unwrap_or_else(|| intent.task_id.to_string());

        // The entry stays registered until the rollback has run, so no merge
        // can adopt server state for the task in between.
        let mut entries = self.ledger.lock();
        let rollback = self.applier.rollback(token);
        let current = entries.resolve(intent.task_id, intent.move_id);
        drop(entries);

        if !current {
            tracing::debug!(
                "Move {} for task {} failed after being superseded",
                intent.move_id,
                intent.task_id
            );
        }

        match rollback {
            Ok(RollbackOutcome::Reverted) => {
                let failure = MoveFailure::new(intent.task_id, title, err.into());
                tracing::warn!(
                    "Move {} for task {} rolled back: {}",
                    intent.move_id,
                    intent.task_id,
                    failure
                );
                self.record(
                    Severity::Warn,
                    format!(
                        "Move {} rolled back for task {}: {}",
                        intent.move_id, intent.task_id, failure
                    ),
                );
                self.notifier.notify(&failure);
                SyncOutcome::Reverted(failure)
            }
            Ok(RollbackOutcome::StaleNoop) => {
                tracing::debug!(
                    "Move {} for task {} failed ({}), newer move kept",
                    intent.move_id,
                    intent.task_id,
                    err
                );
                self.record(
                    Severity::Info,
                    format!(
                        "Stale rollback skipped for move {} on task {}: {}",
                        intent.move_id, intent.task_id, err
                    ),
                );
                SyncOutcome::StaleRollbackNoop(err)
            }
            Err(e) => {
                tracing::error!(
                    "Rollback of move {} for task {} failed: {}",
                    intent.move_id,
                    intent.task_id,
                    e
                );
                self.record(
                    Severity::Error,
                    format!(
                        "Rollback error for move {} on task {}: {}",
                        intent.move_id, intent.task_id, e
                    ),
                );
                SyncOutcome::StaleRollbackNoop(err)
            }
        }
    }

    fn record(&self, severity: Severity, message: String) {
        self.journal.lock().log(severity, message);
    }
}

/// A registered move waiting for its remote call.
pub struct InFlightSync {
    coordinator: SyncCoordinator,
    intent: MoveIntent,
    token: RollbackToken,
}

impl InFlightSync {
    pub fn intent(&self) -> &MoveIntent {
        &self.intent
    }

    /// Await the remote call and settle the move. Never retries.
    pub async fn finish<F, Fut>(self, remote_call: F) -> SyncOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ServerTask, RemoteError>>,
    {
        let result = remote_call().await;
        let Self {
            coordinator,
            intent,
            token,
        } = self;

        match result {
            Ok(server_task) => coordinator.confirm(intent, token, server_task),
            Err(err) => coordinator.fail(intent, token, err),
        }
    }
}
