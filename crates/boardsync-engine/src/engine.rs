use std::sync::Arc;

use boardsync_core::{BoardResult, EngineConfig, LogEntry, Loggable};
use boardsync_domain::{
    BoardPayload, ContainerId, MergeReport, MoveIntent, Placement, PlacementRequest, Rejection,
    Snapshot, Task, TaskId,
};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::api::{BoardApi, MoveRoute};
use crate::applier::OptimisticApplier;
use crate::coordinator::{InFlightSync, SyncCoordinator, SyncOutcome};
use crate::error::EngineError;
use crate::journal::MoveJournal;
use crate::ledger::{InFlightLedger, InFlightMove};
use crate::merger::ReconciliationMerger;
use crate::notify::Notifier;
use crate::refresh::RefreshPoller;
use crate::store::{ChangeReason, SnapshotChanged, SnapshotStore};

/// One shared engine per board view.
///
/// Views read [`PlacementEngine::snapshot`], subscribe to change events, and
/// dispatch drags through [`PlacementEngine::move_task`]. The move is applied
/// before `move_task` returns; the returned [`PendingMove`] carries the
/// remote call.
pub struct PlacementEngine {
    config: EngineConfig,
    store: Arc<SnapshotStore>,
    ledger: Arc<InFlightLedger>,
    merger: ReconciliationMerger,
    coordinator: SyncCoordinator,
    api: Arc<dyn BoardApi>,
    journal: Arc<Mutex<MoveJournal>>,
}

impl PlacementEngine {
    pub fn new(
        api: Arc<dyn BoardApi>,
        notifier: Arc<dyn Notifier>,
        config: EngineConfig,
    ) -> Self {
        let store = Arc::new(SnapshotStore::new(
            Snapshot::new(),
            config.effective_event_capacity(),
        ));
        let ledger = Arc::new(InFlightLedger::new());
        let applier = OptimisticApplier::new(store.clone());
        let merger = ReconciliationMerger::new(store.clone(), ledger.clone());
        let journal = Arc::new(Mutex::new(MoveJournal::new(
            config.effective_journal_capacity(),
        )));
        let coordinator = SyncCoordinator::new(
            store.clone(),
            ledger.clone(),
            applier,
            merger.clone(),
            notifier,
            journal.clone(),
        );

        Self {
            config,
            store,
            ledger,
            merger,
            coordinator,
            api,
            journal,
        }
    }

    /// Build an engine and load the board from the server.
    pub async fn bootstrap(
        api: Arc<dyn BoardApi>,
        notifier: Arc<dyn Notifier>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let engine = Self::new(api, notifier, config);
        let payload = engine.api.fetch_board().await?;
        engine.load(payload)?;
        Ok(engine)
    }

    /// Replace the whole snapshot with `payload`.
    pub fn load(&self, payload: BoardPayload) -> BoardResult<u64> {
        let snapshot = Snapshot::from_payload(payload);
        snapshot.validate()?;
        let version = self.store.replace(snapshot, ChangeReason::Loaded);
        tracing::info!(
            "Loaded board: {} tasks (v{})",
            self.store.get().task_count(),
            version
        );
        Ok(version)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.get()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SnapshotChanged> {
        self.store.subscribe()
    }

    pub fn tasks_in(&self, container_id: ContainerId) -> Vec<Task> {
        self.store.tasks_in(container_id)
    }

    pub fn begin_drag(&self, task_id: TaskId) -> Result<(), EngineError> {
        if self.store.get().task(task_id).is_none() {
            return Err(Rejection::UnknownTask(task_id).into());
        }
        Ok(self.store.set_dragging(Some(task_id))?)
    }

    pub fn end_drag(&self) -> BoardResult<()> {
        self.store.set_dragging(None)
    }

    /// Validate a drop, apply it locally, and register it as in flight.
    ///
    /// Returns `Ok(None)` when the task was dropped where it started. A
    /// rejected drop leaves the snapshot untouched.
    pub fn move_task(
        &self,
        task_id: TaskId,
        from: Placement,
        request: PlacementRequest,
    ) -> Result<Option<PendingMove>, EngineError> {
        let snapshot = self.store.get();
        let intent = MoveIntent::build(&snapshot, task_id, from, request)?;
        if intent.is_noop() {
            tracing::debug!("Task {} dropped in place, nothing to sync", task_id);
            return Ok(None);
        }

        let route = MoveRoute::resolve(&snapshot, intent.to)?;
        let sync = self.coordinator.start(intent)?;

        Ok(Some(PendingMove {
            sync,
            route,
            api: self.api.clone(),
        }))
    }

    /// Fetch the board and merge it, keeping in-flight moves and moves that
    /// settled while the fetch was outstanding.
    pub async fn refresh(&self) -> Result<MergeReport, EngineError> {
        let mark = self.merger.mark();
        let payload = self.api.fetch_board().await?;
        Ok(self.merger.merge_since(payload, &mark)?)
    }

    pub fn merge(&self, payload: BoardPayload) -> BoardResult<MergeReport> {
        self.merger.merge(payload)
    }

    /// Poll the server every `refresh_interval` until the poller is dropped.
    pub fn start_refresh(self: &Arc<Self>) -> RefreshPoller {
        RefreshPoller::spawn(self.clone(), self.config.refresh_interval())
    }

    pub fn in_flight(&self, task_id: TaskId) -> Option<InFlightMove> {
        self.ledger.get(task_id)
    }

    pub fn in_flight_count(&self) -> usize {
        self.ledger.len()
    }

    pub fn journal(&self) -> Vec<LogEntry> {
        self.journal.lock().entries().to_vec()
    }
}

/// A move that has been applied locally and awaits its remote call.
///
/// Dropping it without resolving leaves the optimistic placement and the
/// ledger entry in place until a newer move or a refresh replaces them.
pub struct PendingMove {
    sync: InFlightSync,
    route: MoveRoute,
    api: Arc<dyn BoardApi>,
}

impl PendingMove {
    pub fn intent(&self) -> &MoveIntent {
        self.sync.intent()
    }

    pub fn route(&self) -> MoveRoute {
        self.route
    }

    /// Issue the remote call and settle the move.
    pub async fn resolve(self) -> SyncOutcome {
        let Self { sync, route, api } = self;
        let task_id = sync.intent().task_id;
        sync.finish(|| async move { route.call(api.as_ref(), task_id).await })
            .await
    }

    /// Resolve on the runtime, fire-and-forget.
    pub fn spawn(self) -> JoinHandle<SyncOutcome> {
        tokio::spawn(self.resolve())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use boardsync_domain::{PlacementTarget, SprintId};

    use crate::api::{RejectReason, RemoteError, ServerTask};
    use crate::notify::{ChannelNotifier, TracingNotifier};

    /// Accepts every move at the requested spot unless `reject` is set.
    struct EchoApi {
        board: BoardPayload,
        reject: Option<RejectReason>,
    }

    impl EchoApi {
        fn answer(
            &self,
            task_id: TaskId,
            placement: Placement,
        ) -> Result<ServerTask, RemoteError> {
            if let Some(reason) = self.reject {
                return Err(RemoteError::rejected(reason));
            }
            let mut task = self
                .board
                .tasks
                .iter()
                .find(|t| t.id == task_id)
                .cloned()
                .ok_or_else(|| RemoteError::rejected(RejectReason::NotFound))?;
            task.placement = placement;
            Ok(task)
        }
    }

    #[async_trait]
    impl BoardApi for EchoApi {
        async fn move_to_backlog(
            &self,
            task_id: TaskId,
            index: usize,
        ) -> Result<ServerTask, RemoteError> {
            let backlog = self.board.containers[0].id;
            self.answer(task_id, Placement::backlog(backlog, index))
        }

        async fn move_to_sprint(
            &self,
            task_id: TaskId,
            _sprint_id: SprintId,
            column_id: ContainerId,
            index: usize,
        ) -> Result<ServerTask, RemoteError> {
            self.answer(task_id, Placement::column(column_id, index))
        }

        async fn fetch_board(&self) -> Result<BoardPayload, RemoteError> {
            Ok(self.board.clone())
        }
    }

    fn board() -> (BoardPayload, PlacementTarget, PlacementTarget) {
        let backlog = PlacementTarget::backlog("Backlog".to_string());
        let sprint = PlacementTarget::sprint("Sprint".to_string());
        let column = PlacementTarget::column(sprint.id, "Todo".to_string(), 0);
        let tasks: Vec<Task> = (0..3)
            .map(|i| Task::new(format!("Task {}", i), Placement::backlog(backlog.id, i)))
            .collect();
        (
            BoardPayload::new(tasks, vec![backlog.clone(), sprint, column.clone()]),
            backlog,
            column,
        )
    }

    async fn engine(
        reject: Option<RejectReason>,
    ) -> (PlacementEngine, PlacementTarget, PlacementTarget) {
        let (payload, backlog, column) = board();
        let api = Arc::new(EchoApi {
            board: payload,
            reject,
        });
        let engine =
            PlacementEngine::bootstrap(api, Arc::new(TracingNotifier), EngineConfig::default())
                .await
                .unwrap();
        (engine, backlog, column)
    }

    #[tokio::test]
    async fn test_bootstrap_loads_board() {
        let (engine, backlog, _) = engine(None).await;
        assert_eq!(engine.tasks_in(backlog.id).len(), 3);
        assert!(engine.snapshot().version() > 0);
    }

    #[tokio::test]
    async fn test_move_is_visible_before_resolve() {
        let (engine, backlog, column) = engine(None).await;
        let task = engine.tasks_in(backlog.id)[1].clone();

        let pending = engine
            .move_task(task.id, task.placement, PlacementRequest::new(column.id, 0))
            .unwrap()
            .unwrap();

        assert_eq!(engine.tasks_in(column.id)[0].id, task.id);
        assert_eq!(engine.in_flight_count(), 1);

        let outcome = pending.resolve().await;
        assert_eq!(outcome, SyncOutcome::Confirmed { reconciled: false });
        assert_eq!(engine.in_flight_count(), 0);
        assert!(!engine.journal().is_empty());
    }

    #[tokio::test]
    async fn test_drop_in_place_is_not_synced() {
        let (engine, backlog, _) = engine(None).await;
        let task = engine.tasks_in(backlog.id)[0].clone();
        let version = engine.snapshot().version();

        let pending = engine
            .move_task(task.id, task.placement, PlacementRequest::new(backlog.id, 0))
            .unwrap();

        assert!(pending.is_none());
        assert_eq!(engine.snapshot().version(), version);
    }

    #[tokio::test]
    async fn test_rejected_drop_changes_nothing() {
        let (engine, backlog, _) = engine(None).await;
        let task = engine.tasks_in(backlog.id)[0].clone();
        let ghost = uuid::Uuid::new_v4();

        let err = engine
            .move_task(task.id, task.placement, PlacementRequest::new(ghost, 0))
            .err()
            .unwrap();

        assert!(err.is_rejection());
        assert!(matches!(
            err,
            EngineError::Rejected(Rejection::UnknownTarget(id)) if id == ghost
        ));
        assert_eq!(engine.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_spawned_failure_notifies() {
        let (payload, backlog, column) = board();
        let api = Arc::new(EchoApi {
            board: payload.clone(),
            reject: Some(RejectReason::TargetClosed),
        });
        let (notifier, mut failures) = ChannelNotifier::new();
        let engine = PlacementEngine::new(api, Arc::new(notifier), EngineConfig::default());
        engine.load(payload).unwrap();
        let task = engine.tasks_in(backlog.id)[0].clone();

        let handle = engine
            .move_task(task.id, task.placement, PlacementRequest::new(column.id, 0))
            .unwrap()
            .unwrap()
            .spawn();

        assert!(matches!(handle.await.unwrap(), SyncOutcome::Reverted(_)));
        assert_eq!(failures.recv().await.unwrap().task_id, task.id);
        assert!(engine.tasks_in(column.id).is_empty());
    }

    #[tokio::test]
    async fn test_drag_state() {
        let (engine, backlog, _) = engine(None).await;
        let task = engine.tasks_in(backlog.id)[0].clone();

        engine.begin_drag(task.id).unwrap();
        assert_eq!(engine.snapshot().dragging(), Some(task.id));
        engine.end_drag().unwrap();
        assert_eq!(engine.snapshot().dragging(), None);

        assert!(engine.begin_drag(uuid::Uuid::new_v4()).is_err());
    }
}
