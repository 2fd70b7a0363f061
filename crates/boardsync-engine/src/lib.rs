pub mod api;
pub mod applier;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod journal;
pub mod ledger;
pub mod merger;
pub mod notify;
pub mod refresh;
pub mod store;

pub use api::{BoardApi, MoveRoute, RejectReason, RemoteError, ServerTask};
pub use applier::{OptimisticApplier, RollbackOutcome};
pub use coordinator::{InFlightSync, SyncCoordinator, SyncOutcome};
pub use engine::{PendingMove, PlacementEngine};
pub use error::EngineError;
pub use journal::MoveJournal;
pub use ledger::{InFlightLedger, InFlightMove, LedgerGuard};
pub use merger::{FetchMark, ReconciliationMerger};
pub use notify::{ChannelNotifier, MoveFailure, MoveFailureKind, Notifier, TracingNotifier};
pub use refresh::RefreshPoller;
pub use store::{ChangeReason, SnapshotChanged, SnapshotStore};
