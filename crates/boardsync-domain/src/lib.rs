pub mod intent;
pub mod ordering;
pub mod snapshot;
pub mod target;
pub mod task;
pub mod transitions;

pub use intent::{MoveIntent, PlacementRequest, Rejection};
pub use snapshot::{BoardPayload, MoveId, Snapshot};
pub use target::{ContainerId, PlacementTarget, SprintId, TargetKind};
pub use task::{ContainerKind, Placement, Task, TaskId};
pub use transitions::{
    AdoptServerTask, ApplyMove, MergeFragment, MergeReport, RevertMove, RollbackToken, Transition,
};
