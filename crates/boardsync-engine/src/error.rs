use boardsync_core::BoardError;
use boardsync_domain::Rejection;
use thiserror::Error;

use crate::api::RemoteError;

/// Errors returned by [`crate::PlacementEngine`] operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The drag was refused; nothing changed.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Board(#[from] BoardError),
}

impl EngineError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}
