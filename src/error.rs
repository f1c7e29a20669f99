use thiserror::Error;

use crate::adapter::AdapterError;
use crate::models::SessionState;

/// Conditions reported at the session boundary.
///
/// Adapter faults arrive wrapped in either [`SessionError::Connection`]
/// (terminal until an explicit reconnect) or [`SessionError::Transfer`]
/// (recoverable, the session returns to `Ready`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Connect or discovery failed; the session sits in `Error` until an
    /// explicit reconnect.
    #[error("connection fault: {0}")]
    Connection(AdapterError),

    /// The discovered topology yields no target endpoint; the session
    /// stays `Ready` but cannot transfer.
    #[error("no target endpoint available")]
    EndpointUnavailable,

    /// A read or write failed; the session has returned to `Ready`.
    #[error("transfer fault: {0}")]
    Transfer(AdapterError),

    /// The session disconnected or reconnected while this operation was in
    /// flight; its late result was discarded.
    #[error("superseded by a newer session cycle")]
    Superseded,

    /// A connection cycle is already active.
    #[error("connect rejected in state {0:?}")]
    AlreadyActive(SessionState),

    /// Transfers require the `Ready` state.
    #[error("not ready for transfer in state {0:?}")]
    NotReady(SessionState),
}
