use thiserror::Error;

use crate::session::SessionState;

/// Errors surfaced by the session core. `Clone` because the failure that
/// moved a session to `Failed` is both returned to the caller and retained
/// for later inspection.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The capture device could not be acquired, or its stream died.
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The live connection could not be established.
    #[error("failed to connect to live service: {0}")]
    ConnectFailed(String),

    /// The established connection failed, or the service reported an error.
    #[error("transport error: {0}")]
    Transport(String),

    /// An operation was invoked from a state that does not permit it.
    #[error("cannot {op} while session is {state}")]
    InvalidState {
        op: &'static str,
        state: SessionState,
    },

    /// A send was attempted on a channel that has already been closed.
    #[error("send attempted after channel close")]
    SendAfterClose,
}

pub type SessionResult<T> = Result<T, SessionError>;
