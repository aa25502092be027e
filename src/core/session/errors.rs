//! Error types for session operations

use crate::core::stt::STTError;
use crate::core::transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("STT error: {0}")]
    STTError(#[from] STTError),
    #[error("Transport error: {0}")]
    TransportError(#[from] TransportError),
    #[error("Session already stopped")]
    Stopped,
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
