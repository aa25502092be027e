//! Media stream error types

use thiserror::Error;

use crate::core::session::SessionError;

/// Media stream handler error types
#[derive(Debug, Error)]
pub enum MediaStreamError {
    /// The frame is not valid JSON or not a known event
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    /// A media frame carried a payload that is not valid base64
    #[error("Invalid media payload: {0}")]
    InvalidPayload(String),

    /// A second `start` frame arrived on the same connection
    #[error("Stream already started as {0}")]
    AlreadyStarted(String),

    /// A frame that needs a session arrived before `start`
    #[error("Received {0} before the stream started")]
    NotStarted(&'static str),

    /// The session could not be set up
    #[error("Failed to start session: {0}")]
    SessionStart(#[from] SessionError),
}

impl MediaStreamError {
    /// Fatal errors end the connection; the rest drop one frame.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MediaStreamError::SessionStart(_))
    }
}

/// Result type for media stream operations
pub type MediaStreamResult<T> = Result<T, MediaStreamError>;
