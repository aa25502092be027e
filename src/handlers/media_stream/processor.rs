//! Media stream frame processing
//!
//! Routes each parsed frame to the connection's session. The first `start` frame creates
//! the session; everything before it except `connected` is dropped.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::core::session::{Session, SessionConfig, SessionInfo};
use crate::state::AppState;

use super::{
    error::{MediaStreamError, MediaStreamResult},
    messages::{IncomingMessage, OutgoingMessage, StartMetadata},
    transport::MediaStreamTransport,
};

/// Per-connection state
#[derive(Default)]
pub struct ConnectionState {
    pub session: Option<Session>,
    pub call_sid: Option<String>,
}

/// Decode one text frame. Unknown events and missing fields are rejected here.
pub fn parse_frame(text: &str) -> MediaStreamResult<IncomingMessage> {
    serde_json::from_str(text).map_err(|e| MediaStreamError::InvalidMessage(e.to_string()))
}

/// Process one frame
///
/// # Returns
/// * `MediaStreamResult<bool>` - true to continue processing, false to end the connection
pub async fn handle_incoming_message(
    msg: IncomingMessage,
    state: &mut ConnectionState,
    message_tx: &mpsc::Sender<OutgoingMessage>,
    app_state: &Arc<AppState>,
) -> MediaStreamResult<bool> {
    match msg {
        IncomingMessage::Connected { protocol } => {
            debug!("Media stream connected (protocol {:?})", protocol);
            Ok(true)
        }
        IncomingMessage::Start { start } => {
            handle_start(start, state, message_tx, app_state).await?;
            Ok(true)
        }
        IncomingMessage::Media { media } => {
            let session = state
                .session
                .as_ref()
                .ok_or(MediaStreamError::NotStarted("media"))?;
            let audio = STANDARD
                .decode(media.payload.as_bytes())
                .map_err(|e| MediaStreamError::InvalidPayload(e.to_string()))?;
            session.feed_audio(audio);
            Ok(true)
        }
        IncomingMessage::Mark { mark } => {
            let session = state
                .session
                .as_ref()
                .ok_or(MediaStreamError::NotStarted("mark"))?;
            if session.mark_acknowledged(mark.name).is_err() {
                debug!("Mark arrived after session stopped");
            }
            Ok(true)
        }
        IncomingMessage::Stop { .. } => {
            info!("Media stream stopped by provider");
            Ok(false)
        }
    }
}

async fn handle_start(
    start: StartMetadata,
    state: &mut ConnectionState,
    message_tx: &mpsc::Sender<OutgoingMessage>,
    app_state: &Arc<AppState>,
) -> MediaStreamResult<()> {
    if let Some(session) = &state.session {
        return Err(MediaStreamError::AlreadyStarted(
            session.stream_sid().to_string(),
        ));
    }

    info!(
        "Media stream {} started for call {}",
        start.stream_sid, start.call_sid
    );

    let config = &app_state.config;
    let session_config = SessionConfig {
        stream_sid: start.stream_sid.clone(),
        call_sid: start.call_sid.clone(),
        system_message: config.system_message.clone(),
        initial_message: config.initial_message.clone(),
        max_tool_rounds: config.max_tool_rounds,
    };
    let transport = Arc::new(MediaStreamTransport::new(
        start.stream_sid.clone(),
        message_tx.clone(),
    ));

    let session = Session::start(session_config, app_state.providers.as_ref(), transport).await?;

    app_state
        .sessions
        .register(SessionInfo::new(start.stream_sid, start.call_sid.clone()));
    state.call_sid = Some(start.call_sid);
    state.session = Some(session);
    Ok(())
}
