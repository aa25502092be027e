//! [`Transport`] over the media stream socket.
//!
//! Outbound commands are queued on the connection's sender task, which owns the write
//! half of the socket.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::messages::{MarkPayload, MediaPayload, OutgoingMessage};
use crate::core::transport::{Transport, TransportError, TransportResult};

pub struct MediaStreamTransport {
    stream_sid: String,
    sender: mpsc::Sender<OutgoingMessage>,
}

impl MediaStreamTransport {
    pub fn new(stream_sid: impl Into<String>, sender: mpsc::Sender<OutgoingMessage>) -> Self {
        Self {
            stream_sid: stream_sid.into(),
            sender,
        }
    }

    async fn send(&self, message: OutgoingMessage) -> TransportResult<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| TransportError::Closed)
    }
}

#[async_trait]
impl Transport for MediaStreamTransport {
    async fn send_playback(&self, payload: &str) -> TransportResult<()> {
        self.send(OutgoingMessage::Media {
            stream_sid: self.stream_sid.clone(),
            media: MediaPayload {
                payload: payload.to_string(),
            },
        })
        .await
    }

    async fn send_mark(&self, token: &str) -> TransportResult<()> {
        self.send(OutgoingMessage::Mark {
            stream_sid: self.stream_sid.clone(),
            mark: MarkPayload {
                name: token.to_string(),
            },
        })
        .await
    }

    async fn send_clear(&self) -> TransportResult<()> {
        self.send(OutgoingMessage::Clear {
            stream_sid: self.stream_sid.clone(),
        })
        .await
    }
}
