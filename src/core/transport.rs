//! Outbound side of the duplex media channel.
//!
//! The inbound side (caller audio frames and mark acknowledgements) is pushed into the
//! session by whoever owns the socket; see `handlers::media_stream`.

use async_trait::async_trait;

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("Transport closed")]
    Closed,
    #[error("Failed to send to transport: {0}")]
    SendFailed(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Queue a base64 audio payload for playback
    async fn send_playback(&self, payload: &str) -> TransportResult<()>;

    /// Ask the transport to acknowledge once everything queued before `token` has played
    async fn send_mark(&self, token: &str) -> TransportResult<()>;

    /// Discard audio that is queued but not yet played
    async fn send_clear(&self) -> TransportResult<()>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Sent {
        Playback(String),
        Mark(String),
        Clear,
    }

    /// Records every outbound command in order
    #[derive(Default)]
    pub struct RecordingTransport {
        pub sent: Mutex<Vec<Sent>>,
    }

    impl RecordingTransport {
        pub fn playbacks(&self) -> Vec<String> {
            self.sent
                .lock()
                .iter()
                .filter_map(|sent| match sent {
                    Sent::Playback(payload) => Some(payload.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn marks(&self) -> Vec<String> {
            self.sent
                .lock()
                .iter()
                .filter_map(|sent| match sent {
                    Sent::Mark(token) => Some(token.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn clears(&self) -> usize {
            self.sent
                .lock()
                .iter()
                .filter(|sent| matches!(sent, Sent::Clear))
                .count()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send_playback(&self, payload: &str) -> TransportResult<()> {
            self.sent.lock().push(Sent::Playback(payload.to_string()));
            Ok(())
        }

        async fn send_mark(&self, token: &str) -> TransportResult<()> {
            self.sent.lock().push(Sent::Mark(token.to_string()));
            Ok(())
        }

        async fn send_clear(&self) -> TransportResult<()> {
            self.sent.lock().push(Sent::Clear);
            Ok(())
        }
    }
}
