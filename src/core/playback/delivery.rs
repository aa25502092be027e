use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{AudioChunk, PlaybackBuffer};
use crate::core::events::EventBus;
use crate::core::transport::{Transport, TransportResult};
use crate::core::turn::TurnId;

/// Fired after a chunk and its mark were handed to the transport
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSent {
    pub mark: String,
    pub turn: TurnId,
    pub sequence_index: Option<u32>,
}

/// Sends chunks released by the [`PlaybackBuffer`] to the transport, each followed by a
/// fresh mark.
pub struct AudioDelivery {
    buffer: Mutex<PlaybackBuffer>,
    transport: Arc<dyn Transport>,
    audio_sent: EventBus<AudioSent>,
}

impl AudioDelivery {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            buffer: Mutex::new(PlaybackBuffer::new()),
            transport,
            audio_sent: EventBus::new(),
        }
    }

    pub fn audio_sent(&self) -> &EventBus<AudioSent> {
        &self.audio_sent
    }

    /// Release whatever `chunk` unblocks. If the transport fails partway through a run,
    /// the rest of the run is dropped; the buffer has already moved past it.
    pub async fn submit(&self, chunk: AudioChunk) -> TransportResult<()> {
        let ready = self.buffer.lock().submit(chunk);
        let total = ready.len();

        for (sent, chunk) in ready.into_iter().enumerate() {
            if let Err(e) = self.send(chunk).await {
                warn!(
                    "Transport failed, dropping {} of {} released chunk(s): {}",
                    total - sent,
                    total,
                    e
                );
                return Err(e);
            }
        }
        Ok(())
    }

    async fn send(&self, chunk: AudioChunk) -> TransportResult<()> {
        self.transport.send_playback(&chunk.payload).await?;

        let mark = Uuid::new_v4().to_string();
        self.transport.send_mark(&mark).await?;
        debug!(
            "Sent {} chunk {:?} with mark {}",
            chunk.turn, chunk.sequence_index, mark
        );

        self.audio_sent
            .emit(AudioSent {
                mark,
                turn: chunk.turn,
                sequence_index: chunk.sequence_index,
            })
            .await;
        Ok(())
    }

    pub fn reset(&self) {
        self.buffer.lock().reset();
    }

    pub fn begin_turn(&self, turn: TurnId) {
        self.buffer.lock().begin_turn(turn);
    }

    pub fn abandon_turn(&self, turn: TurnId) {
        self.buffer.lock().abandon_turn(turn);
    }

    pub fn expected_index(&self) -> u32 {
        self.buffer.lock().expected_index()
    }

    pub fn withheld_len(&self) -> usize {
        self.buffer.lock().withheld_len()
    }
}
