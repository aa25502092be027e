//! Barge-in detection and the coordinated reset it triggers.
//!
//! Audio counts as playing while any mark sent with it is still unacknowledged. Caller
//! activity during that window interrupts the bot; activity while nothing is playing is
//! an ordinary pause and changes nothing.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::core::playback::{AudioDelivery, AudioSent};
use crate::core::transcript::Activity;
use crate::core::transport::{Transport, TransportResult};
use crate::core::turn::TurnController;

pub struct InterruptionCoordinator {
    outstanding: Mutex<HashSet<String>>,
    transport: Arc<dyn Transport>,
    delivery: Arc<AudioDelivery>,
    turns: Arc<TurnController>,
}

impl InterruptionCoordinator {
    pub fn new(
        transport: Arc<dyn Transport>,
        delivery: Arc<AudioDelivery>,
        turns: Arc<TurnController>,
    ) -> Self {
        Self {
            outstanding: Mutex::new(HashSet::new()),
            transport,
            delivery,
            turns,
        }
    }

    pub fn on_audio_sent(&self, sent: &AudioSent) {
        self.outstanding.lock().insert(sent.mark.clone());
    }

    pub fn on_mark_acknowledged(&self, token: &str) {
        if !self.outstanding.lock().remove(token) {
            debug!("Ignoring unknown mark {}", token);
        }
    }

    /// Returns `true` when the activity interrupted playing audio.
    pub async fn on_activity(&self, activity: &Activity) -> TransportResult<bool> {
        if self.outstanding.lock().is_empty() {
            return Ok(false);
        }

        info!(
            "Barge-in on stream {}: {}",
            activity.stream_sid, activity.text
        );

        let cleared = self.transport.send_clear().await;
        self.delivery.reset();
        self.turns.reset();
        self.outstanding.lock().clear();

        cleared.map(|_| true)
    }

    pub fn outstanding_marks(&self) -> usize {
        self.outstanding.lock().len()
    }
}
