use std::collections::HashMap;

use tracing::debug;

use super::AudioChunk;
use crate::core::turn::TurnId;

/// Reorders concurrently synthesized chunks into sequence order.
///
/// Chunks are only accepted for the active turn. Index `expected_index` is released
/// together with any contiguous run already withheld behind it; higher indices wait,
/// lower ones are stale and dropped.
#[derive(Debug)]
pub struct PlaybackBuffer {
    expected_index: u32,
    withheld: HashMap<u32, AudioChunk>,
    active_turn: Option<TurnId>,
}

impl PlaybackBuffer {
    /// A fresh buffer accepts greeting audio until the first caller turn begins.
    pub fn new() -> Self {
        Self {
            expected_index: 0,
            withheld: HashMap::new(),
            active_turn: Some(TurnId::GREETING),
        }
    }

    /// Accept one chunk and return every chunk now ready for playback, in order.
    pub fn submit(&mut self, chunk: AudioChunk) -> Vec<AudioChunk> {
        if self.active_turn != Some(chunk.turn) {
            debug!(
                "Dropping chunk {:?} from inactive {}",
                chunk.sequence_index, chunk.turn
            );
            return Vec::new();
        }

        let Some(index) = chunk.sequence_index else {
            return vec![chunk];
        };

        if index < self.expected_index {
            debug!(
                "Dropping stale chunk {} (expecting {})",
                index, self.expected_index
            );
            return Vec::new();
        }

        if index > self.expected_index {
            if self.withheld.contains_key(&index) {
                debug!("Dropping duplicate withheld chunk {}", index);
            } else {
                self.withheld.insert(index, chunk);
            }
            return Vec::new();
        }

        let mut ready = vec![chunk];
        self.expected_index += 1;
        while let Some(next) = self.withheld.remove(&self.expected_index) {
            ready.push(next);
            self.expected_index += 1;
        }
        ready
    }

    /// Forget all ordering state. No turn is active until [`PlaybackBuffer::begin_turn`].
    pub fn reset(&mut self) {
        self.expected_index = 0;
        self.withheld.clear();
        self.active_turn = None;
    }

    /// Reset and start accepting chunks for `turn`.
    pub fn begin_turn(&mut self, turn: TurnId) {
        self.reset();
        self.active_turn = Some(turn);
    }

    /// Reset if `turn` is still the one being played.
    pub fn abandon_turn(&mut self, turn: TurnId) {
        if self.active_turn == Some(turn) {
            self.reset();
        }
    }

    pub fn expected_index(&self) -> u32 {
        self.expected_index
    }

    pub fn withheld_len(&self) -> usize {
        self.withheld.len()
    }

    pub fn active_turn(&self) -> Option<TurnId> {
        self.active_turn
    }
}

impl Default for PlaybackBuffer {
    fn default() -> Self {
        Self::new()
    }
}
