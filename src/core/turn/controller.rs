use parking_lot::Mutex;
use tracing::{debug, info};

use super::{Sentence, TurnId, split_sentences};
use crate::core::events::EventBus;

#[derive(Debug)]
struct TurnState {
    last_turn: u64,
    active: Option<TurnId>,
    sentence_buffer: String,
    next_index: u32,
}

impl TurnState {
    fn clear_sequence(&mut self) {
        self.sentence_buffer.clear();
        self.next_index = 0;
    }

    fn next_sentence(&mut self, turn: TurnId, text: String) -> Sentence {
        let sentence = Sentence {
            turn,
            sequence_index: Some(self.next_index),
            text,
        };
        self.next_index += 1;
        sentence
    }
}

/// Regroups reply fragments into indexed sentences for the active turn.
///
/// Fragments, say-lines and completion signals tagged with any turn other than the
/// active one are discarded, so work left over from a superseded or reset turn never
/// reaches synthesis.
pub struct TurnController {
    state: Mutex<TurnState>,
    sentences: EventBus<Sentence>,
}

impl TurnController {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TurnState {
                last_turn: TurnId::GREETING.0,
                active: None,
                sentence_buffer: String::new(),
                next_index: 0,
            }),
            sentences: EventBus::new(),
        }
    }

    pub fn sentences(&self) -> &EventBus<Sentence> {
        &self.sentences
    }

    pub fn active_turn(&self) -> Option<TurnId> {
        self.state.lock().active
    }

    /// Allocate the next turn and make it the only one whose fragments are accepted.
    pub fn begin_turn(&self, utterance_text: &str) -> TurnId {
        let mut state = self.state.lock();
        state.last_turn += 1;
        let turn = TurnId(state.last_turn);
        state.active = Some(turn);
        state.clear_sequence();

        info!("Beginning {} for utterance: {}", turn, utterance_text.trim());
        turn
    }

    pub async fn push_fragment(&self, turn: TurnId, fragment: &str) {
        let ready = {
            let mut state = self.state.lock();
            if state.active != Some(turn) {
                debug!("Discarding fragment from inactive {}", turn);
                return;
            }

            state.sentence_buffer.push_str(fragment);
            let (sentences, rest) = split_sentences(&state.sentence_buffer);
            let rest = rest.to_string();
            state.sentence_buffer = rest;

            sentences
                .into_iter()
                .map(|text| state.next_sentence(turn, text))
                .collect::<Vec<_>>()
        };

        for sentence in ready {
            self.sentences.emit(sentence).await;
        }
    }

    /// Speak `text` out of band without consuming a sequence index.
    pub async fn say(&self, turn: TurnId, text: &str) {
        if self.state.lock().active != Some(turn) {
            debug!("Discarding say-line from inactive {}", turn);
            return;
        }

        self.sentences
            .emit(Sentence {
                turn,
                sequence_index: None,
                text: text.to_string(),
            })
            .await;
    }

    /// Flush the undelimited remainder as the last sentence of the turn.
    pub async fn finish(&self, turn: TurnId) {
        let last = {
            let mut state = self.state.lock();
            if state.active != Some(turn) {
                debug!("Ignoring completion of inactive {}", turn);
                return;
            }

            let rest = state.sentence_buffer.trim().to_string();
            let last = (!rest.is_empty()).then(|| state.next_sentence(turn, rest));
            state.clear_sequence();
            last
        };

        if let Some(sentence) = last {
            self.sentences.emit(sentence).await;
        }
    }

    /// Drop buffered text for `turn` after its generation failed.
    pub fn abandon(&self, turn: TurnId) {
        let mut state = self.state.lock();
        if state.active == Some(turn) {
            state.clear_sequence();
            state.active = None;
            info!("Abandoned {}", turn);
        }
    }

    /// Zero the sequence counter and clear the sentence buffer.
    ///
    /// No turn is active afterwards, so fragments still streaming for the interrupted
    /// turn are discarded.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.clear_sequence();
        state.active = None;
    }

    pub fn pending_text(&self) -> String {
        self.state.lock().sentence_buffer.clone()
    }
}

impl Default for TurnController {
    fn default() -> Self {
        Self::new()
    }
}
