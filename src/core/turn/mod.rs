//! Conversational turn bookkeeping: turn identity, sentence segmentation and sequencing.

mod controller;
mod sentences;

pub use controller::TurnController;
pub use sentences::split_sentences;

/// Identifies one caller-utterance-to-bot-reply cycle within a session.
///
/// Turn 0 is reserved for the call-opening greeting; caller turns start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(pub u64);

impl TurnId {
    pub const GREETING: TurnId = TurnId(0);
}

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "turn-{}", self.0)
    }
}

/// A completed sentence ready for synthesis.
///
/// `sequence_index` is `None` for out-of-band speech that skips reordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    pub turn: TurnId,
    pub sequence_index: Option<u32>,
    pub text: String,
}
