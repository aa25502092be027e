use crate::core::llm::ReplyEvent;
use crate::core::playback::AudioChunk;
use crate::core::stt::STTEvent;
use crate::core::turn::TurnId;

/// Everything a session reacts to, processed one at a time in arrival order
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Output of the speech recognizer
    Stt(STTEvent),
    /// Output of the reply generator for `turn`
    Reply { turn: TurnId, event: ReplyEvent },
    /// A sentence finished synthesizing
    Speech(AudioChunk),
    /// Synthesis of a sentence failed
    SpeechFailed {
        turn: TurnId,
        sequence_index: Option<u32>,
        error: String,
    },
    /// The transport finished playing everything up to this mark
    MarkAcknowledged(String),
    Stop,
}
