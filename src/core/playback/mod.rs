//! Ordered playback of synthesized audio.

mod buffer;
mod delivery;

pub use buffer::PlaybackBuffer;
pub use delivery::{AudioDelivery, AudioSent};

use crate::core::turn::TurnId;

/// One synthesized sentence, ready for the transport
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub turn: TurnId,
    /// `None` plays immediately, bypassing reordering
    pub sequence_index: Option<u32>,
    /// Base64 audio in the transport's wire encoding
    pub payload: String,
}
