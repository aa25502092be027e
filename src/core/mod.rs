pub mod events;
pub mod interruption;
pub mod llm;
pub mod playback;
pub mod providers;
pub mod session;
pub mod stt;
pub mod transcript;
pub mod transport;
pub mod tts;
pub mod turn;

// Re-export commonly used types for convenience
pub use events::EventBus;
pub use interruption::InterruptionCoordinator;
pub use playback::{AudioChunk, AudioDelivery, AudioSent, PlaybackBuffer};
pub use providers::{ConfiguredProviders, ProviderSet, ProviderSetupError};
pub use session::{
    Session, SessionConfig, SessionError, SessionEvent, SessionInfo, SessionRegistry,
    SessionResult,
};
pub use transcript::{Activity, TranscriptSegmenter, Utterance};
pub use transport::{Transport, TransportError, TransportResult};
pub use turn::{Sentence, TurnController, TurnId};

pub use stt::{
    BaseSTT, DeepgramSTT, STTConfig, STTError, STTEvent, STTEventCallback, STTProvider, STTResult,
    create_stt_provider, get_supported_stt_providers,
};

pub use tts::{
    AudioData, BaseTTS, BoxedTTS, DeepgramTTS, ElevenLabsTTS, TTSConfig, TTSError, TTSResult,
    create_tts_provider, get_tts_provider_urls,
};

pub use llm::{
    BaseLLM, CallControl, ChatMessage, LLMConfig, LLMError, LLMResult, ReplyEvent,
    ReplyGenerator, Tool, ToolRegistry, create_llm_provider,
};
