use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Result structure containing transcription data from STT providers
#[derive(Debug, Clone, PartialEq)]
pub struct STTResult {
    /// The transcribed text from the audio
    pub transcript: String,
    /// Whether this is a final transcription result (not an interim result)
    pub is_final: bool,
    /// Whether this marks the end of a speech segment (endpointing fired)
    pub is_speech_final: bool,
    /// Confidence score of the transcription (0.0 to 1.0)
    pub confidence: f32,
}

impl STTResult {
    /// Creates a new STTResult
    pub fn new(transcript: String, is_final: bool, is_speech_final: bool, confidence: f32) -> Self {
        Self {
            transcript,
            is_final,
            is_speech_final,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Events surfaced by a streaming STT provider
#[derive(Debug, Clone, PartialEq)]
pub enum STTEvent {
    /// An interim or final transcript
    Transcript(STTResult),
    /// The provider decided the caller stopped talking without a speech-final result
    UtteranceEnd,
}

/// Configuration for STT providers
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct STTConfig {
    pub provider: String,
    /// API key for the STT provider
    pub api_key: String,
    /// Language code for transcription (e.g., "en-US", "es-ES")
    pub language: String,
    /// Sample rate of the audio in Hz
    pub sample_rate: u32,
    /// Number of audio channels (1 for mono, 2 for stereo)
    pub channels: u16,
    /// Enable punctuation in results
    pub punctuation: bool,
    /// Encoding of the audio
    pub encoding: String,
    /// Model to use for transcription
    pub model: String,
    /// Silence (ms) after which the provider marks a result speech-final
    pub endpointing_ms: Option<u32>,
    /// Silence (ms) after which the provider sends an utterance-end signal
    pub utterance_end_ms: Option<u32>,
}

impl Default for STTConfig {
    fn default() -> Self {
        // Phone media streams deliver 8kHz mono mu-law
        Self {
            model: "nova-2".to_string(),
            provider: "deepgram".to_string(),
            api_key: String::new(),
            language: "en-US".to_string(),
            sample_rate: 8000,
            channels: 1,
            punctuation: true,
            encoding: "mulaw".to_string(),
            endpointing_ms: Some(200),
            utterance_end_ms: Some(1000),
        }
    }
}

/// Error types for STT operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum STTError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Audio processing error: {0}")]
    AudioProcessingError(String),
    #[error("Provider error: {0}")]
    ProviderError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Type alias for STT event callback
pub type STTEventCallback =
    Arc<dyn Fn(STTEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Base trait for Speech-to-Text providers
#[async_trait::async_trait]
pub trait BaseSTT: Send + Sync {
    /// Create a new instance of the STT provider with the given configuration
    fn new(config: STTConfig) -> Result<Self, STTError>
    where
        Self: Sized;

    /// Connect to the STT provider
    async fn connect(&mut self) -> Result<(), STTError>;

    /// Disconnect from the STT provider
    async fn disconnect(&mut self) -> Result<(), STTError>;

    /// Check if the connection is ready to be used
    fn is_ready(&self) -> bool;

    /// Send raw audio bytes to the STT provider for transcription
    async fn send_audio(&mut self, audio_data: Vec<u8>) -> Result<(), STTError>;

    /// Register the callback that receives transcripts and utterance-end signals.
    ///
    /// Must be called before [`BaseSTT::connect`]; providers capture the callback when
    /// their receive task starts.
    async fn on_event(&mut self, callback: STTEventCallback) -> Result<(), STTError>;

    /// Get the current configuration
    fn get_config(&self) -> Option<&STTConfig>;

    /// Get provider-specific information
    fn get_provider_info(&self) -> &'static str;
}

/// Connection state for STT providers
#[derive(Debug, Clone, PartialEq)]
pub enum STTConnectionState {
    /// Not connected
    Disconnected,
    /// In the process of connecting
    Connecting,
    /// Connected and ready to receive audio
    Connected,
    /// Error state
    Error(String),
}
