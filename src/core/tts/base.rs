//! # TTS Base Trait
//!
//! Synthesis is request/response: one call per finished sentence, issued as soon as the
//! sentence exists. Calls for different sentences overlap and may complete in any
//! order; reordering is the playback buffer's job, not the provider's.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Audio data structure for TTS output
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Audio bytes in the format specified by the provider
    pub data: Vec<u8>,
    /// Sample rate of the audio
    pub sample_rate: u32,
    /// Audio format (e.g., "mulaw", "ulaw_8000")
    pub format: String,
    /// Duration of the audio in milliseconds, when the format makes it computable
    pub duration_ms: Option<u32>,
}

impl AudioData {
    /// Encode the audio for the media stream wire format
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }
}

/// TTS-specific error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum TTSError {
    #[error("Audio generation failed: {0}")]
    AudioGenerationFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

/// Result type for TTS operations
pub type TTSResult<T> = Result<T, TTSError>;

/// Configuration for TTS providers
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct TTSConfig {
    pub provider: String,
    /// API key for the TTS provider
    pub api_key: String,
    /// Voice ID or name to use for synthesis
    pub voice_id: Option<String>,
    /// Model to use for TTS
    pub model: String,
    /// Audio format preference
    pub audio_format: Option<String>,
    /// Sample rate preference
    pub sample_rate: Option<u32>,
    /// Overrides the provider's API base URL
    pub base_url: Option<String>,
}

impl Default for TTSConfig {
    fn default() -> Self {
        // Phone media streams expect 8kHz mu-law
        Self {
            provider: "deepgram".to_string(),
            api_key: String::new(),
            voice_id: Some("aura-asteria-en".to_string()),
            model: String::new(),
            audio_format: Some("mulaw".to_string()),
            sample_rate: Some(8000),
            base_url: None,
        }
    }
}

/// Base trait for Text-to-Speech providers
#[async_trait]
pub trait BaseTTS: Send + Sync {
    /// Synthesize one sentence
    async fn synthesize(&self, text: &str) -> TTSResult<AudioData>;

    /// Get provider-specific information
    fn get_provider_info(&self) -> serde_json::Value {
        serde_json::json!({
            "provider": "unknown",
            "version": "1.0.0"
        })
    }
}

/// Helper alias for a boxed TTS trait object
pub type BoxedTTS = Box<dyn BaseTTS>;
