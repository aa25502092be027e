mod base;
pub mod deepgram;
pub mod elevenlabs;
pub mod provider;

pub use base::{AudioData, BaseTTS, BoxedTTS, TTSConfig, TTSError, TTSResult};
pub use deepgram::{DEEPGRAM_TTS_URL, DeepgramTTS};
pub use elevenlabs::{ELEVENLABS_TTS_URL, ElevenLabsTTS};
pub use provider::{TTSProvider, TTSRequestBuilder};

use std::collections::HashMap;
use std::sync::Arc;

use crate::utils::req_manager::ReqManager;

/// Factory function to create a TTS provider.
///
/// # Supported Providers
///
/// - `"deepgram"` - Deepgram Speak REST API
/// - `"elevenlabs"` - ElevenLabs streaming REST API
pub fn create_tts_provider(
    provider_type: &str,
    config: TTSConfig,
    req_manager: Arc<ReqManager>,
) -> TTSResult<BoxedTTS> {
    match provider_type.to_lowercase().as_str() {
        "deepgram" => Ok(Box::new(DeepgramTTS::new(config, req_manager)?)),
        "elevenlabs" => Ok(Box::new(ElevenLabsTTS::new(config, req_manager)?)),
        _ => Err(TTSError::InvalidConfiguration(format!(
            "Unsupported TTS provider: {provider_type}. Supported providers: deepgram, elevenlabs"
        ))),
    }
}

/// Returns a map of provider names to their default API endpoint URLs.
pub fn get_tts_provider_urls() -> HashMap<String, String> {
    let mut urls = HashMap::new();
    urls.insert("deepgram".to_string(), DEEPGRAM_TTS_URL.to_string());
    urls.insert("elevenlabs".to_string(), ELEVENLABS_TTS_URL.to_string());
    urls
}
