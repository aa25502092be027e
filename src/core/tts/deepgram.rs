//! Deepgram Speak REST synthesis.
//!
//! Requests mu-law at 8kHz so the payload can go straight to the media stream. The first
//! 10ms of every response are dropped; Deepgram's audio opens with an audible click.

use std::sync::Arc;

use async_trait::async_trait;

use super::base::{AudioData, BaseTTS, TTSConfig, TTSError, TTSResult};
use super::provider::{TTSProvider, TTSRequestBuilder, mulaw_duration_ms};
use crate::utils::req_manager::ReqManager;

pub const DEEPGRAM_TTS_URL: &str = "https://api.deepgram.com/v1/speak";

/// Leading bytes trimmed from each response (10ms at 8kHz mu-law)
pub const ONSET_TRIM_BYTES: usize = 80;

#[derive(Clone)]
struct DeepgramRequestBuilder {
    config: TTSConfig,
}

impl DeepgramRequestBuilder {
    fn url(&self) -> String {
        let base = self.config.base_url.as_deref().unwrap_or(DEEPGRAM_TTS_URL);
        let model = self.config.voice_id.as_deref().unwrap_or("aura-asteria-en");
        let encoding = self.config.audio_format.as_deref().unwrap_or("mulaw");
        let sample_rate = self.config.sample_rate.unwrap_or(8000);

        format!("{base}?model={model}&encoding={encoding}&sample_rate={sample_rate}")
    }
}

impl TTSRequestBuilder for DeepgramRequestBuilder {
    fn build_http_request(&self, client: &reqwest::Client, text: &str) -> reqwest::RequestBuilder {
        client
            .post(self.url())
            .header("Authorization", format!("Token {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({ "text": text }))
    }

    fn get_config(&self) -> &TTSConfig {
        &self.config
    }
}

/// Deepgram TTS provider
pub struct DeepgramTTS {
    provider: TTSProvider,
    request_builder: DeepgramRequestBuilder,
}

impl DeepgramTTS {
    pub fn new(config: TTSConfig, req_manager: Arc<ReqManager>) -> TTSResult<Self> {
        if config.api_key.is_empty() {
            return Err(TTSError::InvalidConfiguration(
                "API key is required for Deepgram".to_string(),
            ));
        }

        Ok(Self {
            provider: TTSProvider::new(req_manager),
            request_builder: DeepgramRequestBuilder { config },
        })
    }
}

#[async_trait]
impl BaseTTS for DeepgramTTS {
    async fn synthesize(&self, text: &str) -> TTSResult<AudioData> {
        let mut data = self
            .provider
            .send_request(&self.request_builder, text)
            .await?;

        if data.len() <= ONSET_TRIM_BYTES {
            return Err(TTSError::AudioGenerationFailed(format!(
                "Deepgram returned only {} bytes",
                data.len()
            )));
        }
        data.drain(..ONSET_TRIM_BYTES);

        let config = &self.request_builder.config;
        let sample_rate = config.sample_rate.unwrap_or(8000);
        Ok(AudioData {
            duration_ms: mulaw_duration_ms(data.len(), sample_rate),
            data,
            sample_rate,
            format: config
                .audio_format
                .clone()
                .unwrap_or_else(|| "mulaw".to_string()),
        })
    }

    fn get_provider_info(&self) -> serde_json::Value {
        serde_json::json!({
            "provider": "deepgram",
            "version": "1.0.0",
            "api_type": "HTTP REST",
            "endpoint": DEEPGRAM_TTS_URL,
            "supported_formats": ["mulaw"],
            "supported_sample_rates": [8000],
        })
    }
}
