use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::base::{AudioData, BaseTTS, TTSConfig, TTSError, TTSResult};
use super::provider::{TTSProvider, TTSRequestBuilder, mulaw_duration_ms};
use crate::utils::req_manager::ReqManager;

pub const ELEVENLABS_TTS_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";

/// Output format the media stream plays without transcoding
pub const ELEVENLABS_OUTPUT_FORMAT: &str = "ulaw_8000";

const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
const DEFAULT_MODEL_ID: &str = "eleven_turbo_v2";

/// ElevenLabs-specific request builder
#[derive(Clone)]
struct ElevenLabsRequestBuilder {
    config: TTSConfig,
}

impl ElevenLabsRequestBuilder {
    fn url(&self) -> String {
        let base = self.config.base_url.as_deref().unwrap_or(ELEVENLABS_TTS_URL);
        let voice_id = self.config.voice_id.as_deref().unwrap_or(DEFAULT_VOICE_ID);

        format!(
            "{base}/{voice_id}/stream?output_format={ELEVENLABS_OUTPUT_FORMAT}&optimize_streaming_latency=4"
        )
    }
}

impl TTSRequestBuilder for ElevenLabsRequestBuilder {
    fn build_http_request(&self, client: &reqwest::Client, text: &str) -> reqwest::RequestBuilder {
        let model_id = if self.config.model.is_empty() {
            DEFAULT_MODEL_ID
        } else {
            self.config.model.as_str()
        };

        client
            .post(self.url())
            .header("xi-api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
            .header("Accept", "audio/basic")
            .json(&json!({
                "model_id": model_id,
                "text": text,
            }))
    }

    fn get_config(&self) -> &TTSConfig {
        &self.config
    }
}

/// ElevenLabs TTS provider using the streaming HTTP endpoint
pub struct ElevenLabsTTS {
    provider: TTSProvider,
    request_builder: ElevenLabsRequestBuilder,
}

impl ElevenLabsTTS {
    pub fn new(config: TTSConfig, req_manager: Arc<ReqManager>) -> TTSResult<Self> {
        if config.api_key.is_empty() {
            return Err(TTSError::InvalidConfiguration(
                "API key is required for ElevenLabs".to_string(),
            ));
        }

        Ok(Self {
            provider: TTSProvider::new(req_manager),
            request_builder: ElevenLabsRequestBuilder { config },
        })
    }
}

#[async_trait]
impl BaseTTS for ElevenLabsTTS {
    async fn synthesize(&self, text: &str) -> TTSResult<AudioData> {
        let data = self
            .provider
            .send_request(&self.request_builder, text)
            .await?;

        Ok(AudioData {
            duration_ms: mulaw_duration_ms(data.len(), 8000),
            data,
            sample_rate: 8000,
            format: ELEVENLABS_OUTPUT_FORMAT.to_string(),
        })
    }

    fn get_provider_info(&self) -> serde_json::Value {
        json!({
            "provider": "elevenlabs",
            "version": "1.0.0",
            "api_type": "HTTP REST",
            "endpoint": ELEVENLABS_TTS_URL,
            "supported_formats": [ELEVENLABS_OUTPUT_FORMAT],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TTSConfig {
        TTSConfig {
            provider: "elevenlabs".to_string(),
            api_key: "test_key".to_string(),
            voice_id: Some("test_voice_id".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_elevenlabs_invalid_config() {
        let manager = Arc::new(ReqManager::new(1).unwrap());
        let result = ElevenLabsTTS::new(
            TTSConfig {
                api_key: String::new(),
                ..config()
            },
            manager,
        );
        assert!(matches!(result, Err(TTSError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_http_request_building() {
        let builder = ElevenLabsRequestBuilder { config: config() };
        let client = reqwest::Client::new();
        let request = builder
            .build_http_request(&client, "Hello world")
            .build()
            .unwrap();

        let url = request.url().as_str();
        assert!(url.contains("/test_voice_id/stream"));
        assert!(url.contains("output_format=ulaw_8000"));
        assert!(url.contains("optimize_streaming_latency=4"));

        let headers = request.headers();
        assert_eq!(headers.get("xi-api-key").unwrap(), "test_key");
        assert_eq!(headers.get("Accept").unwrap(), "audio/basic");

        let body: serde_json::Value =
            serde_json::from_slice(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(body["text"], "Hello world");
        assert_eq!(body["model_id"], DEFAULT_MODEL_ID);
    }

    #[test]
    fn test_configured_model_is_used() {
        let builder = ElevenLabsRequestBuilder {
            config: TTSConfig {
                model: "eleven_flash_v2_5".to_string(),
                ..config()
            },
        };
        let client = reqwest::Client::new();
        let request = builder.build_http_request(&client, "Hi").build().unwrap();
        let body: serde_json::Value =
            serde_json::from_slice(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(body["model_id"], "eleven_flash_v2_5");
    }
}
