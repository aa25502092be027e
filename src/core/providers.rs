//! Producer selection.
//!
//! Backends are chosen once from configuration when the server starts. Sessions only see
//! the capability traits, never provider names.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::ServerConfig;
use crate::core::llm::{
    BaseLLM, CallControl, LLMConfig, LLMError, ToolRegistry, TwilioCallControl,
    create_llm_provider,
};
use crate::core::stt::{BaseSTT, STTConfig, STTError, STTProvider, create_stt_provider};
use crate::core::tts::{BaseTTS, TTSConfig, TTSError, create_tts_provider};
use crate::utils::req_manager::{ReqManager, ReqManagerError};

/// How long `end_call` waits for the goodbye line to play before hanging up
pub const END_CALL_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ProviderSetupError {
    #[error("STT setup failed: {0}")]
    Stt(#[from] STTError),
    #[error("TTS setup failed: {0}")]
    Tts(#[from] TTSError),
    #[error("LLM setup failed: {0}")]
    Llm(#[from] LLMError),
    #[error("HTTP client setup failed: {0}")]
    Http(#[from] ReqManagerError),
}

/// The producers a session runs against
pub trait ProviderSet: Send + Sync {
    /// A fresh, unconnected streaming recognizer; one per session
    fn speech_to_text(&self) -> Result<Box<dyn BaseSTT>, STTError>;

    fn text_to_speech(&self) -> Arc<dyn BaseTTS>;

    fn completion(&self) -> Arc<dyn BaseLLM>;

    fn tools(&self) -> ToolRegistry;
}

/// Providers built from [`ServerConfig`]
pub struct ConfiguredProviders {
    stt_provider: STTProvider,
    stt_config: STTConfig,
    tts: Arc<dyn BaseTTS>,
    llm: Arc<dyn BaseLLM>,
    call_control: Option<Arc<dyn CallControl>>,
    transfer_numbers: HashMap<String, String>,
    end_call_grace: Duration,
}

impl ConfiguredProviders {
    pub fn from_config(config: &ServerConfig) -> Result<Self, ProviderSetupError> {
        let req_manager = Arc::new(ReqManager::new(config.tts_max_concurrent_requests)?);
        Self::with_req_manager(config, req_manager)
    }

    pub fn with_req_manager(
        config: &ServerConfig,
        req_manager: Arc<ReqManager>,
    ) -> Result<Self, ProviderSetupError> {
        let stt_provider: STTProvider = config.stt_service.parse()?;
        let stt_config = STTConfig {
            provider: stt_provider.to_string(),
            api_key: config.deepgram_api_key.clone().unwrap_or_default(),
            ..Default::default()
        };

        let tts_config = tts_config(config);
        let tts = create_tts_provider(&config.tts_service, tts_config, req_manager.clone())?;

        let llm = create_llm_provider(llm_config(config), req_manager.clone())?;

        let call_control: Option<Arc<dyn CallControl>> =
            match (&config.twilio_account_sid, &config.twilio_auth_token) {
                (Some(sid), Some(token)) => Some(Arc::new(TwilioCallControl::new(
                    sid.clone(),
                    token.clone(),
                    req_manager.clone(),
                ))),
                _ => None,
            };

        info!(
            "Providers selected: stt={}, tts={}, llm={} ({}), call control {}",
            stt_provider,
            config.tts_service,
            config.llm_service,
            llm.get_provider_info(),
            if call_control.is_some() { "enabled" } else { "disabled" }
        );

        Ok(Self {
            stt_provider,
            stt_config,
            tts: Arc::from(tts),
            llm,
            call_control,
            transfer_numbers: config.transfer_numbers.clone(),
            end_call_grace: END_CALL_GRACE,
        })
    }

    pub fn with_end_call_grace(mut self, grace: Duration) -> Self {
        self.end_call_grace = grace;
        self
    }
}

impl ProviderSet for ConfiguredProviders {
    fn speech_to_text(&self) -> Result<Box<dyn BaseSTT>, STTError> {
        create_stt_provider(&self.stt_provider.to_string(), self.stt_config.clone())
    }

    fn text_to_speech(&self) -> Arc<dyn BaseTTS> {
        self.tts.clone()
    }

    fn completion(&self) -> Arc<dyn BaseLLM> {
        self.llm.clone()
    }

    fn tools(&self) -> ToolRegistry {
        ToolRegistry::standard(
            self.call_control.clone(),
            self.transfer_numbers.clone(),
            self.end_call_grace,
        )
    }
}

fn tts_config(config: &ServerConfig) -> TTSConfig {
    match config.tts_service.to_lowercase().as_str() {
        "elevenlabs" => TTSConfig {
            provider: "elevenlabs".to_string(),
            api_key: config.elevenlabs_api_key.clone().unwrap_or_default(),
            voice_id: config.elevenlabs_voice_id.clone(),
            model: config.elevenlabs_model_id.clone().unwrap_or_default(),
            audio_format: Some("ulaw_8000".to_string()),
            ..Default::default()
        },
        _ => TTSConfig {
            provider: config.tts_service.to_lowercase(),
            api_key: config.deepgram_api_key.clone().unwrap_or_default(),
            ..Default::default()
        },
    }
}

fn llm_config(config: &ServerConfig) -> LLMConfig {
    match config.llm_service.to_lowercase().as_str() {
        "groq" => LLMConfig {
            provider: "groq".to_string(),
            api_key: config.groq_api_key.clone().unwrap_or_default(),
            model: config.groq_model.clone(),
            base_url: None,
        },
        other => LLMConfig {
            provider: other.to_string(),
            api_key: config.openai_api_key.clone().unwrap_or_default(),
            model: config.openai_model.clone(),
            base_url: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            deepgram_api_key: Some("dg-key".to_string()),
            openai_api_key: Some("sk-test".to_string()),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn test_default_selection() {
        let providers = ConfiguredProviders::from_config(&config()).unwrap();

        assert_eq!(providers.text_to_speech().get_provider_info()["provider"], "deepgram");
        assert_eq!(providers.completion().get_provider_info(), "openai");
        assert_eq!(
            providers.speech_to_text().unwrap().get_provider_info(),
            "Deepgram STT WebSocket v1.0"
        );
    }

    #[test]
    fn test_tools_without_call_control() {
        let providers = ConfiguredProviders::from_config(&config()).unwrap();
        let tools = providers.tools();
        assert!(tools.get("end_call").is_some());
        assert!(tools.get("transfer_call").is_none());
    }

    #[test]
    fn test_groq_and_elevenlabs_selection() {
        let config = ServerConfig {
            tts_service: "elevenlabs".to_string(),
            llm_service: "groq".to_string(),
            elevenlabs_api_key: Some("xi-key".to_string()),
            groq_api_key: Some("gsk-test".to_string()),
            transfer_numbers: HashMap::from([("billing".to_string(), "+1555".to_string())]),
            ..config()
        };

        let providers = ConfiguredProviders::from_config(&config).unwrap();
        assert_eq!(providers.text_to_speech().get_provider_info()["provider"], "elevenlabs");
        assert_eq!(providers.completion().get_provider_info(), "groq");
        assert!(providers.tools().get("transfer_call").is_some());
    }

    #[test]
    fn test_missing_llm_key_fails() {
        let config = ServerConfig {
            openai_api_key: None,
            ..config()
        };
        assert!(matches!(
            ConfiguredProviders::from_config(&config),
            Err(ProviderSetupError::Llm(_))
        ));
    }
}
