use super::ServerConfig;
use crate::core::llm::get_supported_llm_providers;
use crate::core::stt::get_supported_stt_providers;
use crate::core::tts::get_tts_provider_urls;

/// Run every check on a fully merged configuration
pub fn validate(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    validate_providers(config)?;
    validate_limits(config)?;
    validate_call_control(config)?;
    Ok(())
}

/// Validate provider selection
///
/// Each selected provider must be supported and have its API key configured.
/// Keys of providers that are not selected are not required.
pub fn validate_providers(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let stt_supported = get_supported_stt_providers();
    if !stt_supported.contains(&config.stt_service.as_str()) {
        return Err(format!(
            "Unsupported STT_SERVICE '{}'. Supported: {}",
            config.stt_service,
            stt_supported.join(", ")
        )
        .into());
    }

    let mut tts_supported: Vec<String> = get_tts_provider_urls().into_keys().collect();
    tts_supported.sort();
    if !tts_supported.contains(&config.tts_service) {
        return Err(format!(
            "Unsupported TTS_SERVICE '{}'. Supported: {}",
            config.tts_service,
            tts_supported.join(", ")
        )
        .into());
    }

    let llm_supported = get_supported_llm_providers();
    if !llm_supported.contains(&config.llm_service.as_str()) {
        return Err(format!(
            "Unsupported LLM_SERVICE '{}'. Supported: {}",
            config.llm_service,
            llm_supported.join(", ")
        )
        .into());
    }

    for provider in [&config.stt_service, &config.tts_service, &config.llm_service] {
        config.get_api_key(provider)?;
    }

    Ok(())
}

/// Validate numeric limits
pub fn validate_limits(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.tts_max_concurrent_requests == 0 || config.tts_max_concurrent_requests > 1000 {
        return Err(format!(
            "TTS_MAX_CONCURRENT_REQUESTS must be between 1 and 1000, got {}",
            config.tts_max_concurrent_requests
        )
        .into());
    }

    if config.max_tool_rounds == 0 {
        return Err("MAX_TOOL_ROUNDS must be at least 1".into());
    }

    Ok(())
}

/// Validate call control credentials
///
/// Account sid and auth token are required together.
pub fn validate_call_control(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    match (&config.twilio_account_sid, &config.twilio_auth_token) {
        (Some(_), None) => {
            Err("TWILIO_AUTH_TOKEN is required when TWILIO_ACCOUNT_SID is set".into())
        }
        (None, Some(_)) => {
            Err("TWILIO_ACCOUNT_SID is required when TWILIO_AUTH_TOKEN is set".into())
        }
        _ => Ok(()),
    }
}
