use std::env;

use super::utils::parse_transfer_numbers;
use super::yaml::YamlConfig;
use super::{DEFAULT_INITIAL_MESSAGE, DEFAULT_SYSTEM_MESSAGE, ServerConfig};

/// Every environment variable the configuration reads
#[cfg(test)]
pub(super) const ENV_VARS: [&str; 21] = [
    "HOST",
    "PORT",
    "SERVER",
    "STT_SERVICE",
    "TTS_SERVICE",
    "LLM_SERVICE",
    "DEEPGRAM_API_KEY",
    "ELEVENLABS_API_KEY",
    "ELEVENLABS_VOICE_ID",
    "ELEVENLABS_MODEL_ID",
    "OPENAI_API_KEY",
    "OPENAI_MODEL",
    "GROQ_API_KEY",
    "GROQ_MODEL",
    "SYSTEM_MESSAGE",
    "INITIAL_MESSAGE",
    "MAX_TOOL_ROUNDS",
    "TWILIO_ACCOUNT_SID",
    "TWILIO_AUTH_TOKEN",
    "TRANSFER_NUMBERS",
    "TTS_MAX_CONCURRENT_REQUESTS",
];

/// Merge YAML configuration with environment variables
///
/// Priority order (highest to lowest):
/// 1. Environment variables
/// 2. YAML configuration values
/// 3. Default values
///
/// Empty environment variables are treated as unset.
pub fn merge_config(
    yaml_config: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let yaml = yaml_config.unwrap_or_default();
    let server = yaml.server.unwrap_or_default();
    let providers = yaml.providers.unwrap_or_default();
    let conversation = yaml.conversation.unwrap_or_default();
    let twilio = yaml.twilio.unwrap_or_default();

    // Helper macro for optional values: ENV > YAML
    macro_rules! get_optional {
        ($env_var:expr, $yaml_value:expr) => {
            env::var($env_var)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .or($yaml_value)
        };
    }

    // Helper macro to get value with priority: ENV > YAML > Default
    macro_rules! get_value {
        ($env_var:expr, $yaml_value:expr, $default:expr) => {
            get_optional!($env_var, $yaml_value).unwrap_or_else(|| $default.to_string())
        };
    }

    // Helper macro for numeric values: ENV (parsed) > YAML > Default
    macro_rules! get_number {
        ($env_var:expr, $ty:ty, $yaml_value:expr, $default:expr) => {
            match env::var($env_var).ok().filter(|v| !v.trim().is_empty()) {
                Some(raw) => raw
                    .trim()
                    .parse::<$ty>()
                    .map_err(|e| format!("Invalid {} environment variable: {e}", $env_var))?,
                None => $yaml_value.unwrap_or($default),
            }
        };
    }

    // Server configuration
    let host = get_value!("HOST", server.host, "0.0.0.0");
    let port = get_number!("PORT", u16, server.port, 3000);
    let public_host = get_optional!("SERVER", server.public_host);

    // Provider selection
    let stt_service = get_value!("STT_SERVICE", providers.stt, "deepgram").to_lowercase();
    let tts_service = get_value!("TTS_SERVICE", providers.tts, "deepgram").to_lowercase();
    let llm_service = get_value!("LLM_SERVICE", providers.llm, "openai").to_lowercase();

    // Provider credentials and models
    let deepgram_api_key = get_optional!("DEEPGRAM_API_KEY", providers.deepgram_api_key);
    let elevenlabs_api_key = get_optional!("ELEVENLABS_API_KEY", providers.elevenlabs_api_key);
    let elevenlabs_voice_id = get_optional!("ELEVENLABS_VOICE_ID", providers.elevenlabs_voice_id);
    let elevenlabs_model_id = get_optional!("ELEVENLABS_MODEL_ID", providers.elevenlabs_model_id);
    let openai_api_key = get_optional!("OPENAI_API_KEY", providers.openai_api_key);
    let openai_model = get_value!("OPENAI_MODEL", providers.openai_model, "gpt-4o-mini");
    let groq_api_key = get_optional!("GROQ_API_KEY", providers.groq_api_key);
    let groq_model = get_value!("GROQ_MODEL", providers.groq_model, "llama-3.1-8b-instant");
    let tts_max_concurrent_requests = get_number!(
        "TTS_MAX_CONCURRENT_REQUESTS",
        usize,
        providers.tts_max_concurrent_requests,
        10
    );

    // Conversation
    let system_message = get_value!(
        "SYSTEM_MESSAGE",
        conversation.system_message,
        DEFAULT_SYSTEM_MESSAGE
    );
    let initial_message = get_value!(
        "INITIAL_MESSAGE",
        conversation.initial_message,
        DEFAULT_INITIAL_MESSAGE
    );
    let max_tool_rounds = get_number!("MAX_TOOL_ROUNDS", usize, conversation.max_tool_rounds, 4);

    // Call control
    let twilio_account_sid = get_optional!("TWILIO_ACCOUNT_SID", twilio.account_sid);
    let twilio_auth_token = get_optional!("TWILIO_AUTH_TOKEN", twilio.auth_token);
    let transfer_numbers = match env::var("TRANSFER_NUMBERS")
        .ok()
        .filter(|v| !v.trim().is_empty())
    {
        Some(raw) => parse_transfer_numbers(&raw)
            .map_err(|e| format!("Invalid TRANSFER_NUMBERS environment variable: {e}"))?,
        None => twilio
            .transfer_numbers
            .unwrap_or_default()
            .into_iter()
            .map(|(department, number)| (department.to_lowercase(), number))
            .collect(),
    };

    Ok(ServerConfig {
        host,
        port,
        public_host,
        stt_service,
        tts_service,
        llm_service,
        deepgram_api_key,
        elevenlabs_api_key,
        elevenlabs_voice_id,
        elevenlabs_model_id,
        openai_api_key,
        openai_model,
        groq_api_key,
        groq_model,
        system_message,
        initial_message,
        max_tool_rounds,
        twilio_account_sid,
        twilio_auth_token,
        transfer_numbers,
        tts_max_concurrent_requests,
    })
}
