use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Environment variables can
/// override any values specified here.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3000
///   public_host: "bridge.example.com"
///
/// providers:
///   stt: "deepgram"
///   tts: "elevenlabs"
///   llm: "groq"
///   deepgram_api_key: "your-deepgram-key"
///   elevenlabs_api_key: "your-elevenlabs-key"
///   elevenlabs_voice_id: "21m00Tcm4TlvDq8ikWAM"
///   groq_api_key: "your-groq-key"
///   tts_max_concurrent_requests: 10
///
/// conversation:
///   system_message: "You are a helpful phone agent."
///   initial_message: "Hello! How can I help you today?"
///   max_tool_rounds: 4
///
/// twilio:
///   account_sid: "AC..."
///   auth_token: "..."
///   transfer_numbers:
///     billing: "+15550001"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub providers: Option<ProvidersYaml>,
    pub conversation: Option<ConversationYaml>,
    pub twilio: Option<TwilioYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_host: Option<String>,
}

/// Provider selection and credentials from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    pub stt: Option<String>,
    pub tts: Option<String>,
    pub llm: Option<String>,
    pub deepgram_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_voice_id: Option<String>,
    pub elevenlabs_model_id: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub groq_api_key: Option<String>,
    pub groq_model: Option<String>,
    pub tts_max_concurrent_requests: Option<usize>,
}

/// Conversation settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ConversationYaml {
    pub system_message: Option<String>,
    pub initial_message: Option<String>,
    pub max_tool_rounds: Option<usize>,
}

/// Call control settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TwilioYaml {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub transfer_numbers: Option<HashMap<String, String>>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080
providers:
  llm: "groq"
  groq_api_key: "gsk"
  tts_max_concurrent_requests: 3
conversation:
  max_tool_rounds: 6
twilio:
  transfer_numbers:
    sales: "+15550003"
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let server = config.server.unwrap();
        assert_eq!(server.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(server.port, Some(8080));

        let providers = config.providers.unwrap();
        assert_eq!(providers.llm.as_deref(), Some("groq"));
        assert_eq!(providers.tts_max_concurrent_requests, Some(3));

        assert_eq!(config.conversation.unwrap().max_tool_rounds, Some(6));
        assert_eq!(
            config.twilio.unwrap().transfer_numbers.unwrap()["sales"],
            "+15550003"
        );
    }

    #[test]
    fn test_empty_yaml() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.server.is_none());
        assert!(config.providers.is_none());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "server:\n  port: 4000\n").unwrap();

        let config = YamlConfig::from_file(&path).unwrap();
        assert_eq!(config.server.unwrap().port, Some(4000));
    }

    #[test]
    fn test_invalid_port_type() {
        let result: Result<YamlConfig, _> = serde_yaml::from_str("server:\n  port: \"abc\"\n");
        assert!(result.is_err());
    }
}
