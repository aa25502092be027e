//! Configuration module for the voxbridge server
//!
//! This module handles server configuration from various sources: YAML files and
//! environment variables. Environment variables always override YAML values.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `utils`: Utility functions for configuration parsing
//!
//! # Example
//! ```rust,no_run
//! use voxbridge::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

mod env;
mod merge;
mod utils;
mod validation;
mod yaml;

pub use utils::parse_transfer_numbers;

pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful phone agent. Keep your answers short and conversational, one or two sentences at a time.";
pub const DEFAULT_INITIAL_MESSAGE: &str = "Hello! How can I help you today?";

/// Server configuration
///
/// Contains all configuration needed to run the voxbridge server, including:
/// - Server settings (host, port, public host name)
/// - Provider selection and API keys
/// - Conversation settings (system prompt, greeting, tool round limit)
/// - Call control credentials and transfer numbers
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Public host name used in the media stream URL handed to the telephony provider
    pub public_host: Option<String>,

    // Provider selection
    pub stt_service: String,
    pub tts_service: String,
    pub llm_service: String,

    // Provider credentials and models
    pub deepgram_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_voice_id: Option<String>,
    pub elevenlabs_model_id: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub groq_api_key: Option<String>,
    pub groq_model: String,

    // Conversation
    pub system_message: String,
    pub initial_message: String,
    pub max_tool_rounds: usize,

    // Call control
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    /// Department name (lowercase) to phone number
    pub transfer_numbers: HashMap<String, String>,

    /// Upper bound on concurrent outbound provider requests
    pub tts_max_concurrent_requests: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            public_host: None,
            stt_service: "deepgram".to_string(),
            tts_service: "deepgram".to_string(),
            llm_service: "openai".to_string(),
            deepgram_api_key: None,
            elevenlabs_api_key: None,
            elevenlabs_voice_id: None,
            elevenlabs_model_id: None,
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            groq_api_key: None,
            groq_model: "llama-3.1-8b-instant".to_string(),
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            initial_message: DEFAULT_INITIAL_MESSAGE.to_string(),
            max_tool_rounds: 4,
            twilio_account_sid: None,
            twilio_auth_token: None,
            transfer_numbers: HashMap::new(),
            tts_max_concurrent_requests: 10,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable overrides
    ///
    /// Priority order (highest to lowest):
    /// 1. Environment variables
    /// 2. YAML file values
    /// 3. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        // .env is not loaded here: with an explicit YAML file only real
        // environment variables override it.
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;

        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get API key for a specific provider
    ///
    /// # Arguments
    /// * `provider` - The name of the provider (e.g., "deepgram", "elevenlabs", "openai", "groq")
    ///
    /// # Returns
    /// * `Result<String, String>` - The API key on success, or an error message on failure
    pub fn get_api_key(&self, provider: &str) -> Result<String, String> {
        let (key, env_name) = match provider.to_lowercase().as_str() {
            "deepgram" => (&self.deepgram_api_key, "DEEPGRAM_API_KEY"),
            "elevenlabs" => (&self.elevenlabs_api_key, "ELEVENLABS_API_KEY"),
            "openai" => (&self.openai_api_key, "OPENAI_API_KEY"),
            "groq" => (&self.groq_api_key, "GROQ_API_KEY"),
            _ => return Err(format!("Unsupported provider: {provider}")),
        };

        key.clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| format!("{provider} API key not configured. Set {env_name}"))
    }

    pub fn has_call_control(&self) -> bool {
        self.twilio_account_sid.is_some() && self.twilio_auth_token.is_some()
    }
}
