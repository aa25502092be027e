mod base;
pub mod deepgram;

// Re-export public types and traits
pub use base::{
    BaseSTT, STTConfig, STTConnectionState, STTError, STTEvent, STTEventCallback, STTResult,
};

pub use deepgram::DeepgramSTT;

/// Supported STT providers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum STTProvider {
    /// Deepgram live transcription WebSocket API
    Deepgram,
}

impl std::fmt::Display for STTProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            STTProvider::Deepgram => write!(f, "deepgram"),
        }
    }
}

impl std::str::FromStr for STTProvider {
    type Err = STTError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deepgram" => Ok(STTProvider::Deepgram),
            _ => Err(STTError::ConfigurationError(format!(
                "Unsupported STT provider: {s}. Supported providers: deepgram"
            ))),
        }
    }
}

/// Factory function to create STT providers by name
///
/// # Examples
/// ```rust,no_run
/// use voxbridge::core::stt::{create_stt_provider, STTConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = STTConfig {
///     api_key: "your-deepgram-api-key".to_string(),
///     ..Default::default()
/// };
/// let stt = create_stt_provider("deepgram", config)?;
/// assert!(!stt.is_ready());
/// # Ok(())
/// # }
/// ```
pub fn create_stt_provider(
    provider: &str,
    config: STTConfig,
) -> Result<Box<dyn BaseSTT>, STTError> {
    let provider_enum: STTProvider = provider.parse()?;

    match provider_enum {
        STTProvider::Deepgram => {
            let deepgram_stt = <DeepgramSTT as BaseSTT>::new(config)?;
            Ok(Box::new(deepgram_stt))
        }
    }
}

/// Get a list of all supported STT providers
pub fn get_supported_stt_providers() -> Vec<&'static str> {
    vec!["deepgram"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parsing() {
        assert_eq!("deepgram".parse::<STTProvider>().unwrap(), STTProvider::Deepgram);
        assert_eq!("DeepGram".parse::<STTProvider>().unwrap(), STTProvider::Deepgram);
        assert!("whisper".parse::<STTProvider>().is_err());
        assert_eq!(STTProvider::Deepgram.to_string(), "deepgram");
    }

    #[test]
    fn test_create_stt_provider() {
        let config = STTConfig {
            api_key: "test_key".to_string(),
            ..Default::default()
        };

        let stt = create_stt_provider("deepgram", config).unwrap();
        assert_eq!(stt.get_provider_info(), "Deepgram STT WebSocket v1.0");

        let result = create_stt_provider("unknown", STTConfig::default());
        assert!(matches!(result, Err(STTError::ConfigurationError(_))));
        assert_eq!(get_supported_stt_providers(), vec!["deepgram"]);
    }
}
