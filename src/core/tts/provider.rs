use std::sync::Arc;

use tracing::{debug, error};

use super::base::{TTSConfig, TTSError, TTSResult};
use crate::utils::req_manager::ReqManager;

/// Trait for creating HTTP requests for TTS providers
pub trait TTSRequestBuilder: Send + Sync {
    /// Build the HTTP request with provider-specific URL, headers and body.
    /// This is the only provider-specific part that needs to be implemented.
    fn build_http_request(&self, client: &reqwest::Client, text: &str) -> reqwest::RequestBuilder;

    /// Get the configuration for this request builder
    fn get_config(&self) -> &TTSConfig;
}

/// Generic HTTP-based TTS request execution using the shared [`ReqManager`]
#[derive(Clone)]
pub struct TTSProvider {
    req_manager: Arc<ReqManager>,
}

impl TTSProvider {
    pub fn new(req_manager: Arc<ReqManager>) -> Self {
        Self { req_manager }
    }

    pub fn req_manager(&self) -> &Arc<ReqManager> {
        &self.req_manager
    }

    /// Send one synthesis request and return the full response body.
    pub async fn send_request<R: TTSRequestBuilder>(
        &self,
        request_builder: &R,
        text: &str,
    ) -> TTSResult<Vec<u8>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TTSError::AudioGenerationFailed(
                "Nothing to synthesize".to_string(),
            ));
        }

        let client_guard = self
            .req_manager
            .acquire()
            .await
            .map_err(|e| TTSError::NetworkError(format!("Failed to acquire client: {e}")))?;

        let request = request_builder.build_http_request(client_guard.client(), text);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                client_guard.record(false);
                error!("TTS request failed: {}", e);
                return Err(TTSError::NetworkError(e.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            client_guard.record(false);
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("TTS API error ({}): {}", status, error_body);
            return Err(TTSError::ProviderError(format!(
                "API error ({status}): {error_body}"
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            client_guard.record(false);
            TTSError::NetworkError(format!("Failed to read audio body: {e}"))
        })?;
        client_guard.record(true);

        debug!(
            "Synthesized {} bytes for: {} ({})",
            bytes.len(),
            text,
            request_builder.get_config().provider
        );
        Ok(bytes.to_vec())
    }
}

/// Duration of single-byte-per-sample audio such as mu-law
pub fn mulaw_duration_ms(byte_len: usize, sample_rate: u32) -> Option<u32> {
    if sample_rate == 0 {
        return None;
    }
    Some(((byte_len as u64 * 1000) / sample_rate as u64) as u32)
}
