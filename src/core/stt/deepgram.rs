//! Deepgram live transcription over WebSocket.
//!
//! Audio frames are forwarded as binary messages; `Results` messages become
//! [`STTEvent::Transcript`] and `UtteranceEnd` messages become [`STTEvent::UtteranceEnd`].
//! Messages that fail to parse are logged and dropped without tearing down the stream.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast, mpsc};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, warn};
use url::Url;

use super::base::{
    BaseSTT, STTConfig, STTConnectionState, STTError, STTEvent, STTEventCallback, STTResult,
};

pub const DEEPGRAM_LISTEN_URL: &str = "wss://api.deepgram.com/v1/listen";

/// Deepgram transcription response structure
#[derive(Debug, Deserialize, Serialize)]
pub struct DeepgramResponse {
    #[serde(rename = "type")]
    pub response_type: String,
    pub channel: Option<DeepgramChannel>,
    pub is_final: Option<bool>,
    pub speech_final: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DeepgramChannel {
    pub alternatives: Vec<DeepgramAlternative>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DeepgramAlternative {
    pub transcript: String,
    #[serde(default)]
    pub confidence: f32,
}

/// Deepgram error response structure
#[derive(Debug, Deserialize, Serialize)]
pub struct DeepgramError {
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(default)]
    pub description: String,
}

/// Deepgram STT WebSocket client
pub struct DeepgramSTT {
    config: STTConfig,
    state: Arc<RwLock<STTConnectionState>>,
    /// WebSocket sender for audio data
    ws_sender: Option<mpsc::UnboundedSender<Message>>,
    shutdown_tx: Option<broadcast::Sender<()>>,
    event_callback: Option<STTEventCallback>,
    connection_handle: Option<tokio::task::JoinHandle<()>>,
}

impl DeepgramSTT {
    /// Build the WebSocket URL with query parameters
    pub fn build_websocket_url(config: &STTConfig) -> Result<String, STTError> {
        let mut url = Url::parse(DEEPGRAM_LISTEN_URL)
            .map_err(|e| STTError::ConfigurationError(format!("Invalid WebSocket URL: {e}")))?;

        {
            let mut query_pairs = url.query_pairs_mut();
            query_pairs.append_pair("model", &config.model);
            query_pairs.append_pair("language", &config.language);
            query_pairs.append_pair("encoding", &config.encoding);
            query_pairs.append_pair("sample_rate", &config.sample_rate.to_string());
            query_pairs.append_pair("channels", &config.channels.to_string());
            query_pairs.append_pair("punctuate", &config.punctuation.to_string());
            query_pairs.append_pair("interim_results", "true");

            if let Some(endpointing) = config.endpointing_ms {
                query_pairs.append_pair("endpointing", &endpointing.to_string());
            }
            if let Some(utterance_end) = config.utterance_end_ms {
                query_pairs.append_pair("utterance_end_ms", &utterance_end.to_string());
            }
        }

        Ok(url.to_string())
    }

    /// Translate one provider message into an [`STTEvent`], if it carries one.
    pub fn parse_message(text: &str) -> Result<Option<STTEvent>, STTError> {
        let response: DeepgramResponse = serde_json::from_str(text)
            .map_err(|e| STTError::ProviderError(format!("Failed to parse response: {e}")))?;

        match response.response_type.as_str() {
            "Results" => {
                let Some(alternative) = response
                    .channel
                    .and_then(|channel| channel.alternatives.into_iter().next())
                else {
                    return Ok(None);
                };
                Ok(Some(STTEvent::Transcript(STTResult::new(
                    alternative.transcript,
                    response.is_final.unwrap_or(false),
                    response.speech_final.unwrap_or(false),
                    alternative.confidence,
                ))))
            }
            "UtteranceEnd" => Ok(Some(STTEvent::UtteranceEnd)),
            "Metadata" | "SpeechStarted" => Ok(None),
            "Error" => {
                let message = serde_json::from_str::<DeepgramError>(text)
                    .map(|e| format!("{}: {}", e.error_type, e.description))
                    .unwrap_or_else(|_| "Unknown error from Deepgram".to_string());
                Err(STTError::ProviderError(message))
            }
            other => {
                debug!("Ignoring Deepgram message type: {}", other);
                Ok(None)
            }
        }
    }

    async fn handle_websocket_message(message: Message, callback: Option<&STTEventCallback>) {
        match message {
            Message::Text(text) => match Self::parse_message(&text) {
                Ok(Some(event)) => {
                    if let Some(callback) = callback {
                        callback(event).await;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Dropping Deepgram message: {}", e),
            },
            Message::Close(close_frame) => {
                info!("Deepgram connection closed: {:?}", close_frame);
            }
            _ => {}
        }
    }

    async fn start_connection(&mut self) -> Result<(), STTError> {
        let ws_url = Self::build_websocket_url(&self.config)?;

        let request = tokio_tungstenite::tungstenite::http::Request::builder()
            .uri(&ws_url)
            .header("Authorization", format!("token {}", self.config.api_key))
            .header("Sec-WebSocket-Protocol", "token")
            .header("Host", "api.deepgram.com")
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Sec-WebSocket-Version", "13")
            .header(
                "Sec-WebSocket-Key",
                tokio_tungstenite::tungstenite::handshake::client::generate_key(),
            )
            .body(())
            .map_err(|e| STTError::ConfigurationError(format!("Invalid request: {e}")))?;

        let (ws_tx, mut ws_rx) = mpsc::unbounded_channel::<Message>();
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);

        self.ws_sender = Some(ws_tx);
        self.shutdown_tx = Some(shutdown_tx);

        let state = self.state.clone();
        let callback = self.event_callback.clone();

        let connection_handle = tokio::spawn(async move {
            *state.write().await = STTConnectionState::Connecting;

            let (ws_stream, _) = match connect_async(request).await {
                Ok(result) => result,
                Err(e) => {
                    error!("Failed to connect to Deepgram: {}", e);
                    *state.write().await = STTConnectionState::Error(format!("Connection failed: {e}"));
                    return;
                }
            };

            info!("Connected to Deepgram WebSocket");
            *state.write().await = STTConnectionState::Connected;

            let (mut ws_sink, mut ws_stream) = ws_stream.split();

            loop {
                tokio::select! {
                    Some(message) = ws_rx.recv() => {
                        if let Err(e) = ws_sink.send(message).await {
                            error!("Failed to send audio to Deepgram: {}", e);
                            break;
                        }
                    }
                    message = ws_stream.next() => {
                        match message {
                            Some(Ok(msg)) => {
                                Self::handle_websocket_message(msg, callback.as_ref()).await;
                            }
                            Some(Err(e)) => {
                                error!("Deepgram WebSocket error: {}", e);
                                break;
                            }
                            None => {
                                info!("Deepgram stream ended");
                                break;
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        // Ask Deepgram to flush and close gracefully
                        let _ = ws_sink
                            .send(Message::Text(r#"{"type":"CloseStream"}"#.into()))
                            .await;
                        break;
                    }
                }
            }

            *state.write().await = STTConnectionState::Disconnected;
            info!("Deepgram WebSocket connection closed");
        });

        self.connection_handle = Some(connection_handle);

        // Wait for connection to be established
        for _ in 0..50 {
            match &*self.state.read().await {
                STTConnectionState::Connected => return Ok(()),
                STTConnectionState::Error(reason) => {
                    return Err(STTError::ConnectionFailed(reason.clone()));
                }
                _ => {}
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        Err(STTError::ConnectionFailed("Connection timeout".to_string()))
    }
}

#[async_trait::async_trait]
impl BaseSTT for DeepgramSTT {
    fn new(config: STTConfig) -> Result<Self, STTError> {
        if config.api_key.is_empty() {
            return Err(STTError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }

        Ok(Self {
            config,
            state: Arc::new(RwLock::new(STTConnectionState::Disconnected)),
            ws_sender: None,
            shutdown_tx: None,
            event_callback: None,
            connection_handle: None,
        })
    }

    async fn connect(&mut self) -> Result<(), STTError> {
        self.start_connection().await?;
        info!("Successfully connected to Deepgram STT");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), STTError> {
        if let Some(shutdown_tx) = &self.shutdown_tx {
            let _ = shutdown_tx.send(());
        }

        if let Some(handle) = self.connection_handle.take() {
            let _ = timeout(Duration::from_secs(5), handle).await;
        }

        self.ws_sender = None;
        self.shutdown_tx = None;
        *self.state.write().await = STTConnectionState::Disconnected;

        info!("Disconnected from Deepgram STT");
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ws_sender.is_some()
    }

    async fn send_audio(&mut self, audio_data: Vec<u8>) -> Result<(), STTError> {
        let Some(ws_sender) = &self.ws_sender else {
            return Err(STTError::ConnectionFailed(
                "Not connected to Deepgram".to_string(),
            ));
        };

        let len = audio_data.len();
        ws_sender
            .send(Message::Binary(audio_data.into()))
            .map_err(|e| STTError::NetworkError(format!("Failed to send audio data: {e}")))?;

        debug!("Sent {} bytes of audio data", len);
        Ok(())
    }

    async fn on_event(&mut self, callback: STTEventCallback) -> Result<(), STTError> {
        self.event_callback = Some(callback);
        Ok(())
    }

    fn get_config(&self) -> Option<&STTConfig> {
        Some(&self.config)
    }

    fn get_provider_info(&self) -> &'static str {
        "Deepgram STT WebSocket v1.0"
    }
}

impl Drop for DeepgramSTT {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = &self.shutdown_tx {
            let _ = shutdown_tx.send(());
        }
    }
}
