//! Fakes shared by the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use voxbridge::core::llm::{
    BaseLLM, ChatMessage, CompletionDelta, CompletionStream, LLMError, LLMResult, ToolRegistry,
    ToolSpec,
};
use voxbridge::core::stt::{BaseSTT, STTConfig, STTError, STTEvent, STTEventCallback, STTResult};
use voxbridge::core::transport::{Transport, TransportResult};
use voxbridge::core::tts::{AudioData, BaseTTS, TTSError, TTSResult};
use voxbridge::ProviderSet;

pub type CallbackSlot = Arc<Mutex<Option<STTEventCallback>>>;

pub fn audio(text: &str) -> String {
    STANDARD.encode(text)
}

pub fn final_transcript(text: &str) -> STTEvent {
    STTEvent::Transcript(STTResult::new(text.to_string(), true, true, 0.9))
}

pub fn interim_transcript(text: &str) -> STTEvent {
    STTEvent::Transcript(STTResult::new(text.to_string(), false, false, 0.5))
}

/// Poll until `check` holds or a second has passed
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Playback(String),
    Mark(String),
    Clear,
}

#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<Sent>>,
}

impl RecordingTransport {
    pub fn playbacks(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter_map(|s| match s {
                Sent::Playback(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn marks(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter_map(|s| match s {
                Sent::Mark(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clears(&self) -> usize {
        self.sent.lock().iter().filter(|s| **s == Sent::Clear).count()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_playback(&self, payload: &str) -> TransportResult<()> {
        self.sent.lock().push(Sent::Playback(payload.to_string()));
        Ok(())
    }

    async fn send_mark(&self, token: &str) -> TransportResult<()> {
        self.sent.lock().push(Sent::Mark(token.to_string()));
        Ok(())
    }

    async fn send_clear(&self) -> TransportResult<()> {
        self.sent.lock().push(Sent::Clear);
        Ok(())
    }
}

/// Recognizer whose callback the test drives directly
pub struct FakeSTT {
    config: STTConfig,
    slot: CallbackSlot,
    audio: Arc<Mutex<Vec<u8>>>,
    connected: bool,
}

#[async_trait]
impl BaseSTT for FakeSTT {
    fn new(config: STTConfig) -> Result<Self, STTError> {
        Ok(Self {
            config,
            slot: Arc::default(),
            audio: Arc::default(),
            connected: false,
        })
    }

    async fn connect(&mut self) -> Result<(), STTError> {
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), STTError> {
        self.connected = false;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.connected
    }

    async fn send_audio(&mut self, audio_data: Vec<u8>) -> Result<(), STTError> {
        self.audio.lock().extend(audio_data);
        Ok(())
    }

    async fn on_event(&mut self, callback: STTEventCallback) -> Result<(), STTError> {
        *self.slot.lock() = Some(callback);
        Ok(())
    }

    fn get_config(&self) -> Option<&STTConfig> {
        Some(&self.config)
    }

    fn get_provider_info(&self) -> &'static str {
        "fake"
    }
}

/// Echoes the sentence text as audio. Sentences containing "slow" take longer,
/// sentences containing "fail" are rejected.
pub struct EchoTTS;

#[async_trait]
impl BaseTTS for EchoTTS {
    async fn synthesize(&self, text: &str) -> TTSResult<AudioData> {
        if text.contains("fail") {
            return Err(TTSError::ProviderError("synthesis rejected".to_string()));
        }
        if text.contains("slow") {
            tokio::time::sleep(Duration::from_millis(80)).await;
        }
        Ok(AudioData {
            data: text.as_bytes().to_vec(),
            sample_rate: 8000,
            format: "mulaw".to_string(),
            duration_ms: None,
        })
    }
}

/// Plays back one scripted stream per completion request
pub struct ScriptedLLM {
    rounds: Mutex<VecDeque<Vec<LLMResult<CompletionDelta>>>>,
    pub requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedLLM {
    pub fn new(rounds: Vec<Vec<LLMResult<CompletionDelta>>>) -> Self {
        Self {
            rounds: Mutex::new(rounds.into()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl BaseLLM for ScriptedLLM {
    async fn stream_completion(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolSpec],
    ) -> LLMResult<CompletionStream> {
        self.requests.lock().push(messages.to_vec());
        let Some(round) = self.rounds.lock().pop_front() else {
            return Err(LLMError::ProviderError("script exhausted".to_string()));
        };

        let (tx, rx) = mpsc::channel(round.len().max(1));
        for delta in round {
            let _ = tx.try_send(delta);
        }
        Ok(rx)
    }

    fn get_provider_info(&self) -> &'static str {
        "scripted"
    }
}

pub fn text(t: &str) -> LLMResult<CompletionDelta> {
    Ok(CompletionDelta::Text(t.to_string()))
}

/// Every session gets a [`FakeSTT`] whose callback lands in `slot`
pub struct FakeProviders {
    pub slot: CallbackSlot,
    pub audio: Arc<Mutex<Vec<u8>>>,
    pub llm: Arc<ScriptedLLM>,
    pub tools: ToolRegistry,
}

impl FakeProviders {
    pub fn new(rounds: Vec<Vec<LLMResult<CompletionDelta>>>) -> Self {
        Self {
            slot: Arc::default(),
            audio: Arc::default(),
            llm: Arc::new(ScriptedLLM::new(rounds)),
            tools: ToolRegistry::new(),
        }
    }

    pub async fn emit(&self, event: STTEvent) {
        let callback = self.slot.lock().clone().expect("session not started");
        callback(event).await;
    }
}

impl ProviderSet for FakeProviders {
    fn speech_to_text(&self) -> Result<Box<dyn BaseSTT>, STTError> {
        Ok(Box::new(FakeSTT {
            config: STTConfig::default(),
            slot: self.slot.clone(),
            audio: self.audio.clone(),
            connected: false,
        }))
    }

    fn text_to_speech(&self) -> Arc<dyn BaseTTS> {
        Arc::new(EchoTTS)
    }

    fn completion(&self) -> Arc<dyn BaseLLM> {
        self.llm.clone()
    }

    fn tools(&self) -> ToolRegistry {
        self.tools.clone()
    }
}
