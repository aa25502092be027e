//! OpenAI-compatible streaming chat completions (OpenAI and Groq).

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use super::base::{
    BaseLLM, ChatMessage, CompletionDelta, CompletionStream, FunctionCall, LLMConfig, LLMError,
    LLMResult, ToolCall, ToolSpec,
};
use crate::utils::req_manager::ReqManager;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

#[derive(Debug, Deserialize)]
struct ChunkResponse {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCallFragment>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallFragment {
    #[serde(default)]
    index: usize,
    id: Option<String>,
    function: Option<FunctionFragment>,
}

#[derive(Debug, Deserialize)]
struct FunctionFragment {
    name: Option<String>,
    arguments: Option<String>,
}

/// Splits a server-sent-events byte stream into `data:` payloads.
///
/// Bytes are held until a full line arrives, so a multibyte character split across
/// network chunks decodes intact.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\r', '\n']);
            if let Some(data) = line.strip_prefix("data:") {
                payloads.push(data.trim_start().to_string());
            }
        }
        payloads
    }
}

/// Collects tool call fragments, which arrive split across many chunks, keyed by index.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: BTreeMap<usize, ToolCall>,
}

impl ToolCallAccumulator {
    fn push(&mut self, fragment: ToolCallFragment) {
        let call = self.calls.entry(fragment.index).or_insert_with(|| ToolCall {
            id: String::new(),
            kind: "function".to_string(),
            function: FunctionCall {
                name: String::new(),
                arguments: String::new(),
            },
        });

        if let Some(id) = fragment.id {
            call.id = id;
        }
        if let Some(function) = fragment.function {
            if let Some(name) = function.name {
                call.function.name.push_str(&name);
            }
            if let Some(arguments) = function.arguments {
                call.function.arguments.push_str(&arguments);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn take(&mut self) -> Vec<ToolCall> {
        std::mem::take(&mut self.calls).into_values().collect()
    }
}

/// Turns each `data:` payload into zero or more deltas
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    tool_calls: ToolCallAccumulator,
    done: bool,
}

impl ChunkDecoder {
    pub fn decode(&mut self, payload: &str) -> LLMResult<Vec<CompletionDelta>> {
        if payload == "[DONE]" {
            self.done = true;
            return Ok(self.flush());
        }

        let chunk: ChunkResponse = serde_json::from_str(payload)
            .map_err(|e| LLMError::StreamError(format!("Malformed chunk: {e}")))?;

        let mut deltas = Vec::new();
        for choice in chunk.choices {
            if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                deltas.push(CompletionDelta::Text(content));
            }
            for fragment in choice.delta.tool_calls.unwrap_or_default() {
                self.tool_calls.push(fragment);
            }
            if choice.finish_reason.as_deref() == Some("tool_calls") {
                deltas.extend(self.flush());
            }
        }
        Ok(deltas)
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Surface tool calls still being accumulated when the stream ends
    pub fn flush(&mut self) -> Vec<CompletionDelta> {
        if self.tool_calls.is_empty() {
            Vec::new()
        } else {
            vec![CompletionDelta::ToolCalls(self.tool_calls.take())]
        }
    }
}

/// Chat-completions client for any OpenAI-compatible endpoint
pub struct OpenAICompatibleLLM {
    config: LLMConfig,
    base_url: String,
    req_manager: Arc<ReqManager>,
}

impl OpenAICompatibleLLM {
    pub fn new(config: LLMConfig, req_manager: Arc<ReqManager>) -> LLMResult<Self> {
        if config.api_key.is_empty() {
            return Err(LLMError::ConfigurationError(format!(
                "API key is required for {}",
                config.provider
            )));
        }

        let base_url = match (&config.base_url, config.provider.to_lowercase().as_str()) {
            (Some(url), _) => url.trim_end_matches('/').to_string(),
            (None, "openai") => OPENAI_BASE_URL.to_string(),
            (None, "groq") => GROQ_BASE_URL.to_string(),
            (None, other) => {
                return Err(LLMError::ConfigurationError(format!(
                    "Unsupported LLM provider: {other}. Supported providers: openai, groq"
                )));
            }
        };

        Ok(Self {
            config,
            base_url,
            req_manager,
        })
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn request_body(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "stream": true,
        });
        if !tools.is_empty() {
            body["tools"] = tools.iter().map(ToolSpec::to_openai).collect();
        }
        body
    }
}

#[async_trait]
impl BaseLLM for OpenAICompatibleLLM {
    async fn stream_completion(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> LLMResult<CompletionStream> {
        let response = {
            let guard = self
                .req_manager
                .acquire()
                .await
                .map_err(|e| LLMError::NetworkError(format!("Failed to acquire client: {e}")))?;

            let result = guard
                .client()
                .post(self.completions_url())
                .bearer_auth(&self.config.api_key)
                .json(&self.request_body(messages, tools))
                .send()
                .await;
            guard.record(matches!(&result, Ok(r) if r.status().is_success()));
            result.map_err(|e| LLMError::NetworkError(e.to_string()))?
        };

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Completion API error ({}): {}", status, body);
            return Err(LLMError::ProviderError(format!(
                "API error ({status}): {body}"
            )));
        }

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            let mut lines = SseLineBuffer::default();
            let mut decoder = ChunkDecoder::default();
            let mut body = response.bytes_stream();

            while let Some(item) = body.next().await {
                let bytes = match item {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx.send(Err(LLMError::StreamError(e.to_string()))).await;
                        return;
                    }
                };

                for payload in lines.push(&bytes) {
                    match decoder.decode(&payload) {
                        Ok(deltas) => {
                            for delta in deltas {
                                if tx.send(Ok(delta)).await.is_err() {
                                    debug!("Completion consumer went away");
                                    return;
                                }
                            }
                        }
                        Err(e) => warn!("Dropping completion chunk: {}", e),
                    }
                    if decoder.is_done() {
                        return;
                    }
                }
            }

            for delta in decoder.flush() {
                let _ = tx.send(Ok(delta)).await;
            }
        });

        Ok(rx)
    }

    fn get_provider_info(&self) -> &'static str {
        if self.config.provider.eq_ignore_ascii_case("groq") {
            "groq"
        } else {
            "openai"
        }
    }
}
