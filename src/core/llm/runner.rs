//! One turn of reply generation, including tool invocations.
//!
//! A turn is a bounded sequence of completion rounds. A round streams text fragments
//! until the provider ends the response; if the response asked for tools, they run, their
//! results join the context and another round starts. The loop ends when a round requests
//! no tools, when a tool ends the conversation, or when the round limit is reached.
//!
//! Turns may overlap. Each one builds its messages privately and appends them to the shared
//! history only if it is still the current turn when it finishes, so a superseded turn
//! never leaves a partial exchange behind.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::base::{BaseLLM, ChatMessage, CompletionDelta, ToolCall};
use super::tools::{ToolContext, ToolRegistry, parse_arguments};
use crate::core::turn::TurnId;

/// Output of a turn, in the order it was produced
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyEvent {
    /// Raw reply text, not yet split into sentences
    Fragment(String),
    /// A tool's fixed line, spoken out of band
    Say(String),
    /// The turn finished normally
    Done,
    /// The turn was abandoned after a provider error
    Failed(String),
}

pub struct ReplyGenerator {
    llm: Arc<dyn BaseLLM>,
    tools: ToolRegistry,
    system_message: String,
    history: Mutex<Vec<ChatMessage>>,
    current_turn: Mutex<Option<TurnId>>,
    tool_context: ToolContext,
    max_tool_rounds: usize,
}

impl ReplyGenerator {
    /// The history opens as if the caller said hello and heard the greeting.
    pub fn new(
        llm: Arc<dyn BaseLLM>,
        tools: ToolRegistry,
        system_message: impl Into<String>,
        initial_message: impl Into<String>,
        tool_context: ToolContext,
        max_tool_rounds: usize,
    ) -> Self {
        Self {
            llm,
            tools,
            system_message: system_message.into(),
            history: Mutex::new(vec![
                ChatMessage::user("Hello"),
                ChatMessage::assistant(initial_message),
            ]),
            current_turn: Mutex::new(None),
            tool_context,
            max_tool_rounds: max_tool_rounds.max(1),
        }
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.history.lock().clone()
    }

    /// Make `turn` the only turn allowed to write history. Call before `run_turn`.
    pub fn begin_turn(&self, turn: TurnId) {
        *self.current_turn.lock() = Some(turn);
    }

    /// Supersede whatever turn is running, e.g. after a barge-in.
    pub fn interrupt(&self) {
        if let Some(turn) = self.current_turn.lock().take() {
            debug!("Reply for {} interrupted", turn);
        }
    }

    pub fn is_current(&self, turn: TurnId) -> bool {
        *self.current_turn.lock() == Some(turn)
    }

    fn messages(&self, pending: &[ChatMessage]) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(self.system_message.clone())];
        messages.extend(self.history.lock().iter().cloned());
        messages.extend(pending.iter().cloned());
        messages
    }

    /// Append the turn's messages, unless a newer turn took over meanwhile.
    fn commit(&self, turn: TurnId, pending: Vec<ChatMessage>) {
        let current = self.current_turn.lock();
        if *current == Some(turn) {
            self.history.lock().extend(pending);
        } else {
            debug!(
                "Discarding {} message(s) from superseded {}",
                pending.len(),
                turn
            );
        }
    }

    /// Generate the reply to `utterance` for `turn`. Reports exactly one `Done` or `Failed`,
    /// last. A turn that stops being current ends early with `Done` and commits nothing.
    pub async fn run_turn<F>(&self, turn: TurnId, utterance: &str, emit: F)
    where
        F: Fn(ReplyEvent) + Send + Sync,
    {
        let mut pending = vec![ChatMessage::user(utterance.trim())];
        let specs = self.tools.specs();

        for round in 0..self.max_tool_rounds {
            if !self.is_current(turn) {
                break;
            }

            let request = self.messages(&pending);
            let mut stream = match self.llm.stream_completion(&request, &specs).await {
                Ok(stream) => stream,
                Err(e) => {
                    error!("Completion request failed: {}", e);
                    emit(ReplyEvent::Failed(e.to_string()));
                    return;
                }
            };

            let mut reply = String::new();
            let mut calls: Vec<ToolCall> = Vec::new();
            while let Some(item) = stream.recv().await {
                match item {
                    Ok(CompletionDelta::Text(text)) => {
                        reply.push_str(&text);
                        emit(ReplyEvent::Fragment(text));
                    }
                    Ok(CompletionDelta::ToolCalls(requested)) => calls.extend(requested),
                    Err(e) => {
                        error!("Completion stream failed: {}", e);
                        emit(ReplyEvent::Failed(e.to_string()));
                        return;
                    }
                }
            }

            if !reply.is_empty() {
                pending.push(ChatMessage::assistant(reply));
            }
            if calls.is_empty() {
                self.commit(turn, pending);
                emit(ReplyEvent::Done);
                return;
            }
            if !self.is_current(turn) {
                break;
            }

            debug!("Round {} requested {} tool call(s)", round, calls.len());
            if self.run_tools(calls, &mut pending, &emit).await {
                self.commit(turn, pending);
                emit(ReplyEvent::Done);
                return;
            }

            if round + 1 == self.max_tool_rounds {
                warn!(
                    "Stopped after {} completion rounds with tool calls still pending",
                    self.max_tool_rounds
                );
            }
        }

        self.commit(turn, pending);
        emit(ReplyEvent::Done);
    }

    /// Returns `true` if a tool ended the conversation.
    async fn run_tools<F>(
        &self,
        calls: Vec<ToolCall>,
        pending: &mut Vec<ChatMessage>,
        emit: &F,
    ) -> bool
    where
        F: Fn(ReplyEvent) + Send + Sync,
    {
        pending.push(ChatMessage::assistant_tool_calls(calls.clone()));

        let mut ended = false;
        for call in calls {
            let name = call.function.name.as_str();
            let result = match self.tools.get(name) {
                Some(tool) => {
                    info!("Invoking tool {}", name);
                    emit(ReplyEvent::Say(tool.say().to_string()));
                    let args = parse_arguments(&call.function.arguments);
                    let result = tool.invoke(&self.tool_context, args).await;
                    ended |= tool.ends_conversation();
                    result
                }
                None => {
                    warn!("Model requested unknown tool {}", name);
                    format!("Error: unknown tool '{name}'")
                }
            };

            info!("Tool {} returned: {}", name, result);
            pending.push(ChatMessage::tool_result(call.id, result));
        }
        ended
    }
}
