mod base;
pub mod openai;
pub mod runner;
pub mod tools;
pub mod twilio;

pub use base::{
    BaseLLM, ChatMessage, CompletionDelta, CompletionStream, FunctionCall, LLMConfig, LLMError,
    LLMResult, ToolCall, ToolSpec,
};
pub use openai::{GROQ_BASE_URL, OPENAI_BASE_URL, OpenAICompatibleLLM};
pub use runner::{ReplyEvent, ReplyGenerator};
pub use tools::{
    EndCallTool, Tool, ToolContext, ToolError, ToolRegistry, ToolResult, TransferCallTool,
};
pub use twilio::{CallControl, TwilioCallControl};

use std::sync::Arc;

use crate::utils::req_manager::ReqManager;

/// Factory function to create a completion provider by name (`openai` or `groq`)
pub fn create_llm_provider(
    config: LLMConfig,
    req_manager: Arc<ReqManager>,
) -> LLMResult<Arc<dyn BaseLLM>> {
    Ok(Arc::new(OpenAICompatibleLLM::new(config, req_manager)?))
}

/// Get a list of all supported completion providers
pub fn get_supported_llm_providers() -> Vec<&'static str> {
    vec!["openai", "groq"]
}
