//! Tools the model can invoke mid-turn.
//!
//! Every tool has a fixed line spoken out of band the moment it is invoked, and returns
//! a short textual result that is fed back to the model.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::base::ToolSpec;
use super::twilio::CallControl;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ToolError {
    #[error("Call control request failed: {0}")]
    Request(String),
    #[error("Call control provider error: {0}")]
    Provider(String),
}

pub type ToolResult<T> = Result<T, ToolError>;

/// What a tool knows about the call it runs in
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub call_sid: String,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON schema of the argument object
    fn parameters(&self) -> Value;

    /// Spoken immediately when the model invokes the tool
    fn say(&self) -> &'static str;

    /// No further generation happens in the turn after this tool runs
    fn ends_conversation(&self) -> bool {
        false
    }

    async fn invoke(&self, context: &ToolContext, args: Value) -> String;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Parse model-produced arguments, treating anything malformed as an empty object
pub fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => value,
        Ok(other) => {
            warn!("Tool arguments are not an object: {}", other);
            json!({})
        }
        Err(e) => {
            warn!("Invalid tool arguments {:?}: {}", raw, e);
            json!({})
        }
    }
}

const TERMINAL_STATUSES: [&str; 5] = ["completed", "failed", "busy", "no-answer", "canceled"];

/// Hangs up after giving the goodbye line time to play
pub struct EndCallTool {
    control: Option<Arc<dyn CallControl>>,
    grace_period: Duration,
}

impl EndCallTool {
    pub fn new(control: Option<Arc<dyn CallControl>>, grace_period: Duration) -> Self {
        Self {
            control,
            grace_period,
        }
    }
}

#[async_trait]
impl Tool for EndCallTool {
    fn name(&self) -> &'static str {
        "end_call"
    }

    fn description(&self) -> &'static str {
        "End the current call but always ask for confirmation unless its a natural place in the conversation to end the call."
    }

    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    fn say(&self) -> &'static str {
        "Thank you for your call. Goodbye."
    }

    fn ends_conversation(&self) -> bool {
        true
    }

    async fn invoke(&self, context: &ToolContext, _args: Value) -> String {
        let Some(control) = &self.control else {
            return "Error: No call control configured".to_string();
        };

        match control.call_status(&context.call_sid).await {
            Ok(status) if TERMINAL_STATUSES.contains(&status.as_str()) => {
                return format!("Call already ended with status: {status}");
            }
            Ok(_) => {}
            Err(e) => return format!("Error ending call: {e}"),
        }

        tokio::time::sleep(self.grace_period).await;

        match control.complete_call(&context.call_sid).await {
            Ok(status) => format!("Call ended successfully. Final status: {status}"),
            Err(e) => format!("Error ending call: {e}"),
        }
    }
}

/// Forwards the call to a department's number
pub struct TransferCallTool {
    control: Option<Arc<dyn CallControl>>,
    numbers: HashMap<String, String>,
}

impl TransferCallTool {
    pub fn new(control: Option<Arc<dyn CallControl>>, numbers: HashMap<String, String>) -> Self {
        let numbers = numbers
            .into_iter()
            .map(|(department, number)| (department.to_lowercase(), number))
            .collect();
        Self { control, numbers }
    }

    pub fn forward_url(number: &str) -> String {
        url::Url::parse_with_params("http://twimlets.com/forward", &[("PhoneNumber", number)])
            .map(|url| url.to_string())
            .unwrap_or_else(|_| format!("http://twimlets.com/forward?PhoneNumber={number}"))
    }
}

#[async_trait]
impl Tool for TransferCallTool {
    fn name(&self) -> &'static str {
        "transfer_call"
    }

    fn description(&self) -> &'static str {
        "Transfer the caller to another department when they ask for it or when the request is outside what you can help with."
    }

    fn parameters(&self) -> Value {
        let mut departments: Vec<&String> = self.numbers.keys().collect();
        departments.sort();
        json!({
            "type": "object",
            "properties": {
                "department": {
                    "type": "string",
                    "description": "Department to transfer to",
                    "enum": departments,
                }
            },
            "required": ["department"]
        })
    }

    fn say(&self) -> &'static str {
        "Transferring your call now."
    }

    async fn invoke(&self, context: &ToolContext, args: Value) -> String {
        let department = args
            .get("department")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let Some(number) = self.numbers.get(&department.to_lowercase()) else {
            return format!("Error: Department '{department}' not found.");
        };
        let Some(control) = &self.control else {
            return "Error: No call control configured".to_string();
        };

        match control
            .redirect_call(&context.call_sid, &Self::forward_url(number))
            .await
        {
            Ok(()) => {
                info!("Transferred {} to {}", context.call_sid, department);
                format!("Call transferred to {department} department.")
            }
            Err(e) => format!("Error transferring call: {e}"),
        }
    }
}

/// The tools offered to the model, looked up by name
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `end_call` always; `transfer_call` only when some department has a number
    pub fn standard(
        control: Option<Arc<dyn CallControl>>,
        transfer_numbers: HashMap<String, String>,
        end_call_grace: Duration,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(EndCallTool::new(control.clone(), end_call_grace)));
        if !transfer_numbers.is_empty() {
            registry.register(Arc::new(TransferCallTool::new(control, transfer_numbers)));
        }
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|tool| tool.name() == name).cloned()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|tool| tool.spec()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
