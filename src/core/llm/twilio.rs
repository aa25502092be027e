//! Live-call control through the Twilio REST API.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, info};

use super::tools::{ToolError, ToolResult};
use crate::utils::req_manager::ReqManager;

pub const TWILIO_API_URL: &str = "https://api.twilio.com";

/// Operations tools perform on the call they run in
#[async_trait]
pub trait CallControl: Send + Sync {
    /// Current call status (`in-progress`, `completed`, ...)
    async fn call_status(&self, call_sid: &str) -> ToolResult<String>;

    /// Hang up. Returns the status reported afterwards.
    async fn complete_call(&self, call_sid: &str) -> ToolResult<String>;

    /// Point the call at new TwiML instructions
    async fn redirect_call(&self, call_sid: &str, twiml_url: &str) -> ToolResult<()>;
}

#[derive(Debug, Deserialize)]
struct CallResource {
    status: String,
}

pub struct TwilioCallControl {
    account_sid: String,
    auth_token: String,
    base_url: String,
    req_manager: Arc<ReqManager>,
}

impl TwilioCallControl {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        req_manager: Arc<ReqManager>,
    ) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            base_url: TWILIO_API_URL.to_string(),
            req_manager,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn call_url(&self, call_sid: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls/{}.json",
            self.base_url, self.account_sid, call_sid
        )
    }

    async fn send(&self, form: Option<&[(&str, &str)]>, call_sid: &str) -> ToolResult<CallResource> {
        let guard = self
            .req_manager
            .acquire()
            .await
            .map_err(|e| ToolError::Request(e.to_string()))?;

        let url = self.call_url(call_sid);
        let request = match form {
            Some(form) => guard.client().post(&url).form(form),
            None => guard.client().get(&url),
        };

        let response = request
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await
            .map_err(|e| {
                guard.record(false);
                ToolError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            guard.record(false);
            let body = response.text().await.unwrap_or_default();
            error!("Twilio API error ({}): {}", status, body);
            return Err(ToolError::Provider(format!("Twilio API error ({status}): {body}")));
        }
        guard.record(true);

        response
            .json::<CallResource>()
            .await
            .map_err(|e| ToolError::Provider(format!("Unexpected Twilio response: {e}")))
    }
}

#[async_trait]
impl CallControl for TwilioCallControl {
    async fn call_status(&self, call_sid: &str) -> ToolResult<String> {
        Ok(self.send(None, call_sid).await?.status)
    }

    async fn complete_call(&self, call_sid: &str) -> ToolResult<String> {
        let call = self.send(Some(&[("Status", "completed")]), call_sid).await?;
        info!("Completed call {}: {}", call_sid, call.status);
        Ok(call.status)
    }

    async fn redirect_call(&self, call_sid: &str, twiml_url: &str) -> ToolResult<()> {
        self.send(Some(&[("Url", twiml_url), ("Method", "POST")]), call_sid)
            .await?;
        info!("Redirected call {} to {}", call_sid, twiml_url);
        Ok(())
    }
}
