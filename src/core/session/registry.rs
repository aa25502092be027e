//! Active calls known to this process.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub stream_sid: String,
    pub call_sid: String,
    /// Unix timestamp in milliseconds
    pub started_at: u64,
}

impl SessionInfo {
    pub fn new(stream_sid: impl Into<String>, call_sid: impl Into<String>) -> Self {
        let started_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        Self {
            stream_sid: stream_sid.into(),
            call_sid: call_sid.into(),
            started_at,
        }
    }
}

/// Sessions keyed by call sid
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionInfo>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry this one replaced, if the call was already registered.
    pub fn register(&self, info: SessionInfo) -> Option<SessionInfo> {
        self.sessions.write().insert(info.call_sid.clone(), info)
    }

    pub fn remove(&self, call_sid: &str) -> Option<SessionInfo> {
        self.sessions.write().remove(call_sid)
    }

    pub fn get(&self, call_sid: &str) -> Option<SessionInfo> {
        self.sessions.read().get(call_sid).cloned()
    }

    pub fn contains(&self, call_sid: &str) -> bool {
        self.sessions.read().contains_key(call_sid)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
