//! Media stream frame types
//!
//! Every frame is a JSON object tagged by its `event` field. Fields this service does not
//! use (sequence numbers, timestamps, track names) are accepted and ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Frames sent by the telephony provider
#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum IncomingMessage {
    Connected {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        protocol: Option<String>,
    },
    Start {
        start: StartMetadata,
    },
    Media {
        media: MediaPayload,
    },
    Mark {
        mark: MarkPayload,
    },
    Stop {
        #[serde(
            rename = "streamSid",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        stream_sid: Option<String>,
    },
}

/// Stream metadata carried by the `start` frame
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StartMetadata {
    pub stream_sid: String,
    pub call_sid: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_parameters: HashMap<String, String>,
}

/// Base64 encoded audio
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MediaPayload {
    pub payload: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MarkPayload {
    pub name: String,
}

/// Frames sent to the telephony provider
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum OutgoingMessage {
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: MediaPayload,
    },
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: MarkPayload,
    },
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}
