//! # Media Stream Handler Module
//!
//! WebSocket endpoint the telephony provider connects to once a call is answered. It
//! carries the caller's audio in and the bot's audio out, and is the [`Transport`] a
//! session plays through.
//!
//! ## Connection Flow
//! 1. The inbound-call webhook answers with TwiML pointing at `/connection`
//! 2. The provider connects and sends `connected`, then `start` with the stream and call ids
//! 3. The server starts a session and speaks the greeting
//! 4. Caller audio arrives as `media` frames; playback progress as `mark` frames
//! 5. `stop` or a closed socket ends the session
//!
//! ### Incoming Frames
//! - `{"event": "connected", "protocol": "Call"}`
//! - `{"event": "start", "start": {"streamSid": "MZ...", "callSid": "CA..."}}`
//! - `{"event": "media", "media": {"payload": "<base64 mu-law>"}}`
//! - `{"event": "mark", "mark": {"name": "<token>"}}`
//! - `{"event": "stop"}`
//!
//! ### Outgoing Frames
//! - `{"event": "media", "streamSid": "MZ...", "media": {"payload": "<base64 mu-law>"}}`
//! - `{"event": "mark", "streamSid": "MZ...", "mark": {"name": "<token>"}}`
//! - `{"event": "clear", "streamSid": "MZ..."}`
//!
//! [`Transport`]: crate::core::transport::Transport

mod error;
mod handler;
mod messages;
mod processor;
mod transport;


pub use error::{MediaStreamError, MediaStreamResult};
pub use handler::media_stream_handler;
pub use messages::{IncomingMessage, MarkPayload, MediaPayload, OutgoingMessage, StartMetadata};
pub use transport::MediaStreamTransport;
