//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check and inbound-call webhook
//! - `media_stream` - WebSocket media stream carrying call audio

pub mod api;
pub mod media_stream;

// Re-export commonly used handlers for convenient access
pub use media_stream::media_stream_handler;
