use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::media_stream;
use crate::state::AppState;
use std::sync::Arc;

/// Create the media stream router
///
/// The telephony provider connects here after the inbound-call webhook answers with
/// a `<Stream>` instruction. The endpoint is unauthenticated; protect it at the network
/// or proxy layer.
pub fn create_ws_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/connection", get(media_stream::media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
