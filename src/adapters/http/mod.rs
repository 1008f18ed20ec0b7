pub mod routes;
pub mod state;
pub mod ws;

use axum::{routing::{delete, get, post}, Router};
use crate::adapters::http::state::HttpState;
use crate::adapters::http::ws::ws_handler;

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/api/status", get(routes::get_status))
        .route("/api/search/start", post(routes::start_search))
        .route("/api/search/stop", post(routes::stop_search))
        .route("/api/disconnect", post(routes::disconnect))
        .route("/api/streaming/prepare", post(routes::prepare_streaming))
        .route("/api/streaming/leave", post(routes::leave_streaming))
        .route("/api/stream/start", post(routes::start_stream))
        .route("/api/stream/stop", post(routes::stop_stream))
        .route("/api/frame", get(routes::get_frame))
        .route(
            "/api/photo",
            get(routes::get_photo).post(routes::take_photo).delete(routes::clear_photo),
        )
        .route("/api/error", delete(routes::clear_error))
        .route("/api/settings", get(routes::get_settings))
        .route(
            "/api/settings/api-key",
            post(routes::save_api_key).delete(routes::delete_api_key),
        )
        .route("/api/settings/model", post(routes::select_model))
        .route("/api/settings/language", post(routes::select_language))
        .route("/api/settings/quality", post(routes::select_quality))
        .route("/api/conversations", delete(routes::delete_conversations))
        .route("/ws/stream", get(ws_handler))
        .with_state(state)
}
