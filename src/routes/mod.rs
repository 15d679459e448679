//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Popups talk to the coordinator over `/api/ws`; page scripts upload
//! snapshots and push messages over plain JSON routes. Everything shares one
//! `AppState`.

pub mod api;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/ws", get(ws::handle_ws))
        .route("/api/status", get(api::status))
        .route("/api/messages", post(api::push_messages))
        .route("/api/settings/api-key", put(api::save_api_key))
        .route("/api/tabs/{tab_id}", delete(api::forget_tab))
        .route("/api/tabs/{tab_id}/snapshot", put(api::put_snapshot))
        .route("/api/tabs/{tab_id}/messages", get(api::tab_messages))
        .route("/api/tabs/{tab_id}/analysis", post(api::start_analysis))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
