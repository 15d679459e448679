//! JSON routes for page scripts and scripted clients.
//!
//! Errors come back as `{error, code}` with a status picked from the error
//! kind; coordinator failures during an analysis are reported as events, not
//! here.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use crate::dom::PageSnapshot;
use crate::frame::{ErrorCode, ExtractReply, SaveKeyReply, StatusReply, TabId};
use crate::scraper::ChatMessage;
use crate::services::analysis::{self, AnalysisError};
use crate::state::AppState;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

fn error_response(status: StatusCode, err: &impl ErrorCode) -> Response {
    (status, Json(ErrorBody { error: err.to_string(), code: err.error_code() })).into_response()
}

pub(crate) fn analysis_error_status(err: &AnalysisError) -> StatusCode {
    match err {
        AnalysisError::InvalidApiKey => StatusCode::BAD_REQUEST,
        AnalysisError::CredentialMissing => StatusCode::PRECONDITION_FAILED,
        AnalysisError::ExtractionFailed | AnalysisError::NoMessagesFound => StatusCode::UNPROCESSABLE_ENTITY,
        AnalysisError::Transport(_) | AnalysisError::Parse | AnalysisError::MalformedResponse(_) => {
            StatusCode::BAD_GATEWAY
        }
        AnalysisError::Superseded => StatusCode::CONFLICT,
        AnalysisError::Settings(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Serialize)]
pub struct SnapshotResponse {
    pub platform: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveKeyBody {
    pub api_key: String,
}

#[derive(Deserialize)]
pub struct PushMessagesBody {
    pub messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
pub struct Accepted {
    pub accepted: bool,
}

/// `GET /api/status`: the coordinator's `getAnalysisStatus`.
pub async fn status(State(state): State<AppState>) -> Json<StatusReply> {
    Json(analysis::analysis_status(&state).await)
}

/// `PUT /api/tabs/:tab_id/snapshot`: store the page's current document.
pub async fn put_snapshot(
    State(state): State<AppState>,
    Path(tab_id): Path<TabId>,
    Json(snapshot): Json<PageSnapshot>,
) -> Response {
    match state.snapshots.publish(tab_id, &snapshot).await {
        Ok(platform) => Json(SnapshotResponse { platform }).into_response(),
        Err(err) => {
            tracing::warn!(%tab_id, %err, "api: snapshot rejected");
            error_response(StatusCode::BAD_REQUEST, &err)
        }
    }
}

/// `DELETE /api/tabs/:tab_id`: the tab closed or navigated away.
pub async fn forget_tab(State(state): State<AppState>, Path(tab_id): Path<TabId>) -> StatusCode {
    if state.snapshots.forget(tab_id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// `GET /api/tabs/:tab_id/messages`: `extractMessages` without analysis.
pub async fn tab_messages(State(state): State<AppState>, Path(tab_id): Path<TabId>) -> Response {
    match analysis::extract_messages(&state, tab_id).await {
        Ok(reply) => Json::<ExtractReply>(reply).into_response(),
        Err(err) => error_response(analysis_error_status(&err), &err),
    }
}

/// `POST /api/tabs/:tab_id/analysis`: `startAnalysis`. The outcome arrives
/// as events.
pub async fn start_analysis(State(state): State<AppState>, Path(tab_id): Path<TabId>) -> (StatusCode, Json<Accepted>) {
    tokio::spawn(async move {
        if let Err(err) = analysis::start_analysis(&state, tab_id).await {
            tracing::debug!(%tab_id, %err, "api: analysis ended without result");
        }
    });
    (StatusCode::ACCEPTED, Json(Accepted { accepted: true }))
}

/// `POST /api/messages`: `messagesExtracted` pushed by a page script.
pub async fn push_messages(
    State(state): State<AppState>,
    Json(body): Json<PushMessagesBody>,
) -> (StatusCode, Json<Accepted>) {
    let accepted = analysis::messages_extracted(&state, &body.messages).await.is_some();
    (StatusCode::OK, Json(Accepted { accepted }))
}

/// `PUT /api/settings/api-key`: `saveApiKey`.
pub async fn save_api_key(State(state): State<AppState>, Json(body): Json<SaveKeyBody>) -> Response {
    match analysis::save_api_key(&state, &body.api_key).await {
        Ok(()) => Json(SaveKeyReply { success: true, error: None }).into_response(),
        Err(err) => {
            let status = analysis_error_status(&err);
            (status, Json(SaveKeyReply { success: false, error: Some(err.to_string()) })).into_response()
        }
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
