//! WebSocket handler — popup session relay.
//!
//! DESIGN
//! ======
//! On upgrade, creates a connection id and a [`Presenter`], renders the
//! restored view, then enters a `select!` loop:
//! - Incoming popup frames → parse + dispatch by action
//! - Coordinator events → forward the event plus a fresh render
//!
//! `startAnalysis` runs on its own task; its progress reaches every popup
//! through the event broadcast, this one included.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `render` for the restored view
//! 2. Popup sends requests → dispatch → replies carry `parentId`
//! 3. Events arrive → `event` + `render` frames
//! 4. Close → drop the subscription

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::frame::{Event, Frame, Inbound, Outbound, Request, SaveKeyReply};
use crate::presenter::Presenter;
use crate::services::analysis::{self, AnalysisError};
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    let mut events = state.events.subscribe();
    let mut presenter = Presenter::new();

    let welcome = restore_frame(&state, &mut presenter).await;
    if send_frame(&mut socket, &welcome).await.is_err() {
        return;
    }
    info!(%conn_id, "ws: popup connected");

    loop {
        let frames = tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => process_inbound_text(&state, &mut presenter, conn_id, &text).await,
                    Message::Close(_) => break,
                    _ => continue,
                }
            }
            event = events.recv() => match event {
                Ok(event) => event_frames(&mut presenter, event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%conn_id, skipped, "ws: event stream lagged, resyncing");
                    vec![restore_frame(&state, &mut presenter).await]
                }
                Err(RecvError::Closed) => break,
            },
        };
        if send_all(&mut socket, &frames).await.is_err() {
            break;
        }
    }

    info!(%conn_id, "ws: popup disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse and handle one inbound text frame; returns frames for this popup.
pub(crate) async fn process_inbound_text(
    state: &AppState,
    presenter: &mut Presenter,
    conn_id: Uuid,
    text: &str,
) -> Vec<Frame> {
    let inbound: Inbound = match serde_json::from_str(text) {
        Ok(inbound) => inbound,
        Err(e) => {
            warn!(%conn_id, error = %e, "ws: invalid inbound frame");
            let body = Outbound::Error { error: format!("invalid request: {e}"), code: "E_BAD_REQUEST".into() };
            return vec![Frame::reply(None, body)];
        }
    };

    let id = inbound.id;
    info!(%conn_id, action = inbound.request.action(), "ws: recv");

    match inbound.request {
        Request::StartAnalysis { tab_id } => {
            let has_key = match analysis::has_credential(state).await {
                Ok(has_key) => has_key,
                Err(e) => return vec![Frame::error_from(id, &AnalysisError::from(e))],
            };
            let (view, go) = presenter.analyze_clicked(has_key);
            if go {
                let state = state.clone();
                tokio::spawn(async move {
                    if let Err(err) = analysis::start_analysis(&state, tab_id).await {
                        debug!(%tab_id, %err, "ws: analysis ended without result");
                    }
                });
            }
            vec![Frame::reply(id, Outbound::Render { view })]
        }
        Request::GetAnalysisStatus => {
            vec![Frame::reply(id, Outbound::Status(analysis::analysis_status(state).await))]
        }
        Request::MessagesExtracted { messages } => {
            let state = state.clone();
            tokio::spawn(async move {
                if let Some(Err(err)) = analysis::messages_extracted(&state, &messages).await {
                    debug!(%err, "ws: pushed messages ended without result");
                }
            });
            Vec::new()
        }
        Request::ExtractMessages { tab_id } => match analysis::extract_messages(state, tab_id).await {
            Ok(reply) => vec![Frame::reply(id, Outbound::Extract(reply))],
            Err(e) => vec![Frame::error_from(id, &e)],
        },
        Request::SaveApiKey { api_key } => match analysis::save_api_key(state, &api_key).await {
            Ok(()) => vec![
                Frame::reply(id, Outbound::ApiKey(SaveKeyReply { success: true, error: None })),
                Frame::reply(id, Outbound::Render { view: presenter.key_saved() }),
            ],
            Err(AnalysisError::InvalidApiKey) => vec![
                Frame::reply(
                    id,
                    Outbound::ApiKey(SaveKeyReply {
                        success: false,
                        error: Some(AnalysisError::InvalidApiKey.to_string()),
                    }),
                ),
                Frame::reply(id, Outbound::Render { view: presenter.key_rejected() }),
            ],
            Err(e) => vec![Frame::reply(
                id,
                Outbound::ApiKey(SaveKeyReply { success: false, error: Some(e.to_string()) }),
            )],
        },
    }
}

/// An event for the popup, then the view it leads to.
fn event_frames(presenter: &mut Presenter, event: Event) -> Vec<Frame> {
    let view = presenter.apply(&event);
    vec![Frame::push(Outbound::Event(event)), Frame::push(Outbound::Render { view })]
}

async fn restore_frame(state: &AppState, presenter: &mut Presenter) -> Frame {
    let has_key = match analysis::has_credential(state).await {
        Ok(has_key) => has_key,
        Err(e) => {
            warn!(error = %e, "ws: credential lookup failed");
            false
        }
    };
    let status = analysis::analysis_status(state).await;
    Frame::push(Outbound::Render { view: presenter.restore(has_key, &status) })
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_all(socket: &mut WebSocket, frames: &[Frame]) -> Result<(), ()> {
    for frame in frames {
        send_frame(socket, frame).await?;
    }
    Ok(())
}

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    if let Outbound::Error { code, error } = &frame.body {
        warn!(parent_id = ?frame.parent_id, code, error, "ws: send error frame");
    } else {
        debug!(parent_id = ?frame.parent_id, bytes = json.len(), "ws: send frame");
    }
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
