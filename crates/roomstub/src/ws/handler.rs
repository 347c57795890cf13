//! WebSocket handler for playback sessions.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, close_code},
    },
    response::Response,
};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::error::SessionError;
use crate::playback::{MatchPolicy, PlaybackEngine};
use crate::playbook::Playbook;

/// State shared by all connections of one playback server.
#[derive(Clone)]
pub struct WsState {
    playbook: Arc<Playbook>,
    policy: MatchPolicy,
    shutdown: CancellationToken,
    next_session: Arc<AtomicU64>,
}

impl WsState {
    pub fn new(playbook: Arc<Playbook>, policy: MatchPolicy, shutdown: CancellationToken) -> Self {
        Self {
            playbook,
            policy,
            shutdown,
            next_session: Arc::new(AtomicU64::new(1)),
        }
    }
}

/// Router answering a WebSocket upgrade on any path.
pub fn router(state: WsState) -> Router {
    Router::new()
        .fallback(ws_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// WebSocket upgrade handler.
pub async fn ws_handler(State(state): State<WsState>, ws: WebSocketUpgrade) -> Response {
    let session = state.next_session.fetch_add(1, Ordering::Relaxed);
    debug!(session, "WebSocket upgrade request");

    ws.on_upgrade(move |socket| {
        handle_session(socket, state).instrument(info_span!("session", id = session))
    })
}

/// Run one playback session and close the socket with a code matching the outcome.
async fn handle_session(mut socket: WebSocket, state: WsState) {
    info!("Client connected");
    let mut engine = PlaybackEngine::new(state.playbook, state.policy);

    let outcome = tokio::select! {
        outcome = engine.run(&mut socket) => Some(outcome),
        _ = state.shutdown.cancelled() => None,
    };
    let Some(outcome) = outcome else {
        info!("Server stopping, ending session");
        close(&mut socket, close_code::AWAY, "server shutting down").await;
        return;
    };

    match outcome {
        Ok(report) => {
            info!(
                responses = report.responses_sent,
                pushes = report.pushes_sent,
                mismatches = report.trigger_mismatches,
                "Playback complete"
            );
            close(&mut socket, close_code::NORMAL, "playback complete").await;
        }
        Err(err @ SessionError::Decode { .. }) => {
            warn!("Malformed client message: {}", err);
            close(&mut socket, close_code::INVALID, "malformed message").await;
        }
        Err(err @ SessionError::TriggerMismatch { .. }) => {
            warn!("Unexpected client message: {}", err);
            close(&mut socket, close_code::POLICY, "unexpected message").await;
        }
        Err(err) => {
            info!("Session aborted: {}", err);
        }
    }
}

async fn close(socket: &mut WebSocket, code: u16, reason: &'static str) {
    let frame = CloseFrame {
        code,
        reason: Utf8Bytes::from_static(reason),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        debug!("Failed to send close frame: {}", e);
    }
}
