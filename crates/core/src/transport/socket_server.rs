use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::publish::connection_tracker::ConnectionTracker;
use crate::shared::constants::SESSION_CHANNEL_CAPACITY;
use crate::transport::engine_io::{self, PROTOCOL_VERSION};
use crate::transport::socket_session::{SessionAction, SocketSession};
use crate::transport::websocket_sink::WebSocketSink;

/// Shared by every connection handler.
#[derive(Clone)]
pub struct SocketServerState {
    pub tracker: ConnectionTracker,
    pub ping_interval: Duration,
    pub ping_timeout: Duration,
    /// Flips to true when the process is shutting down.
    pub shutdown: watch::Receiver<bool>,
}

/// HTTP routes: the Socket.IO endpoint and a health check.
pub fn router(state: SocketServerState) -> Router {
    Router::new()
        .route("/socket.io/", get(socket_io_handler))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(Arc::new(state))
}

async fn socket_io_handler(
    State(state): State<Arc<SocketServerState>>,
    Query(params): Query<HashMap<String, String>>,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    if params.get("EIO").map(String::as_str) != Some(PROTOCOL_VERSION) {
        return (StatusCode::BAD_REQUEST, "unsupported protocol version").into_response();
    }
    if params.get("transport").map(String::as_str) != Some("websocket") {
        return (StatusCode::BAD_REQUEST, "only the websocket transport is supported")
            .into_response();
    }
    let Some(ws) = ws else {
        return (StatusCode::BAD_REQUEST, "expected a WebSocket upgrade").into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<SocketServerState>) {
    let mut session = SocketSession::new();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(SESSION_CHANNEL_CAPACITY);
    let mut shutdown = state.shutdown.clone();

    let open = session.open(
        state.ping_interval.as_millis() as u64,
        state.ping_timeout.as_millis() as u64,
    );
    if ws_tx.send(Message::Text(open)).await.is_err() {
        return;
    }

    let mut ping = tokio::time::interval(state.ping_interval);
    // The first tick completes immediately; the first ping is due one
    // interval after the handshake.
    ping.tick().await;
    let mut pong_deadline: Option<Instant> = None;

    loop {
        let actions = tokio::select! {
            incoming = ws_rx.next() => match incoming {
                Some(Ok(Message::Text(text))) => session.on_text(&text),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => Vec::new(),
                Some(Err(e)) => {
                    log::debug!("WebSocket error for {}: {e}", session.id());
                    break;
                }
            },
            Some(message) = outbound_rx.recv() => {
                if ws_tx.send(Message::Text(message)).await.is_err() {
                    break;
                }
                Vec::new()
            },
            _ = ping.tick() => session.on_ping_tick(),
            _ = pong_wait(pong_deadline) => session.on_pong_timeout(),
            _ = shutdown.changed() => {
                let _ = ws_tx.send(Message::Text(engine_io::disconnect_packet())).await;
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            },
        };

        if !apply(&actions, &session, &state, &outbound_tx, &mut ws_tx).await {
            break;
        }
        pong_deadline = match (session.is_awaiting_pong(), pong_deadline) {
            (true, None) => Some(Instant::now() + state.ping_timeout),
            (true, deadline) => deadline,
            (false, _) => None,
        };
    }

    for action in session.on_closed() {
        if action == SessionAction::Unsubscribe {
            state.tracker.on_disconnect(session.id());
        }
    }
}

/// Resolves at `deadline`, or never when no pong is outstanding.
async fn pong_wait(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Runs `actions` in order. Returns false when the connection should end.
async fn apply<S>(
    actions: &[SessionAction],
    session: &SocketSession,
    state: &SocketServerState,
    outbound_tx: &mpsc::Sender<String>,
    ws_tx: &mut S,
) -> bool
where
    S: futures_util::Sink<Message> + Unpin,
{
    for action in actions {
        match action {
            SessionAction::Reply(text) => {
                if ws_tx.send(Message::Text(text.clone())).await.is_err() {
                    return false;
                }
            }
            SessionAction::Subscribe => {
                let sink = WebSocketSink::new(outbound_tx.clone());
                state.tracker.on_connect(session.id().clone(), Box::new(sink));
            }
            SessionAction::Unsubscribe => state.tracker.on_disconnect(session.id()),
            SessionAction::Close => {
                let _ = ws_tx.send(Message::Close(None)).await;
                return false;
            }
        }
    }
    true
}
