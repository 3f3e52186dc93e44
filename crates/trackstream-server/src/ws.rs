//! `WebSocket` handler for the feature stream.
//!
//! Clients connect to `GET /` (or `GET /ws`), send the handshake as their
//! first text frame, and then receive a `featureResult` page on every
//! broadcast tick. The socket is split: this task reads and drives the
//! [`Session`], while [`pump_outbound`] writes on its own task so a slow
//! reader on the client side never blocks inbound processing.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::WebSocket;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::StreamExt;
use tracing::debug;

use crate::session::{Flow, Session, pump_outbound};
use crate::state::AppState;

/// How long the writer may take to flush queued frames after the reader ends.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Upgrade an HTTP request to a stream socket.
///
/// # Route
///
/// `GET /`, `GET /ws`
pub async fn ws_stream(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Run one connection until the client leaves, breaks protocol, or the
/// service stops.
async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
    let (sink, mut stream) = socket.split();
    let (mut session, channel) = Session::open(Arc::clone(&state.hub));
    let id = session.id();
    debug!(connection = %id, "WebSocket client connected");

    let mut writer = tokio::spawn(pump_outbound(channel, sink));
    let mut writer_finished = false;

    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(message)) => {
                        if session.on_message(message) == Flow::Close {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(connection = %id, "WebSocket error: {e}");
                        break;
                    }
                    None => break,
                }
            }
            _ = &mut writer => {
                writer_finished = true;
                break;
            }
            () = state.control.stopped() => {
                session.close();
                break;
            }
        }
    }

    // Unregistering drops the hub's sender, so the writer ends once the
    // queue is flushed.
    drop(session);
    if !writer_finished && tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        writer.abort();
    }

    debug!(connection = %id, "WebSocket client disconnected");
}
