//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::PlayerId;
use crate::session::manager::Frame;
use crate::util::rate_limit::{InputKind, PlayerRateLimiter};
use crate::ws::protocol::{parse_client_msg, ClientMsg, ServerMsg};

/// Inbound text frames above this size are dropped unparsed
pub const MAX_FRAME_BYTES: usize = 1024;

/// Hard transport cap; frames this large close the socket
const MAX_TRANSPORT_BYTES: usize = 16 * 1024;

type WsSink = SplitSink<WebSocket, Message>;
type WsStream = SplitStream<WebSocket>;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.max_message_size(MAX_TRANSPORT_BYTES)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sink, ws_stream) = socket.split();

    let admission = match state.connections.admit() {
        Ok(admission) => admission,
        Err(e) => {
            info!(error = %e, "Rejecting connection");
            let _ = send_msg(&mut ws_sink, &ServerMsg::Full).await;
            let _ = ws_sink.send(Message::Close(None)).await;
            return;
        }
    };
    let player_id = admission.player_id;
    let session_id = admission.session_id;

    // Init goes out before the writer starts, so it precedes every snapshot
    if let Err(e) = send_msg(&mut ws_sink, &ServerMsg::Init { id: player_id }).await {
        error!(player_id, error = %e, "Failed to send init");
        state.connections.release(player_id, session_id);
        return;
    }

    if state.match_handle.join(player_id).await.is_err() {
        error!(player_id, "Match task gone, dropping connection");
        state.connections.release(player_id, session_id);
        return;
    }

    let writer_handle = tokio::spawn(write_outbox(player_id, ws_sink, admission.outbox_rx));

    read_inputs(player_id, session_id, ws_stream, &state).await;

    // Leave must be queued before the id can be handed out again
    let _ = state.match_handle.leave(player_id).await;
    state.connections.release(player_id, session_id);
    writer_handle.abort();

    info!(player_id, session_id = %session_id, "WebSocket connection closed");
}

/// Writer task: outbox frames -> WebSocket
async fn write_outbox(player_id: PlayerId, mut ws_sink: WsSink, mut outbox_rx: mpsc::Receiver<Frame>) {
    while let Some(frame) = outbox_rx.recv().await {
        if let Err(e) = ws_sink.send(Message::Text(frame.to_string())).await {
            debug!(player_id, error = %e, "WebSocket send failed");
            break;
        }
    }
    debug!(player_id, "Writer finished");
}

/// Reader loop: WebSocket -> match task
async fn read_inputs(player_id: PlayerId, session_id: Uuid, mut ws_stream: WsStream, state: &AppState) {
    let rate_limiter = PlayerRateLimiter::new(state.config.input_rate_limit);

    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if text.len() > MAX_FRAME_BYTES {
                    warn!(player_id, bytes = text.len(), "Oversized frame dropped");
                    continue;
                }
                let Some(msg) = parse_client_msg(&text) else {
                    warn!(player_id, "Malformed client message dropped");
                    continue;
                };

                let kind = match msg {
                    ClientMsg::Move { .. } => InputKind::Move,
                    ClientMsg::Shoot { .. } => InputKind::Shoot,
                };
                if !rate_limiter.check_input(kind) {
                    debug!(player_id, kind = ?kind, "Rate limited input message");
                    continue;
                }

                if state.match_handle.input(player_id, msg).await.is_err() {
                    debug!(player_id, "Match task gone");
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(player_id, session_id = %session_id, "Client initiated close");
                break;
            }
            Err(e) => {
                debug!(player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut WsSink, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
