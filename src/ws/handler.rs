//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::game::{ConnectionId, PaddleIntent};
use crate::matchmaking::{JoinOutcome, MatchmakingService};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sink, ws_stream) = socket.split();

    let (connection_id, outbound_rx) = state.matchmaking.register_connection();
    info!(connection_id = %connection_id, "New WebSocket connection");

    // Send welcome message
    let welcome = ServerMsg::Welcome {
        connection_id,
        server_time: unix_millis(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(connection_id = %connection_id, error = %e, "Failed to send welcome");
        state.matchmaking.unregister_connection(connection_id);
        return;
    }

    run_connection(connection_id, &state.matchmaking, ws_sink, ws_stream, outbound_rx).await;

    // Cleanup on disconnect
    state.matchmaking.unregister_connection(connection_id);

    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Run the connection with read/write split
async fn run_connection(
    connection_id: ConnectionId,
    matchmaking: &MatchmakingService,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    mut outbound_rx: mpsc::Receiver<ServerMsg>,
) {
    let rate_limiter = ConnectionRateLimiter::new();

    // Spawn writer task: outbound queue -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
                break;
            }
        }
        let _ = ws_sink.close().await;
    });

    // Reader loop: WebSocket -> matchmaking / intent
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => match ClientMsg::parse(&text) {
                Ok(client_msg) => {
                    handle_client_msg(connection_id, matchmaking, &rate_limiter, client_msg);
                }
                Err(e) => {
                    if rate_limiter.check_input() {
                        warn!(connection_id = %connection_id, error = %e, "Failed to parse client message");
                    }
                }
            },
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(connection_id = %connection_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(connection_id = %connection_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Abort writer task
    writer_handle.abort();
}

/// Apply one parsed client message.
///
/// Every frame counts against the input budget, but a paddle move over budget
/// is still applied so the latest intent always wins.
fn handle_client_msg(
    connection_id: ConnectionId,
    matchmaking: &MatchmakingService,
    rate_limiter: &ConnectionRateLimiter,
    msg: ClientMsg,
) {
    match msg {
        ClientMsg::JoinMatchmaking => {
            if !rate_limiter.check_input() || !rate_limiter.check_join() {
                warn!(connection_id = %connection_id, "Rate limited matchmaking join");
                return;
            }
            match matchmaking.join_matchmaking(connection_id) {
                JoinOutcome::Matched(session_id) => {
                    debug!(connection_id = %connection_id, session_id = %session_id, "Join completed a pairing");
                }
                outcome => {
                    debug!(connection_id = %connection_id, ?outcome, "Join handled");
                }
            }
        }
        ClientMsg::PaddleMove { direction } => {
            if !rate_limiter.check_input() {
                debug!(connection_id = %connection_id, "Paddle moves over input rate limit");
            }
            matchmaking.set_intent(connection_id, PaddleIntent::from(direction));
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
