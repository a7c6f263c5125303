//! HTTP and WebSocket front end.
//!
//! Routes:
//! - `GET /` and `GET /ws`: WebSocket upgrade, one socket per player
//! - `GET /health`: liveness probe
//! - `GET /state`: JSON snapshot of the match

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

use crate::coordinator::Event;
use crate::protocol::{ClientMessage, Outbound};
use crate::session::ConnId;
use crate::worker::GameHandle;

/// Build the router around a running game worker.
pub fn router(game: GameHandle) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(ws_upgrade))
        .route("/ws", get(ws_upgrade))
        .route("/health", get(health))
        .route("/state", get(state))
        .layer(cors)
        .with_state(game)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn state(State(game): State<GameHandle>) -> Response {
    match game.snapshot().await {
        Some(snapshot) => Json(snapshot).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "game worker stopped").into_response(),
    }
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(game): State<GameHandle>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, game))
}

/// Pump one client socket until either side closes it.
async fn handle_socket(socket: WebSocket, game: GameHandle) {
    let conn = game.next_conn_id();
    info!(conn, "Client connected");

    let (mut sink, mut stream) = socket.split();
    let (outbox, mut inbox) = mpsc::unbounded_channel::<Outbound>();
    game.connect(conn, outbox);

    let mut writer = tokio::spawn(async move {
        while let Some(outbound) = inbox.recv().await {
            match outbound {
                Outbound::Message(message) => {
                    if sink.send(Message::Text(message.to_json().into())).await.is_err() {
                        break;
                    }
                }
                Outbound::Close => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            _ = &mut writer => break,
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => game.send(inbound(conn, text.as_str())),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!(conn, error = %e, "Socket error");
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    info!(conn, "Client disconnected");
    game.send(Event::Disconnected(conn));
    writer.abort();
}

fn inbound(conn: ConnId, text: &str) -> Event {
    match ClientMessage::parse(text) {
        Ok(request) => Event::Request(conn, request),
        Err(err) => Event::Malformed(conn, err),
    }
}
