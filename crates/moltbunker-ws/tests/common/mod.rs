//! Local WebSocket servers for session tests.

#![allow(dead_code)]

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

pub type ServerSocket = WebSocketStream<TcpStream>;

/// Generous bound for anything that should happen "promptly".
pub const STEP: Duration = Duration::from_secs(5);

/// What the client presented during the upgrade.
#[derive(Debug, Clone)]
pub struct Handshake {
    pub path: String,
    pub query: String,
    pub authorization: Option<String>,
}

/// Bind an ephemeral port. Returns the listener and its `http://` base URL.
pub async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, format!("http://{}", addr))
}

/// Accept one WebSocket client.
pub async fn accept(listener: &TcpListener) -> (ServerSocket, Handshake) {
    let (stream, _) = tokio::time::timeout(STEP, listener.accept())
        .await
        .expect("client did not connect")
        .unwrap();

    let mut seen = None;
    let ws = tokio_tungstenite::accept_hdr_async(
        stream,
        |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            seen = Some(Handshake {
                path: req.uri().path().to_string(),
                query: req.uri().query().unwrap_or_default().to_string(),
                authorization: req
                    .headers()
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string),
            });
            Ok(resp)
        },
    )
    .await
    .unwrap();
    (ws, seen.unwrap())
}

/// Accept one TCP connection and refuse the upgrade with `status`.
pub async fn refuse(listener: &TcpListener, status: StatusCode) {
    let (stream, _) = listener.accept().await.unwrap();
    let _ = tokio_tungstenite::accept_hdr_async(
        stream,
        move |_: &Request, _: Response| -> Result<Response, ErrorResponse> {
            let mut refusal = ErrorResponse::new(None);
            *refusal.status_mut() = status;
            Err(refusal)
        },
    )
    .await;
}

/// Next data message (text or binary), skipping control frames.
pub async fn next_message(ws: &mut ServerSocket) -> Option<Message> {
    loop {
        match tokio::time::timeout(STEP, ws.next()).await.ok()?? {
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => continue,
            Ok(message) => return Some(message),
            Err(_) => return None,
        }
    }
}

/// Next message, or `None` if nothing arrives within `wait`.
pub async fn maybe_message(ws: &mut ServerSocket, wait: Duration) -> Option<Message> {
    tokio::time::timeout(wait, next_message(ws)).await.ok().flatten()
}

/// Next text message parsed as JSON.
pub async fn next_json(ws: &mut ServerSocket) -> Value {
    match next_message(ws).await {
        Some(Message::Text(text)) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("expected text message, got {other:?}"),
    }
}

/// Next binary message.
pub async fn next_binary(ws: &mut ServerSocket) -> Vec<u8> {
    match next_message(ws).await {
        Some(Message::Binary(data)) => data.to_vec(),
        other => panic!("expected binary message, got {other:?}"),
    }
}

pub async fn send_json(ws: &mut ServerSocket, value: Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

pub async fn send_text(ws: &mut ServerSocket, text: &str) {
    ws.send(Message::Text(text.into())).await.unwrap();
}

pub async fn send_binary(ws: &mut ServerSocket, bytes: &[u8]) {
    ws.send(Message::Binary(bytes.to_vec().into())).await.unwrap();
}

/// Channel names of a subscribe/unsubscribe message, sorted.
pub fn channels_of(message: &Value) -> Vec<String> {
    let mut channels: Vec<String> = message["data"]["channels"]
        .as_array()
        .expect("channels array")
        .iter()
        .map(|c| c.as_str().unwrap().to_string())
        .collect();
    channels.sort();
    channels
}
