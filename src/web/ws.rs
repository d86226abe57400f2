//! WebSocket side channel for opening projects in a local terminal.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use tracing::{debug, info, warn};

use crate::terminal::{self, OpenRequest};

/// `GET /ws` - upgrade and process open requests until the client leaves.
pub async fn ws_handler(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(handle_socket)
}

async fn handle_socket(mut socket: WebSocket) {
    debug!("Terminal channel connected");
    while let Some(msg) = socket.recv().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, "Failed to read WebSocket message");
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                if let Some(request) = parse_open_request(text.as_str()) {
                    launch(request);
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    debug!("Terminal channel closed");
}

/// Parse a `{terminal, path}` frame. Malformed frames are logged and dropped.
pub fn parse_open_request(raw: &str) -> Option<OpenRequest> {
    match serde_json::from_str::<OpenRequest>(raw) {
        Ok(request) => Some(request),
        Err(e) => {
            warn!(error = %e, "Ignoring malformed terminal request");
            None
        }
    }
}

fn launch(request: OpenRequest) {
    match terminal::open_terminal(&request.terminal, &request.path) {
        Ok(()) => info!(terminal = %request.terminal, path = %request.path, "Opened terminal"),
        Err(e) => warn!(terminal = %request.terminal, path = %request.path, error = %e, "Failed to open terminal"),
    }
}
