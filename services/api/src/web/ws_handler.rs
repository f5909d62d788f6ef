//! services/api/src/web/ws_handler.rs
//!
//! The profile change feed. Each connection follows the signed-in user's
//! stores and forwards every published value to the browser.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::UserContext,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(context): Extension<Arc<UserContext>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, context))
}

async fn handle_socket(socket: WebSocket, context: Arc<UserContext>) {
    let user_id = context.session.current_identity().map(|i| i.id);
    info!("Profile feed opened for user {:?}", user_id);

    let (mut sender, mut receiver) = socket.split();

    // Each channel starts with the current value, so the client starts in sync.
    // The subscriptions end when these guards drop with the connection.
    let (_personal_sub, mut personal) = context.profile.personal_info_stream().updates();
    let (_financial_sub, mut financial) = context.profile.financial_goals_stream().updates();
    let (_completeness_sub, mut completeness) = context.profile.completeness_stream().updates();
    let (_session_sub, mut session) = context.session.updates();

    loop {
        let outgoing = tokio::select! {
            biased;
            Some(current) = session.recv() => {
                if current.is_some() {
                    continue;
                }
                let ended = ServerMessage::Error { message: "Session ended".to_string() };
                let _ = send_message(&mut sender, &ended).await;
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
            Some(info) = personal.recv() => ServerMessage::PersonalInfo {
                data: info.map(Into::into),
            },
            Some(goals) = financial.recv() => ServerMessage::FinancialGoals {
                data: goals.map(Into::into),
            },
            Some(value) = completeness.recv() => ServerMessage::Completeness { value },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match handle_text_message(text.as_str(), &context).await {
                        Some(reply) => reply,
                        None => continue,
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Client closed the profile feed.");
                    break;
                }
                Some(Err(e)) => {
                    warn!("WebSocket receive error: {}", e);
                    break;
                }
                Some(Ok(_)) => continue,
            },
        };

        if send_message(&mut sender, &outgoing).await.is_err() {
            info!("Client went away while sending.");
            break;
        }
    }

    info!("Profile feed closed for user {:?}", user_id);
}

/// Handles one client message. Returns a reply to send, if any.
async fn handle_text_message(text: &str, context: &UserContext) -> Option<ServerMessage> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Refresh) => {
            info!("Refresh requested on the profile feed.");
            // A successful reload republishes through the streams above.
            if let Err(e) = context.profile.initialize().await {
                error!("Failed to refresh profile: {:?}", e);
                return Some(ServerMessage::Error {
                    message: "Failed to refresh profile".to_string(),
                });
            }
            None
        }
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            None
        }
    }
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to encode feed message: {:?}", e);
            return Ok(());
        }
    };
    sender.send(Message::Text(json.into())).await
}
