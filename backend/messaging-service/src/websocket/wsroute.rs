use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc::unbounded_channel;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    middleware::guards::{ConversationMember, User},
    state::AppState,
    websocket::events::WsEvent,
};

/// Frames a connected client may send.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    /// Join a conversation room (membership is re-verified per room).
    Subscribe { conversation_id: Uuid },
    TypingStart { conversation_id: Uuid },
    TypingStop { conversation_id: Uuid },
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    user: User,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, user.id))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: Uuid) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = unbounded_channel::<Message>();

    // Every connection listens on the caller's personal room.
    state.registry.subscribe_user(user_id, tx.clone()).await;

    let forward = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = stream.next().await {
        let Message::Text(text) = msg else {
            if matches!(msg, Message::Close(_)) {
                break;
            }
            continue;
        };

        let frame: ClientFrame = match serde_json::from_str(&text) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(%user_id, error = %e, "ignoring malformed ws frame");
                continue;
            }
        };

        match frame {
            ClientFrame::Subscribe { conversation_id } => {
                match ConversationMember::verify(&state.db, user_id, conversation_id).await {
                    Ok(_) => {
                        state
                            .registry
                            .subscribe_conversation(conversation_id, tx.clone())
                            .await;
                    }
                    Err(e) => {
                        warn!(%user_id, %conversation_id, error = %e, "ws subscribe rejected");
                    }
                }
            }
            ClientFrame::TypingStart { conversation_id } => {
                relay_typing(&state, user_id, conversation_id, true).await;
            }
            ClientFrame::TypingStop { conversation_id } => {
                relay_typing(&state, user_id, conversation_id, false).await;
            }
        }
    }

    forward.abort();
}

/// Typing indicators are relayed to the room, never persisted.
async fn relay_typing(state: &AppState, user_id: Uuid, conversation_id: Uuid, started: bool) {
    if ConversationMember::verify(&state.db, user_id, conversation_id)
        .await
        .is_err()
    {
        return;
    }
    let event = if started {
        WsEvent::TypingStarted { conversation_id }
    } else {
        WsEvent::TypingStopped { conversation_id }
    };
    state
        .registry
        .broadcast_conversation(conversation_id, Message::Text(event.to_payload(Some(user_id))))
        .await;
}
