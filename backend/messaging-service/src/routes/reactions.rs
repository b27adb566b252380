use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::guards::{ConversationMember, User as AuthUser},
    models::ReactionDto,
    services::{fanout, message_service::MessageService},
    state::AppState,
    websocket::events::WsEvent,
};

#[derive(Deserialize)]
pub struct ToggleReactionRequest {
    pub emoji: String,
}

#[derive(Serialize)]
pub struct ReactionsResponse {
    pub message_id: Uuid,
    pub reactions: Vec<ReactionDto>,
}

/// POST /messages/:id/reactions
/// Toggle the caller's reaction: create when absent, remove on the same
/// emoji, replace on a different one. Responds with the message's current
/// reaction list.
pub async fn toggle_reaction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(message_id): Path<Uuid>,
    Json(body): Json<ToggleReactionRequest>,
) -> Result<Json<ReactionsResponse>, AppError> {
    let message = MessageService::fetch(&state.db, message_id).await?;
    ConversationMember::verify(&state.db, user.id, message.conversation_id).await?;

    let reactions =
        MessageService::toggle_reaction(&state.db, message_id, user.id, &body.emoji).await?;

    fanout::broadcast_room_event(
        &state,
        WsEvent::ReactionUpdated {
            conversation_id: message.conversation_id,
            message_id,
            reactions: reactions.clone(),
        },
        user.id,
    );

    Ok(Json(ReactionsResponse {
        message_id,
        reactions,
    }))
}

/// DELETE /messages/:id/reactions/:emoji
/// Remove the caller's reaction with that emoji, if present.
pub async fn remove_reaction(
    State(state): State<AppState>,
    user: AuthUser,
    Path((message_id, emoji)): Path<(Uuid, String)>,
) -> Result<Json<ReactionsResponse>, AppError> {
    let message = MessageService::fetch(&state.db, message_id).await?;
    ConversationMember::verify(&state.db, user.id, message.conversation_id).await?;

    let reactions =
        MessageService::remove_reaction(&state.db, message_id, user.id, &emoji).await?;

    fanout::broadcast_room_event(
        &state,
        WsEvent::ReactionUpdated {
            conversation_id: message.conversation_id,
            message_id,
            reactions: reactions.clone(),
        },
        user.id,
    );

    Ok(Json(ReactionsResponse {
        message_id,
        reactions,
    }))
}
