use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::guards::{ConversationMember, User as AuthUser},
    models::ReactionDto,
    services::{
        conversation_service::ConversationService,
        fanout,
        membership::MembershipAuthority,
        message_service::{MessageService, MessageWithReactions},
    },
    state::AppState,
    websocket::events::WsEvent,
};

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Serialize)]
pub struct MessageDto {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub message_type: String,
    pub has_suspicious_content: bool,
    pub suspicious_content_types: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub reactions: Vec<ReactionDto>,
}

impl From<MessageWithReactions> for MessageDto {
    fn from(entry: MessageWithReactions) -> Self {
        Self {
            id: entry.message.id,
            conversation_id: entry.message.conversation_id,
            sender_id: entry.message.sender_id,
            content: entry.message.content,
            message_type: entry.message.message_type,
            has_suspicious_content: entry.message.has_suspicious_content,
            suspicious_content_types: entry.message.suspicious_content_types,
            created_at: entry.message.created_at,
            reactions: entry.reactions,
        }
    }
}

/// POST /conversations/:id/messages
/// Persist, then fan out. The caller must already be a participant, and
/// appointment conversations must not be locked.
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(conversation_id): Path<Uuid>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageDto>), AppError> {
    let member = ConversationMember::verify(&state.db, user.id, conversation_id).await?;
    MembershipAuthority::ensure_sendable(&state.db, &member.conversation).await?;

    let message =
        MessageService::send(&state.db, &member.conversation, user.id, &body.content, "text")
            .await?;

    let sender = MembershipAuthority::load_user(&state.db, user.id).await?;
    let participants = ConversationService::participants(&state.db, conversation_id).await?;
    fanout::on_message_sent(&state, &member.conversation, &message, &sender, &participants);

    Ok((
        StatusCode::CREATED,
        Json(MessageDto::from(MessageWithReactions {
            message,
            reactions: Vec::new(),
        })),
    ))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /conversations/:id/messages
/// Message history, oldest first. Side effect: the caller's read cursor
/// advances to now.
pub async fn get_message_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<MessageDto>>, AppError> {
    ConversationMember::verify(&state.db, user.id, conversation_id).await?;

    let history = MessageService::history(
        &state.db,
        conversation_id,
        query.limit.unwrap_or(100),
        query.offset.unwrap_or(0),
    )
    .await?;

    MessageService::advance_read_cursor(&state.db, conversation_id, user.id).await?;

    Ok(Json(history.into_iter().map(MessageDto::from).collect()))
}

/// DELETE /messages/:id
/// Sender-only soft delete.
pub async fn delete_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(message_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let message = MessageService::fetch(&state.db, message_id).await?;
    ConversationMember::verify(&state.db, user.id, message.conversation_id).await?;

    let deleted = MessageService::soft_delete(&state.db, message_id, user.id).await?;

    fanout::broadcast_room_event(
        &state,
        WsEvent::MessageDeleted {
            conversation_id: deleted.conversation_id,
            message_id: deleted.id,
        },
        user.id,
    );

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct MarkMessagesReadRequest {
    pub conversation_id: Uuid,
    pub message_ids: Vec<Uuid>,
}

#[derive(Serialize)]
pub struct MarkMessagesReadResponse {
    pub receipts_created: u64,
}

/// POST /conversations/read
/// Bulk read receipts for a batch of messages; the caller's own messages
/// never receive receipts.
pub async fn mark_messages_read(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<MarkMessagesReadRequest>,
) -> Result<Json<MarkMessagesReadResponse>, AppError> {
    ConversationMember::verify(&state.db, user.id, body.conversation_id).await?;

    let receipts_created =
        MessageService::mark_read(&state.db, body.conversation_id, user.id, &body.message_ids)
            .await?;

    fanout::broadcast_room_event(
        &state,
        WsEvent::MessagesRead {
            conversation_id: body.conversation_id,
            message_ids: body.message_ids,
        },
        user.id,
    );

    Ok(Json(MarkMessagesReadResponse { receipts_created }))
}
