use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    middleware::guards::User as AuthUser,
    models::{Conversation, ConversationKind, User, UserRole},
    routes::messages::MessageDto,
    services::{
        conversation_service::ConversationService,
        fanout,
        membership::MembershipAuthority,
        message_service::{MessageService, MessageWithReactions},
    },
    state::AppState,
};

#[derive(Deserialize)]
pub struct SendBroadcastRequest {
    pub content: String,
    pub title: Option<String>,
}

#[derive(Serialize)]
pub struct BroadcastResponse {
    pub conversation: Conversation,
    pub message: MessageDto,
}

/// POST /broadcasts
/// Owner-only announcement to all staff and cleaners: creates the broadcast
/// conversation and its first message in one call.
pub async fn send_broadcast(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<SendBroadcastRequest>,
) -> Result<(StatusCode, Json<BroadcastResponse>), AppError> {
    let caller = MembershipAuthority::load_user(&state.db, user.id).await?;
    MembershipAuthority::ensure_role(&caller, UserRole::Owner, "broadcasting")?;

    let recipients = MembershipAuthority::broadcast_roster(&state.db).await?;
    dispatch_broadcast(
        &state,
        ConversationKind::Broadcast,
        caller,
        body.title,
        body.content,
        recipients,
    )
    .await
}

/// POST /broadcasts/employee
/// Business-owner-only announcement to their active employees.
pub async fn send_employee_broadcast(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<SendBroadcastRequest>,
) -> Result<(StatusCode, Json<BroadcastResponse>), AppError> {
    let caller = MembershipAuthority::load_user(&state.db, user.id).await?;
    MembershipAuthority::ensure_role(&caller, UserRole::BusinessOwner, "broadcasting")?;

    let recipients = MembershipAuthority::employee_roster(&state.db, caller.id).await?;
    if recipients.is_empty() {
        return Err(AppError::InvalidInput("no active employees to notify".into()));
    }

    dispatch_broadcast(
        &state,
        ConversationKind::EmployeeBroadcast,
        caller,
        body.title,
        body.content,
        recipients,
    )
    .await
}

async fn dispatch_broadcast(
    state: &AppState,
    kind: ConversationKind,
    caller: User,
    title: Option<String>,
    content: String,
    recipients: Vec<User>,
) -> Result<(StatusCode, Json<BroadcastResponse>), AppError> {
    if content.trim().is_empty() {
        return Err(AppError::InvalidInput("message content cannot be empty".into()));
    }

    let title = title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "Announcement".to_string());

    let opened =
        ConversationService::create_broadcast(&state.db, kind, caller.id, &title, &recipients)
            .await?;

    let message = MessageService::send(
        &state.db,
        &opened.conversation,
        caller.id,
        &content,
        "broadcast",
    )
    .await?;

    // Recipients learn about the conversation through their personal room,
    // then get the message fan-out like any other send.
    fanout::on_conversation_created(state, &opened.conversation, &opened.enrolled);
    fanout::on_message_sent(state, &opened.conversation, &message, &caller, &recipients);

    Ok((
        StatusCode::CREATED,
        Json(BroadcastResponse {
            conversation: opened.conversation,
            message: MessageDto::from(MessageWithReactions {
                message,
                reactions: Vec::new(),
            }),
        }),
    ))
}
