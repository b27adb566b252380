use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::guards::User as AuthUser,
    models::{Conversation, ConversationKind, UserRole},
    services::{
        conversation_service::{ConversationService, OpenedConversation},
        fanout,
        membership::MembershipAuthority,
        relationship::RelationshipLookup,
    },
    state::AppState,
};

#[derive(Serialize)]
pub struct OpenConversationResponse {
    pub conversation: Conversation,
    pub created: bool,
}

fn respond(
    state: &AppState,
    opened: OpenedConversation,
) -> (StatusCode, Json<OpenConversationResponse>) {
    if opened.created {
        fanout::on_conversation_created(state, &opened.conversation, &opened.enrolled);
    }
    let status = if opened.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (
        status,
        Json(OpenConversationResponse {
            conversation: opened.conversation,
            created: opened.created,
        }),
    )
}

#[derive(Serialize)]
pub struct LastMessageDto {
    pub id: Uuid,
    pub sender_id: Uuid,
    /// None when the message was soft-deleted
    pub content: Option<String>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ConversationListItem {
    pub id: Uuid,
    pub kind: ConversationKind,
    /// Stored title, or the other party's name for 1-to-1 conversations
    pub title: Option<String>,
    pub unread_count: i64,
    pub last_message: Option<LastMessageDto>,
    pub updated_at: DateTime<Utc>,
}

/// GET /conversations
/// The caller's conversations, newest activity first, with last-message
/// preview and unread count.
pub async fn list_conversations(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ConversationListItem>>, AppError> {
    let summaries = ConversationService::list_for_user(&state.db, user.id).await?;

    let items = summaries
        .into_iter()
        .map(|summary| {
            let title = match &summary.other_party {
                Some(other) => Some(other.display_name(&state.pii)),
                None => summary.conversation.title.clone(),
            };
            ConversationListItem {
                id: summary.conversation.id,
                kind: summary.conversation.kind,
                title,
                unread_count: summary.unread_count,
                last_message: summary.last_message.map(|lm| LastMessageDto {
                    id: lm.id,
                    sender_id: lm.sender_id,
                    content: (!lm.deleted).then_some(lm.content),
                    deleted: lm.deleted,
                    created_at: lm.created_at,
                }),
                updated_at: summary.conversation.updated_at,
            }
        })
        .collect();

    Ok(Json(items))
}

#[derive(Deserialize)]
pub struct OpenAppointmentConversationRequest {
    pub appointment_id: Uuid,
}

/// POST /conversations/appointment
pub async fn open_appointment_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<OpenAppointmentConversationRequest>,
) -> Result<(StatusCode, Json<OpenConversationResponse>), AppError> {
    let opened =
        ConversationService::find_or_create_appointment(&state.db, user.id, body.appointment_id)
            .await?;
    Ok(respond(&state, opened))
}

/// POST /conversations/support
/// Any non-staff user opens (or returns to) their support conversation; the
/// current owner + HR roster is enrolled as the desk.
pub async fn open_support_conversation(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<(StatusCode, Json<OpenConversationResponse>), AppError> {
    let caller = MembershipAuthority::load_user(&state.db, user.id).await?;
    MembershipAuthority::ensure_support_requester(&caller)?;
    let opened = ConversationService::find_or_create_support(&state.db, &caller).await?;
    Ok(respond(&state, opened))
}

/// POST /conversations/hr-group
/// Owner-only. Fetching reconciles membership so newly hired HR are added.
pub async fn open_hr_group(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<(StatusCode, Json<OpenConversationResponse>), AppError> {
    let caller = MembershipAuthority::load_user(&state.db, user.id).await?;
    MembershipAuthority::ensure_role(&caller, UserRole::Owner, "the HR group")?;
    let opened = ConversationService::find_or_create_hr_group(&state.db, &caller).await?;
    Ok(respond(&state, opened))
}

#[derive(Deserialize)]
pub struct OpenDirectConversationRequest {
    pub target_user_id: Option<Uuid>,
}

/// POST /conversations/hr-direct
pub async fn open_hr_direct(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<OpenDirectConversationRequest>,
) -> Result<(StatusCode, Json<OpenConversationResponse>), AppError> {
    let caller = MembershipAuthority::load_user(&state.db, user.id).await?;
    let target =
        MembershipAuthority::resolve_hr_direct_target(&state.db, &caller, body.target_user_id)
            .await?;
    let opened = ConversationService::find_or_create_pair(
        &state.db,
        ConversationKind::Internal,
        caller.id,
        target.id,
        None,
    )
    .await?;
    Ok(respond(&state, opened))
}

#[derive(Deserialize)]
pub struct OpenCustomGroupRequest {
    pub title: Option<String>,
    pub member_ids: Vec<Uuid>,
}

/// POST /conversations/custom-group
/// Owner-only ad-hoc staff group. Without a custom title, the first three
/// members' names become the title.
pub async fn open_custom_group(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<OpenCustomGroupRequest>,
) -> Result<(StatusCode, Json<OpenConversationResponse>), AppError> {
    let caller = MembershipAuthority::load_user(&state.db, user.id).await?;
    MembershipAuthority::ensure_role(&caller, UserRole::Owner, "creating a staff group")?;

    let mut members = Vec::new();
    for member_id in &body.member_ids {
        if *member_id == caller.id || members.iter().any(|m: &crate::models::User| m.id == *member_id)
        {
            continue;
        }
        members.push(MembershipAuthority::load_user(&state.db, *member_id).await?);
    }
    let member_names: Vec<String> = members
        .iter()
        .map(|m| m.display_name(&state.pii))
        .collect();

    let opened = ConversationService::find_or_create_custom_group(
        &state.db,
        &caller,
        &members,
        body.title,
        &member_names,
    )
    .await?;
    Ok(respond(&state, opened))
}

/// POST /conversations/cleaner-client
/// Either party may initiate. A client without an explicit target falls back
/// to their home's preferred cleaner.
pub async fn open_cleaner_client_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<OpenDirectConversationRequest>,
) -> Result<(StatusCode, Json<OpenConversationResponse>), AppError> {
    let caller = MembershipAuthority::load_user(&state.db, user.id).await?;
    let (cleaner_id, client_id, link) =
        MembershipAuthority::resolve_cleaner_client_pair(&state.db, &caller, body.target_user_id)
            .await?;
    let opened = ConversationService::find_or_create_pair(
        &state.db,
        ConversationKind::CleanerClient,
        cleaner_id,
        client_id,
        link.related_entity_id(),
    )
    .await?;
    Ok(respond(&state, opened))
}

/// POST /conversations/employee
/// Business owner <-> employee, gated on an active employment record. An
/// employee without an explicit target reaches their business owner.
pub async fn open_employee_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<OpenDirectConversationRequest>,
) -> Result<(StatusCode, Json<OpenConversationResponse>), AppError> {
    let caller = MembershipAuthority::load_user(&state.db, user.id).await?;

    let (owner_id, employee_id) = match caller.role() {
        Some(UserRole::BusinessOwner) => {
            let employee_id = body
                .target_user_id
                .ok_or_else(|| AppError::InvalidInput("target user is required".into()))?;
            (caller.id, employee_id)
        }
        Some(UserRole::Employee) => {
            let owner_id: Uuid = match body.target_user_id {
                Some(id) => id,
                None => sqlx::query_scalar::<_, Uuid>(
                    "SELECT business_owner_id FROM business_employees \
                     WHERE employee_id = $1 AND active = TRUE \
                     ORDER BY created_at ASC LIMIT 1",
                )
                .bind(caller.id)
                .fetch_optional(&state.db)
                .await?
                .ok_or(AppError::NotFound)?,
            };
            (owner_id, caller.id)
        }
        _ => {
            return Err(AppError::forbidden(
                "only business owners and employees may open this conversation",
            ));
        }
    };

    let relationship_id =
        RelationshipLookup::active_business_employee(&state.db, owner_id, employee_id)
            .await?
            .ok_or_else(|| AppError::forbidden("no active employment relationship"))?;

    let opened = ConversationService::find_or_create_pair(
        &state.db,
        ConversationKind::BusinessEmployee,
        owner_id,
        employee_id,
        Some(relationship_id),
    )
    .await?;
    Ok(respond(&state, opened))
}

#[derive(Deserialize)]
pub struct OpenCoworkerConversationRequest {
    pub target_user_id: Uuid,
}

/// POST /conversations/coworker
/// Employee <-> employee of the same business.
pub async fn open_coworker_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<OpenCoworkerConversationRequest>,
) -> Result<(StatusCode, Json<OpenConversationResponse>), AppError> {
    let caller = MembershipAuthority::load_user(&state.db, user.id).await?;
    if caller.role() != Some(UserRole::Employee) {
        return Err(AppError::forbidden("coworker conversations are employee-only"));
    }
    if body.target_user_id == caller.id {
        return Err(AppError::forbidden("cannot message yourself"));
    }
    if !RelationshipLookup::are_coworkers(&state.db, caller.id, body.target_user_id).await? {
        return Err(AppError::forbidden("not coworkers at the same business"));
    }

    let opened = ConversationService::find_or_create_pair(
        &state.db,
        ConversationKind::EmployeePeer,
        caller.id,
        body.target_user_id,
        None,
    )
    .await?;
    Ok(respond(&state, opened))
}

#[derive(Serialize)]
pub struct CleanupResponse {
    pub deleted: bool,
}

/// DELETE /conversations/support/:id
/// Remove an empty support conversation. A no-op (deleted: false) when it
/// has messages or doesn't exist.
pub async fn cleanup_support_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CleanupResponse>, AppError> {
    let deleted = ConversationService::cleanup_support(&state.db, id, user.id).await?;
    Ok(Json(CleanupResponse { deleted }))
}
