//! Authorization guards that keep permission checks ahead of handler logic.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Conversation, Participant},
};

/// The authenticated caller, extracted from the id the auth middleware
/// stashed in request extensions.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for User
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .extensions
            .get::<Uuid>()
            .cloned()
            .ok_or(AppError::Unauthorized)?;

        Ok(User { id: user_id })
    }
}

/// A verified conversation participant. Distinguishes a missing conversation
/// (404) from a non-participant caller (403), which the taxonomy requires.
#[derive(Debug, Clone)]
pub struct ConversationMember {
    pub conversation: Conversation,
    pub participant: Participant,
}

impl ConversationMember {
    pub async fn verify(
        db: &PgPool,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<Self, AppError> {
        let conv_row = sqlx::query(
            "SELECT id, kind, title, created_by, related_entity_id, appointment_id, \
                    pair_key, created_at, updated_at \
             FROM conversations WHERE id = $1",
        )
        .bind(conversation_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)?;
        let conversation = Conversation::from_row(&conv_row)?;

        let row = sqlx::query(
            "SELECT conversation_id, user_id, role, business_employee_id, \
                    last_read_at, joined_at \
             FROM conversation_participants \
             WHERE conversation_id = $1 AND user_id = $2",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::forbidden("not a participant"))?;

        let participant = Participant {
            conversation_id: row.get("conversation_id"),
            user_id: row.get("user_id"),
            role: row.get("role"),
            business_employee_id: row.get("business_employee_id"),
            last_read_at: row.get("last_read_at"),
            joined_at: row.get("joined_at"),
        };

        Ok(ConversationMember {
            conversation,
            participant,
        })
    }
}
