use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub message_type: String, // 'text' or 'broadcast'
    pub has_suspicious_content: bool,
    pub suspicious_content_types: Vec<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// One user's reaction on a message. The ledger guarantees at most one row
/// per (message, user).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReactionDto {
    pub user_id: Uuid,
    pub emoji: String,
}
