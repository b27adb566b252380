use sqlx::{Pool, Postgres, Row};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Conversation, ConversationKind, Message, ReactionDto},
    services::safety_gate::{self, SafetyVerdict},
};

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, content, message_type, \
                               has_suspicious_content, suspicious_content_types, \
                               deleted_at, created_at";

const MAX_EMOJI_BYTES: usize = 32;

pub struct MessageWithReactions {
    pub message: Message,
    pub reactions: Vec<ReactionDto>,
}

pub struct MessageService;

impl MessageService {
    pub async fn fetch(db: &Pool<Postgres>, message_id: Uuid) -> Result<Message, AppError> {
        let query = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1");
        sqlx::query_as::<_, Message>(&query)
            .bind(message_id)
            .fetch_optional(db)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Append a message. Content must be non-blank; appointment conversations
    /// additionally run the safety gate and persist its verdict. Other kinds
    /// never compute the flag: off-platform-contact risk is specific to job
    /// coordination.
    pub async fn send(
        db: &Pool<Postgres>,
        conversation: &Conversation,
        sender_id: Uuid,
        content: &str,
        message_type: &str,
    ) -> Result<Message, AppError> {
        if content.trim().is_empty() {
            return Err(AppError::InvalidInput("message content cannot be empty".into()));
        }

        let verdict = if conversation.kind == ConversationKind::Appointment {
            safety_gate::analyze(content)
        } else {
            SafetyVerdict::clean()
        };

        let id = Uuid::new_v4();
        let mut tx = db.begin().await?;
        let query = format!(
            "INSERT INTO messages \
             (id, conversation_id, sender_id, content, message_type, \
              has_suspicious_content, suspicious_content_types) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {MESSAGE_COLUMNS}"
        );
        let message = sqlx::query_as::<_, Message>(&query)
            .bind(id)
            .bind(conversation.id)
            .bind(sender_id)
            .bind(content)
            .bind(message_type)
            .bind(verdict.is_suspicious)
            .bind(&verdict.types)
            .fetch_one(&mut *tx)
            .await?;
        sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE id = $1")
            .bind(conversation.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(message)
    }

    /// Soft-delete a message. Sender-only; a second delete is rejected.
    pub async fn soft_delete(
        db: &Pool<Postgres>,
        message_id: Uuid,
        requester_id: Uuid,
    ) -> Result<Message, AppError> {
        let message = Self::fetch(db, message_id).await?;
        if message.sender_id != requester_id {
            return Err(AppError::forbidden("only the sender may delete a message"));
        }
        if message.is_deleted() {
            return Err(AppError::AlreadyDeleted);
        }

        let query = format!(
            "UPDATE messages SET deleted_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {MESSAGE_COLUMNS}"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(message_id)
            .fetch_optional(db)
            .await?
            // A concurrent delete got there first
            .ok_or(AppError::AlreadyDeleted)
    }

    /// Toggle a user's reaction. No prior reaction creates one; the same
    /// emoji removes it; a different emoji replaces it. The unique
    /// (message_id, user_id) index keeps concurrent toggles from ever
    /// leaving two rows. Returns the message's full reaction list.
    pub async fn toggle_reaction(
        db: &Pool<Postgres>,
        message_id: Uuid,
        user_id: Uuid,
        emoji: &str,
    ) -> Result<Vec<ReactionDto>, AppError> {
        if emoji.is_empty() || emoji.len() > MAX_EMOJI_BYTES {
            return Err(AppError::InvalidInput("invalid emoji".into()));
        }

        let mut tx = db.begin().await?;
        let existing = sqlx::query(
            "SELECT id, emoji FROM message_reactions \
             WHERE message_id = $1 AND user_id = $2 \
             FOR UPDATE",
        )
        .bind(message_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        match existing {
            None => {
                sqlx::query(
                    "INSERT INTO message_reactions (id, message_id, user_id, emoji) \
                     VALUES ($1, $2, $3, $4)",
                )
                .bind(Uuid::new_v4())
                .bind(message_id)
                .bind(user_id)
                .bind(emoji)
                .execute(&mut *tx)
                .await?;
            }
            Some(row) => {
                let existing_id: Uuid = row.get("id");
                let existing_emoji: String = row.get("emoji");
                sqlx::query("DELETE FROM message_reactions WHERE id = $1")
                    .bind(existing_id)
                    .execute(&mut *tx)
                    .await?;
                if existing_emoji != emoji {
                    sqlx::query(
                        "INSERT INTO message_reactions (id, message_id, user_id, emoji) \
                         VALUES ($1, $2, $3, $4)",
                    )
                    .bind(Uuid::new_v4())
                    .bind(message_id)
                    .bind(user_id)
                    .bind(emoji)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }
        tx.commit().await?;

        Self::reactions_for(db, message_id).await
    }

    /// Remove a specific reaction of the caller's. Returns the current list.
    pub async fn remove_reaction(
        db: &Pool<Postgres>,
        message_id: Uuid,
        user_id: Uuid,
        emoji: &str,
    ) -> Result<Vec<ReactionDto>, AppError> {
        sqlx::query(
            "DELETE FROM message_reactions \
             WHERE message_id = $1 AND user_id = $2 AND emoji = $3",
        )
        .bind(message_id)
        .bind(user_id)
        .bind(emoji)
        .execute(db)
        .await?;

        Self::reactions_for(db, message_id).await
    }

    pub async fn reactions_for(
        db: &Pool<Postgres>,
        message_id: Uuid,
    ) -> Result<Vec<ReactionDto>, AppError> {
        Ok(sqlx::query_as::<_, ReactionDto>(
            "SELECT user_id, emoji FROM message_reactions \
             WHERE message_id = $1 \
             ORDER BY created_at ASC",
        )
        .bind(message_id)
        .fetch_all(db)
        .await?)
    }

    /// Bulk read receipts. The caller's own messages are filtered out (a
    /// user cannot read-receipt their own message), only messages belonging
    /// to the conversation qualify, and the participant read cursor advances.
    /// Returns the number of receipts created.
    pub async fn mark_read(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
        user_id: Uuid,
        message_ids: &[Uuid],
    ) -> Result<u64, AppError> {
        let mut tx = db.begin().await?;
        let created = sqlx::query(
            "INSERT INTO message_read_receipts (message_id, user_id) \
             SELECT m.id, $2 FROM messages m \
             WHERE m.id = ANY($3) \
               AND m.conversation_id = $1 \
               AND m.sender_id <> $2 \
             ON CONFLICT DO NOTHING",
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(message_ids)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        // Monotonic: NOW() never precedes a previously stored cursor
        sqlx::query(
            "UPDATE conversation_participants SET last_read_at = NOW() \
             WHERE conversation_id = $1 AND user_id = $2",
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(created)
    }

    /// Advance the caller's read cursor without receipts (history fetch
    /// side effect).
    pub async fn advance_read_cursor(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE conversation_participants SET last_read_at = NOW() \
             WHERE conversation_id = $1 AND user_id = $2",
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Messages another participant hasn't read yet: newer than their
    /// cursor, authored by someone else, not deleted. Recomputed on read.
    pub async fn unread_count(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<i64, AppError> {
        Ok(sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages m \
             WHERE m.conversation_id = $1 \
               AND m.deleted_at IS NULL \
               AND m.sender_id <> $2 \
               AND m.created_at > COALESCE( \
                   (SELECT last_read_at FROM conversation_participants \
                    WHERE conversation_id = $1 AND user_id = $2), \
                   'epoch'::timestamptz)",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(db)
        .await?)
    }

    /// Message history, oldest first, with each message's reactions batched
    /// in a single follow-up query. Soft-deleted messages are omitted.
    pub async fn history(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MessageWithReactions>, AppError> {
        let limit = limit.clamp(1, 200);

        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE conversation_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at ASC \
             LIMIT $2 OFFSET $3"
        );
        let messages = sqlx::query_as::<_, Message>(&query)
            .bind(conversation_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(db)
            .await?;

        if messages.is_empty() {
            return Ok(Vec::new());
        }

        let message_ids: Vec<Uuid> = messages.iter().map(|m| m.id).collect();
        let reaction_rows = sqlx::query(
            "SELECT message_id, user_id, emoji FROM message_reactions \
             WHERE message_id = ANY($1) \
             ORDER BY created_at ASC",
        )
        .bind(&message_ids)
        .fetch_all(db)
        .await?;

        let mut reactions_map: HashMap<Uuid, Vec<ReactionDto>> = HashMap::new();
        for row in reaction_rows {
            let message_id: Uuid = row.get("message_id");
            reactions_map
                .entry(message_id)
                .or_default()
                .push(ReactionDto {
                    user_id: row.get("user_id"),
                    emoji: row.get("emoji"),
                });
        }

        Ok(messages
            .into_iter()
            .map(|message| {
                let reactions = reactions_map.remove(&message.id).unwrap_or_default();
                MessageWithReactions { message, reactions }
            })
            .collect())
    }
}
