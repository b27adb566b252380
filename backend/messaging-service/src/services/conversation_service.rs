use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        conversation::{pair_key, HR_GROUP_KEY},
        Conversation, ConversationKind, User,
    },
    services::membership::MembershipAuthority,
};

const CONVERSATION_COLUMNS: &str = "id, kind, title, created_by, related_entity_id, \
                                    appointment_id, pair_key, created_at, updated_at";

const USER_COLUMNS: &str = "id, username, first_name, last_name, email, role, \
                            push_token, notify_email, notify_push";

/// Result of a find-or-create lookup. `enrolled` lists users whose
/// participant row was created by this call (new conversations enroll
/// everyone; reconciliation may enroll a few).
#[derive(Debug)]
pub struct OpenedConversation {
    pub conversation: Conversation,
    pub created: bool,
    pub enrolled: Vec<Uuid>,
}

/// Last-message preview and unread count for the conversation list.
pub struct ConversationSummary {
    pub conversation: Conversation,
    pub unread_count: i64,
    pub last_message: Option<LastMessage>,
    /// For 1-to-1 kinds: the other party, so the list can show their name
    /// as the title.
    pub other_party: Option<User>,
}

pub struct LastMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

pub struct ConversationService;

impl ConversationService {
    pub async fn fetch(db: &Pool<Postgres>, id: Uuid) -> Result<Conversation, AppError> {
        let query = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or(AppError::NotFound)?;
        Conversation::from_row(&row)
    }

    /// Atomic find-or-create for pair-keyed 1-to-1 kinds. The partial unique
    /// index on pair_key turns the historical scan-then-create race into an
    /// insert conflict: both racers converge on the same row and `created`
    /// stays accurate.
    pub async fn find_or_create_pair(
        db: &Pool<Postgres>,
        kind: ConversationKind,
        creator_id: Uuid,
        other_id: Uuid,
        related_entity_id: Option<Uuid>,
    ) -> Result<OpenedConversation, AppError> {
        let key = pair_key(kind, creator_id, other_id).ok_or(AppError::Internal)?;
        let id = Uuid::new_v4();

        let mut tx = db.begin().await?;
        let inserted = sqlx::query(
            "INSERT INTO conversations (id, kind, created_by, related_entity_id, pair_key) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (pair_key) WHERE pair_key IS NOT NULL DO NOTHING",
        )
        .bind(id)
        .bind(kind.as_str())
        .bind(creator_id)
        .bind(related_entity_id)
        .bind(&key)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 1 {
            let enrolled =
                Self::enroll_participants(&mut tx, id, &[creator_id, other_id]).await?;
            if kind == ConversationKind::BusinessEmployee {
                sqlx::query(
                    "UPDATE conversation_participants SET business_employee_id = $2 \
                     WHERE conversation_id = $1",
                )
                .bind(id)
                .bind(related_entity_id)
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await?;
            let conversation = Self::fetch(db, id).await?;
            return Ok(OpenedConversation {
                conversation,
                created: true,
                enrolled,
            });
        }
        tx.commit().await?;

        // Lost the insert race or the pair already existed; either way the
        // canonical row is the one holding the key.
        let query =
            format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE pair_key = $1");
        let row = sqlx::query(&query)
            .bind(&key)
            .fetch_optional(db)
            .await?
            .ok_or(AppError::Internal)?;
        Ok(OpenedConversation {
            conversation: Conversation::from_row(&row)?,
            created: false,
            enrolled: Vec::new(),
        })
    }

    /// Find-or-create the conversation attached to an appointment. Enrolls
    /// the appointment's client and cleaner; the caller must be one of them.
    pub async fn find_or_create_appointment(
        db: &Pool<Postgres>,
        caller_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<OpenedConversation, AppError> {
        let appt = sqlx::query("SELECT client_id, cleaner_id FROM appointments WHERE id = $1")
            .bind(appointment_id)
            .fetch_optional(db)
            .await?
            .ok_or(AppError::NotFound)?;
        let client_id: Uuid = appt.get("client_id");
        let cleaner_id: Uuid = appt.get("cleaner_id");
        if caller_id != client_id && caller_id != cleaner_id {
            return Err(AppError::forbidden("not a party to this appointment"));
        }

        let id = Uuid::new_v4();
        let mut tx = db.begin().await?;
        let inserted = sqlx::query(
            "INSERT INTO conversations (id, kind, created_by, appointment_id) \
             VALUES ($1, 'appointment', $2, $3) \
             ON CONFLICT (appointment_id) WHERE appointment_id IS NOT NULL DO NOTHING",
        )
        .bind(id)
        .bind(caller_id)
        .bind(appointment_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 1 {
            let enrolled =
                Self::enroll_participants(&mut tx, id, &[client_id, cleaner_id]).await?;
            tx.commit().await?;
            let conversation = Self::fetch(db, id).await?;
            return Ok(OpenedConversation {
                conversation,
                created: true,
                enrolled,
            });
        }
        tx.commit().await?;

        let query = format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE appointment_id = $1"
        );
        let row = sqlx::query(&query)
            .bind(appointment_id)
            .fetch_optional(db)
            .await?
            .ok_or(AppError::Internal)?;
        Ok(OpenedConversation {
            conversation: Conversation::from_row(&row)?,
            created: false,
            enrolled: Vec::new(),
        })
    }

    /// Find-or-create the caller's support conversation. The lookup is a
    /// participant scan (no stable pair key exists: the desk roster is a
    /// role query), so it is best-effort under concurrent creation; the
    /// earliest-created conversation wins on subsequent calls.
    pub async fn find_or_create_support(
        db: &Pool<Postgres>,
        caller: &User,
    ) -> Result<OpenedConversation, AppError> {
        let query = format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations c \
             WHERE c.kind = 'support' \
               AND EXISTS (SELECT 1 FROM conversation_participants p \
                           WHERE p.conversation_id = c.id AND p.user_id = $1) \
             ORDER BY c.created_at ASC \
             LIMIT 1"
        );
        if let Some(row) = sqlx::query(&query).bind(caller.id).fetch_optional(db).await? {
            return Ok(OpenedConversation {
                conversation: Conversation::from_row(&row)?,
                created: false,
                enrolled: Vec::new(),
            });
        }

        let desk = MembershipAuthority::support_roster(db).await?;
        let mut members: Vec<Uuid> = vec![caller.id];
        for user in &desk {
            if !members.contains(&user.id) {
                members.push(user.id);
            }
        }

        let id = Uuid::new_v4();
        let mut tx = db.begin().await?;
        sqlx::query(
            "INSERT INTO conversations (id, kind, title, created_by) \
             VALUES ($1, 'support', 'Support', $2)",
        )
        .bind(id)
        .bind(caller.id)
        .execute(&mut *tx)
        .await?;
        let enrolled = Self::enroll_participants(&mut tx, id, &members).await?;
        tx.commit().await?;

        let conversation = Self::fetch(db, id).await?;
        Ok(OpenedConversation {
            conversation,
            created: true,
            enrolled,
        })
    }

    /// Find-or-create the HR group singleton (reserved key, not a title
    /// lookup). Every fetch reconciles membership so newly hired HR join
    /// automatically.
    pub async fn find_or_create_hr_group(
        db: &Pool<Postgres>,
        caller: &User,
    ) -> Result<OpenedConversation, AppError> {
        let mut roster: Vec<Uuid> = vec![caller.id];
        for user in MembershipAuthority::hr_users(db).await? {
            if !roster.contains(&user.id) {
                roster.push(user.id);
            }
        }

        let id = Uuid::new_v4();
        let mut tx = db.begin().await?;
        let inserted = sqlx::query(
            "INSERT INTO conversations (id, kind, title, created_by, pair_key) \
             VALUES ($1, 'internal', 'HR Team', $2, $3) \
             ON CONFLICT (pair_key) WHERE pair_key IS NOT NULL DO NOTHING",
        )
        .bind(id)
        .bind(caller.id)
        .bind(HR_GROUP_KEY)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let (conversation_id, created) = if inserted == 1 {
            (id, true)
        } else {
            let existing: Uuid =
                sqlx::query_scalar("SELECT id FROM conversations WHERE pair_key = $1")
                    .bind(HR_GROUP_KEY)
                    .fetch_one(&mut *tx)
                    .await?;
            (existing, false)
        };

        let enrolled = Self::enroll_participants(&mut tx, conversation_id, &roster).await?;
        tx.commit().await?;

        let conversation = Self::fetch(db, conversation_id).await?;
        Ok(OpenedConversation {
            conversation,
            created,
            enrolled,
        })
    }

    /// Find-or-create an ad-hoc staff group. Deduplicates against the
    /// caller's existing groups by title (never against other users' groups)
    /// and reconciles membership on a hit.
    pub async fn find_or_create_custom_group(
        db: &Pool<Postgres>,
        caller: &User,
        members: &[User],
        custom_title: Option<String>,
        member_names: &[String],
    ) -> Result<OpenedConversation, AppError> {
        // Dedup member ids, never including the creator in the title list
        let mut member_ids: Vec<Uuid> = Vec::new();
        for user in members {
            if user.id != caller.id && !member_ids.contains(&user.id) {
                member_ids.push(user.id);
            }
        }
        if member_ids.is_empty() {
            return Err(AppError::InvalidInput("at least one member is required".into()));
        }

        let title = match custom_title.filter(|t| !t.trim().is_empty()) {
            Some(title) => title,
            None => group_title(member_names),
        };
        if title.len() > 255 {
            return Err(AppError::InvalidInput("title too long (max 255)".into()));
        }

        let query = format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations c \
             WHERE c.kind = 'internal' AND c.pair_key IS NULL AND c.title = $1 \
               AND EXISTS (SELECT 1 FROM conversation_participants p \
                           WHERE p.conversation_id = c.id AND p.user_id = $2) \
             ORDER BY c.created_at ASC \
             LIMIT 1"
        );
        if let Some(row) = sqlx::query(&query)
            .bind(&title)
            .bind(caller.id)
            .fetch_optional(db)
            .await?
        {
            let conversation = Conversation::from_row(&row)?;
            let mut tx = db.begin().await?;
            let enrolled =
                Self::enroll_participants(&mut tx, conversation.id, &member_ids).await?;
            tx.commit().await?;
            return Ok(OpenedConversation {
                conversation,
                created: false,
                enrolled,
            });
        }

        let id = Uuid::new_v4();
        let mut all_members = vec![caller.id];
        all_members.extend(member_ids);

        let mut tx = db.begin().await?;
        sqlx::query(
            "INSERT INTO conversations (id, kind, title, created_by) \
             VALUES ($1, 'internal', $2, $3)",
        )
        .bind(id)
        .bind(&title)
        .bind(caller.id)
        .execute(&mut *tx)
        .await?;
        let enrolled = Self::enroll_participants(&mut tx, id, &all_members).await?;
        tx.commit().await?;

        let conversation = Self::fetch(db, id).await?;
        Ok(OpenedConversation {
            conversation,
            created: true,
            enrolled,
        })
    }

    /// Create a broadcast conversation and enroll the full recipient roster.
    /// Broadcasts are not deduplicated: each announcement is its own thread.
    pub async fn create_broadcast(
        db: &Pool<Postgres>,
        kind: ConversationKind,
        creator_id: Uuid,
        title: &str,
        recipients: &[User],
    ) -> Result<OpenedConversation, AppError> {
        let mut members = vec![creator_id];
        for user in recipients {
            if !members.contains(&user.id) {
                members.push(user.id);
            }
        }

        let id = Uuid::new_v4();
        let mut tx = db.begin().await?;
        sqlx::query(
            "INSERT INTO conversations (id, kind, title, created_by) VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(kind.as_str())
        .bind(title)
        .bind(creator_id)
        .execute(&mut *tx)
        .await?;
        let enrolled = Self::enroll_participants(&mut tx, id, &members).await?;
        tx.commit().await?;

        let conversation = Self::fetch(db, id).await?;
        Ok(OpenedConversation {
            conversation,
            created: true,
            enrolled,
        })
    }

    /// Insert participant rows, skipping users already enrolled. Returns the
    /// users actually added by this call.
    async fn enroll_participants(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        conversation_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, AppError> {
        let rows = sqlx::query(
            "INSERT INTO conversation_participants (conversation_id, user_id) \
             SELECT $1, uid FROM UNNEST($2::uuid[]) AS uid \
             ON CONFLICT DO NOTHING \
             RETURNING user_id",
        )
        .bind(conversation_id)
        .bind(user_ids)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows.into_iter().map(|r| r.get("user_id")).collect())
    }

    /// All participants of a conversation with their user records (for
    /// fan-out and display-name resolution).
    pub async fn participants(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
    ) -> Result<Vec<User>, AppError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users u \
             JOIN conversation_participants p ON p.user_id = u.id \
             WHERE p.conversation_id = $1 \
             ORDER BY p.joined_at ASC"
        );
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(conversation_id)
            .fetch_all(db)
            .await?)
    }

    /// The caller's conversation list: every conversation they participate
    /// in, newest activity first, with last-message preview, unread count
    /// and (for 1-to-1 kinds) the other party.
    pub async fn list_for_user(
        db: &Pool<Postgres>,
        user_id: Uuid,
    ) -> Result<Vec<ConversationSummary>, AppError> {
        let query = format!(
            "SELECT c.id, c.kind, c.title, c.created_by, c.related_entity_id, \
                    c.appointment_id, c.pair_key, c.created_at, c.updated_at, \
                    lm.id AS lm_id, lm.sender_id AS lm_sender_id, lm.content AS lm_content, \
                    lm.deleted_at AS lm_deleted_at, lm.created_at AS lm_created_at, \
                    (SELECT COUNT(*) FROM messages m \
                     WHERE m.conversation_id = c.id \
                       AND m.deleted_at IS NULL \
                       AND m.sender_id <> $1 \
                       AND m.created_at > COALESCE(p.last_read_at, 'epoch'::timestamptz) \
                    ) AS unread_count \
             FROM conversations c \
             JOIN conversation_participants p \
               ON p.conversation_id = c.id AND p.user_id = $1 \
             LEFT JOIN LATERAL ( \
                 SELECT m.id, m.sender_id, m.content, m.deleted_at, m.created_at \
                 FROM messages m \
                 WHERE m.conversation_id = c.id \
                 ORDER BY m.created_at DESC \
                 LIMIT 1 \
             ) lm ON TRUE \
             ORDER BY c.updated_at DESC \
             LIMIT 100"
        );
        let rows = sqlx::query(&query).bind(user_id).fetch_all(db).await?;

        let mut summaries = Vec::with_capacity(rows.len());
        let mut direct_ids: Vec<Uuid> = Vec::new();
        for row in &rows {
            let conversation = Conversation::from_row(row)?;
            if conversation.is_direct() {
                direct_ids.push(conversation.id);
            }
            let last_message = row
                .try_get::<Option<Uuid>, _>("lm_id")?
                .map(|lm_id| -> Result<LastMessage, sqlx::Error> {
                    let deleted_at: Option<DateTime<Utc>> = row.try_get("lm_deleted_at")?;
                    Ok(LastMessage {
                        id: lm_id,
                        sender_id: row.try_get("lm_sender_id")?,
                        content: row.try_get("lm_content")?,
                        deleted: deleted_at.is_some(),
                        created_at: row.try_get("lm_created_at")?,
                    })
                })
                .transpose()?;
            summaries.push(ConversationSummary {
                conversation,
                unread_count: row.try_get("unread_count")?,
                last_message,
                other_party: None,
            });
        }

        if !direct_ids.is_empty() {
            let query = format!(
                "SELECT p.conversation_id AS cid, {USER_COLUMNS} FROM users u \
                 JOIN conversation_participants p ON p.user_id = u.id \
                 WHERE p.conversation_id = ANY($1) AND p.user_id <> $2"
            );
            let rows = sqlx::query(&query)
                .bind(&direct_ids)
                .bind(user_id)
                .fetch_all(db)
                .await?;
            for row in rows {
                let cid: Uuid = row.get("cid");
                let user = User {
                    id: row.get("id"),
                    username: row.get("username"),
                    first_name: row.get("first_name"),
                    last_name: row.get("last_name"),
                    email: row.get("email"),
                    role: row.get("role"),
                    push_token: row.get("push_token"),
                    notify_email: row.get("notify_email"),
                    notify_push: row.get("notify_push"),
                };
                if let Some(summary) =
                    summaries.iter_mut().find(|s| s.conversation.id == cid)
                {
                    summary.other_party = Some(user);
                }
            }
        }

        Ok(summaries)
    }

    /// Delete an empty support conversation (participants first, then the
    /// conversation row). Returns false without touching anything if the
    /// conversation is missing, has messages, or isn't support.
    pub async fn cleanup_support(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
        caller_id: Uuid,
    ) -> Result<bool, AppError> {
        let query = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1");
        let Some(row) = sqlx::query(&query)
            .bind(conversation_id)
            .fetch_optional(db)
            .await?
        else {
            return Ok(false);
        };
        let conversation = Conversation::from_row(&row)?;
        if conversation.kind != ConversationKind::Support {
            return Ok(false);
        }

        let is_participant: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM conversation_participants \
             WHERE conversation_id = $1 AND user_id = $2",
        )
        .bind(conversation_id)
        .bind(caller_id)
        .fetch_optional(db)
        .await?;
        if is_participant.is_none() {
            return Err(AppError::forbidden("not a participant"));
        }

        let message_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE conversation_id = $1")
                .bind(conversation_id)
                .fetch_one(db)
                .await?;
        if message_count > 0 {
            return Ok(false);
        }

        let mut tx = db.begin().await?;
        sqlx::query("DELETE FROM conversation_participants WHERE conversation_id = $1")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(true)
    }
}

/// Auto-generated group title: up to three first names, then a "+N more"
/// suffix for the rest.
pub fn group_title(names: &[String]) -> String {
    let shown: Vec<&str> = names.iter().take(3).map(|s| s.as_str()).collect();
    let mut title = shown.join(", ");
    if names.len() > 3 {
        title.push_str(&format!(" +{} more", names.len() - 3));
    }
    title
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_lists_up_to_three_names() {
        let names: Vec<String> = vec!["Alice".into(), "Bob".into()];
        assert_eq!(group_title(&names), "Alice, Bob");

        let names: Vec<String> = vec!["Alice".into(), "Bob".into(), "Carol".into()];
        assert_eq!(group_title(&names), "Alice, Bob, Carol");
    }

    #[test]
    fn title_collapses_overflow_into_more_suffix() {
        let names: Vec<String> = vec![
            "Alice".into(),
            "Bob".into(),
            "Carol".into(),
            "Dave".into(),
            "Eve".into(),
        ];
        assert_eq!(group_title(&names), "Alice, Bob, Carol +2 more");
    }

    #[test]
    fn title_of_single_member() {
        let names: Vec<String> = vec!["Alice".into()];
        assert_eq!(group_title(&names), "Alice");
    }
}
