use messaging_service::models::{Conversation, ConversationKind};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

#[allow(dead_code)]
pub async fn bootstrap_pool() -> Pool<Postgres> {
    let db_url = std::env::var("DATABASE_URL").expect("DATABASE_URL env var required for tests");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .expect("failed to connect to DATABASE_URL");
    messaging_service::migrations::run_all(&pool)
        .await
        .expect("failed to apply migrations");
    pool
}

#[allow(dead_code)]
pub async fn seed_user(pool: &Pool<Postgres>, role: &str) -> Uuid {
    let id = Uuid::new_v4();
    let username = format!("u_{}", &id.to_string()[..8]);
    sqlx::query("INSERT INTO users (id, username, role) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(username)
        .bind(role)
        .execute(pool)
        .await
        .expect("failed to seed user");
    id
}

/// Insert a conversation plus participant rows directly, bypassing the
/// registry, for tests that exercise the ledger.
#[allow(dead_code)]
pub async fn seed_conversation(
    pool: &Pool<Postgres>,
    kind: ConversationKind,
    created_by: Uuid,
    participants: &[Uuid],
) -> Conversation {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO conversations (id, kind, created_by) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(kind.as_str())
        .bind(created_by)
        .execute(pool)
        .await
        .expect("failed to seed conversation");
    for user_id in participants {
        sqlx::query(
            "INSERT INTO conversation_participants (conversation_id, user_id) VALUES ($1, $2)",
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .expect("failed to seed participant");
    }
    messaging_service::services::conversation_service::ConversationService::fetch(pool, id)
        .await
        .expect("failed to fetch seeded conversation")
}

#[allow(dead_code)]
pub async fn seed_appointment(
    pool: &Pool<Postgres>,
    client_id: Uuid,
    cleaner_id: Uuid,
    completed: bool,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO appointments (id, client_id, cleaner_id, completed) VALUES ($1, $2, $3, $4)",
    )
    .bind(id)
    .bind(client_id)
    .bind(cleaner_id)
    .bind(completed)
    .execute(pool)
    .await
    .expect("failed to seed appointment");
    id
}

/// Conversations cascade to participants, messages, reactions and receipts.
#[allow(dead_code)]
pub async fn cleanup_conversation(pool: &Pool<Postgres>, conversation_id: Uuid) {
    let _ = sqlx::query("DELETE FROM conversations WHERE id = $1")
        .bind(conversation_id)
        .execute(pool)
        .await;
}

#[allow(dead_code)]
pub async fn cleanup_users(pool: &Pool<Postgres>, user_ids: &[Uuid]) {
    let _ = sqlx::query("DELETE FROM appointments WHERE client_id = ANY($1) OR cleaner_id = ANY($1)")
        .bind(user_ids)
        .execute(pool)
        .await;
    let _ = sqlx::query(
        "DELETE FROM business_employees WHERE business_owner_id = ANY($1) OR employee_id = ANY($1)",
    )
    .bind(user_ids)
    .execute(pool)
    .await;
    let _ = sqlx::query("DELETE FROM cleaner_clients WHERE cleaner_id = ANY($1) OR client_id = ANY($1)")
        .bind(user_ids)
        .execute(pool)
        .await;
    let _ = sqlx::query("DELETE FROM users WHERE id = ANY($1)")
        .bind(user_ids)
        .execute(pool)
        .await;
}
