//! Message lifecycle properties: reaction toggling, read receipts, unread
//! counts, soft delete, moderation scoping and the completed-appointment
//! lock. Requires `DATABASE_URL`; run with `cargo test -- --ignored`.

mod common;

use messaging_service::error::AppError;
use messaging_service::models::ConversationKind;
use messaging_service::services::conversation_service::ConversationService;
use messaging_service::services::membership::MembershipAuthority;
use messaging_service::services::message_service::MessageService;

#[tokio::test]
#[ignore]
async fn reaction_toggle_law() {
    let pool = common::bootstrap_pool().await;
    let a = common::seed_user(&pool, "client").await;
    let b = common::seed_user(&pool, "cleaner").await;
    let conversation =
        common::seed_conversation(&pool, ConversationKind::CleanerClient, a, &[a, b]).await;
    let message = MessageService::send(&pool, &conversation, a, "all set for friday", "text")
        .await
        .expect("send failed");

    // No prior reaction: create
    let reactions = MessageService::toggle_reaction(&pool, message.id, b, "👍")
        .await
        .expect("toggle failed");
    assert_eq!(reactions.len(), 1);
    assert_eq!(reactions[0].emoji, "👍");
    assert_eq!(reactions[0].user_id, b);

    // Same emoji again: toggle off
    let reactions = MessageService::toggle_reaction(&pool, message.id, b, "👍")
        .await
        .expect("toggle failed");
    assert!(reactions.is_empty());

    // Different emoji replaces rather than stacks
    MessageService::toggle_reaction(&pool, message.id, b, "👍")
        .await
        .expect("toggle failed");
    let reactions = MessageService::toggle_reaction(&pool, message.id, b, "❤️")
        .await
        .expect("toggle failed");
    assert_eq!(reactions.len(), 1);
    assert_eq!(reactions[0].emoji, "❤️");

    // Explicit removal
    let reactions = MessageService::remove_reaction(&pool, message.id, b, "❤️")
        .await
        .expect("remove failed");
    assert!(reactions.is_empty());

    common::cleanup_conversation(&pool, conversation.id).await;
    common::cleanup_users(&pool, &[a, b]).await;
}

#[tokio::test]
#[ignore]
async fn read_receipts_skip_own_messages_and_clear_unread() {
    let pool = common::bootstrap_pool().await;
    let a = common::seed_user(&pool, "client").await;
    let b = common::seed_user(&pool, "cleaner").await;
    let conversation =
        common::seed_conversation(&pool, ConversationKind::CleanerClient, a, &[a, b]).await;

    let own = MessageService::send(&pool, &conversation, a, "when can you come?", "text")
        .await
        .expect("send failed");
    let m1 = MessageService::send(&pool, &conversation, b, "thursday works", "text")
        .await
        .expect("send failed");
    let m2 = MessageService::send(&pool, &conversation, b, "around noon", "text")
        .await
        .expect("send failed");

    assert_eq!(
        MessageService::unread_count(&pool, conversation.id, a)
            .await
            .expect("unread failed"),
        2
    );

    // The batch includes the caller's own message; it never gets a receipt
    let created = MessageService::mark_read(&pool, conversation.id, a, &[own.id, m1.id, m2.id])
        .await
        .expect("mark read failed");
    assert_eq!(created, 2);

    let own_receipt: Option<i32> = sqlx::query_scalar(
        "SELECT 1 FROM message_read_receipts WHERE message_id = $1 AND user_id = $2",
    )
    .bind(own.id)
    .bind(a)
    .fetch_optional(&pool)
    .await
    .expect("receipt lookup failed");
    assert!(own_receipt.is_none());

    assert_eq!(
        MessageService::unread_count(&pool, conversation.id, a)
            .await
            .expect("unread failed"),
        0
    );

    // Re-marking is idempotent
    let created = MessageService::mark_read(&pool, conversation.id, a, &[m1.id, m2.id])
        .await
        .expect("second mark read failed");
    assert_eq!(created, 0);

    common::cleanup_conversation(&pool, conversation.id).await;
    common::cleanup_users(&pool, &[a, b]).await;
}

#[tokio::test]
#[ignore]
async fn soft_delete_is_sender_only_and_rejects_double_delete() {
    let pool = common::bootstrap_pool().await;
    let a = common::seed_user(&pool, "client").await;
    let b = common::seed_user(&pool, "cleaner").await;
    let conversation =
        common::seed_conversation(&pool, ConversationKind::CleanerClient, a, &[a, b]).await;
    let message = MessageService::send(&pool, &conversation, a, "never mind", "text")
        .await
        .expect("send failed");

    let err = MessageService::soft_delete(&pool, message.id, b)
        .await
        .expect_err("non-sender delete should fail");
    assert!(matches!(err, AppError::Forbidden(_)));

    let deleted = MessageService::soft_delete(&pool, message.id, a)
        .await
        .expect("delete failed");
    assert!(deleted.is_deleted());

    let err = MessageService::soft_delete(&pool, message.id, a)
        .await
        .expect_err("double delete should fail");
    assert!(matches!(err, AppError::AlreadyDeleted));

    // Deleted messages drop out of history
    let history = MessageService::history(&pool, conversation.id, 100, 0)
        .await
        .expect("history failed");
    assert!(history.is_empty());

    common::cleanup_conversation(&pool, conversation.id).await;
    common::cleanup_users(&pool, &[a, b]).await;
}

#[tokio::test]
#[ignore]
async fn empty_content_is_rejected() {
    let pool = common::bootstrap_pool().await;
    let a = common::seed_user(&pool, "client").await;
    let b = common::seed_user(&pool, "cleaner").await;
    let conversation =
        common::seed_conversation(&pool, ConversationKind::CleanerClient, a, &[a, b]).await;

    let err = MessageService::send(&pool, &conversation, a, "   \n  ", "text")
        .await
        .expect_err("blank content should fail");
    assert!(matches!(err, AppError::InvalidInput(_)));

    common::cleanup_conversation(&pool, conversation.id).await;
    common::cleanup_users(&pool, &[a, b]).await;
}

#[tokio::test]
#[ignore]
async fn suspicious_content_is_flagged_only_in_appointment_conversations() {
    let pool = common::bootstrap_pool().await;
    let client = common::seed_user(&pool, "client").await;
    let cleaner = common::seed_user(&pool, "cleaner").await;
    let appointment = common::seed_appointment(&pool, client, cleaner, false).await;

    let opened = ConversationService::find_or_create_appointment(&pool, client, appointment)
        .await
        .expect("open failed");

    let text = "call me at 555-123-4567";
    let flagged = MessageService::send(&pool, &opened.conversation, client, text, "text")
        .await
        .expect("send failed");
    assert!(flagged.has_suspicious_content);
    assert_eq!(flagged.suspicious_content_types, vec!["phone_number"]);

    // The identical text in a support conversation is never scanned
    let support =
        common::seed_conversation(&pool, ConversationKind::Support, client, &[client, cleaner])
            .await;
    let unflagged = MessageService::send(&pool, &support, client, text, "text")
        .await
        .expect("send failed");
    assert!(!unflagged.has_suspicious_content);
    assert!(unflagged.suspicious_content_types.is_empty());

    common::cleanup_conversation(&pool, opened.conversation.id).await;
    common::cleanup_conversation(&pool, support.id).await;
    common::cleanup_users(&pool, &[client, cleaner]).await;
}

#[tokio::test]
#[ignore]
async fn completed_appointments_lock_messaging() {
    let pool = common::bootstrap_pool().await;
    let client = common::seed_user(&pool, "client").await;
    let cleaner = common::seed_user(&pool, "cleaner").await;
    let appointment = common::seed_appointment(&pool, client, cleaner, false).await;

    let opened = ConversationService::find_or_create_appointment(&pool, client, appointment)
        .await
        .expect("open failed");
    MembershipAuthority::ensure_sendable(&pool, &opened.conversation)
        .await
        .expect("open appointment should be sendable");

    sqlx::query("UPDATE appointments SET completed = TRUE WHERE id = $1")
        .bind(appointment)
        .execute(&pool)
        .await
        .expect("update failed");

    let err = MembershipAuthority::ensure_sendable(&pool, &opened.conversation)
        .await
        .expect_err("completed appointment should lock");
    assert!(matches!(err, AppError::Locked));

    common::cleanup_conversation(&pool, opened.conversation.id).await;
    common::cleanup_users(&pool, &[client, cleaner]).await;
}
