//! Find-or-create behavior across conversation kinds, against a real
//! database (`DATABASE_URL` required; run with `cargo test -- --ignored`).

mod common;

use messaging_service::models::ConversationKind;
use messaging_service::services::conversation_service::ConversationService;
use messaging_service::services::membership::MembershipAuthority;

#[tokio::test]
#[ignore]
async fn pair_find_or_create_converges_and_is_symmetric() {
    let pool = common::bootstrap_pool().await;
    let a = common::seed_user(&pool, "employee").await;
    let b = common::seed_user(&pool, "employee").await;

    let first = ConversationService::find_or_create_pair(
        &pool,
        ConversationKind::EmployeePeer,
        a,
        b,
        None,
    )
    .await
    .expect("first open failed");
    assert!(first.created);
    assert_eq!(first.enrolled.len(), 2);

    // Same pair again, sequentially: found, not recreated
    let second = ConversationService::find_or_create_pair(
        &pool,
        ConversationKind::EmployeePeer,
        a,
        b,
        None,
    )
    .await
    .expect("second open failed");
    assert!(!second.created);
    assert_eq!(second.conversation.id, first.conversation.id);

    // Initiator order must not matter
    let reversed = ConversationService::find_or_create_pair(
        &pool,
        ConversationKind::EmployeePeer,
        b,
        a,
        None,
    )
    .await
    .expect("reversed open failed");
    assert!(!reversed.created);
    assert_eq!(reversed.conversation.id, first.conversation.id);

    common::cleanup_conversation(&pool, first.conversation.id).await;
    common::cleanup_users(&pool, &[a, b]).await;
}

#[tokio::test]
#[ignore]
async fn appointment_conversation_dedupes_on_appointment_id() {
    let pool = common::bootstrap_pool().await;
    let client = common::seed_user(&pool, "client").await;
    let cleaner = common::seed_user(&pool, "cleaner").await;
    let appointment = common::seed_appointment(&pool, client, cleaner, false).await;

    let first = ConversationService::find_or_create_appointment(&pool, client, appointment)
        .await
        .expect("open failed");
    assert!(first.created);
    assert_eq!(first.conversation.kind, ConversationKind::Appointment);
    assert_eq!(first.conversation.appointment_id, Some(appointment));

    // The cleaner lands in the same conversation
    let second = ConversationService::find_or_create_appointment(&pool, cleaner, appointment)
        .await
        .expect("second open failed");
    assert!(!second.created);
    assert_eq!(second.conversation.id, first.conversation.id);

    // A stranger is rejected outright
    let outsider = common::seed_user(&pool, "client").await;
    let err = ConversationService::find_or_create_appointment(&pool, outsider, appointment)
        .await
        .expect_err("outsider should be rejected");
    assert_eq!(err.status_code(), 403);

    common::cleanup_conversation(&pool, first.conversation.id).await;
    common::cleanup_users(&pool, &[client, cleaner, outsider]).await;
}

#[tokio::test]
#[ignore]
async fn support_conversation_enrolls_the_desk_and_cleans_up_when_empty() {
    let pool = common::bootstrap_pool().await;
    let requester = common::seed_user(&pool, "client").await;
    let hr = common::seed_user(&pool, "hr").await;

    let requester_user = MembershipAuthority::load_user(&pool, requester)
        .await
        .expect("load requester");
    let opened = ConversationService::find_or_create_support(&pool, &requester_user)
        .await
        .expect("open support failed");
    assert!(opened.created);
    assert!(opened.enrolled.contains(&requester));
    assert!(opened.enrolled.contains(&hr));

    let again = ConversationService::find_or_create_support(&pool, &requester_user)
        .await
        .expect("reopen support failed");
    assert!(!again.created);
    assert_eq!(again.conversation.id, opened.conversation.id);

    // Empty support conversations are deletable by a participant
    let deleted = ConversationService::cleanup_support(&pool, opened.conversation.id, requester)
        .await
        .expect("cleanup failed");
    assert!(deleted);

    // Deleting it again is a quiet no-op
    let deleted = ConversationService::cleanup_support(&pool, opened.conversation.id, requester)
        .await
        .expect("second cleanup failed");
    assert!(!deleted);

    common::cleanup_users(&pool, &[requester, hr]).await;
}

#[tokio::test]
#[ignore]
async fn hr_group_is_a_singleton_and_reconciles_new_hires() {
    let pool = common::bootstrap_pool().await;
    let owner = common::seed_user(&pool, "owner").await;
    let hr_a = common::seed_user(&pool, "hr").await;

    let owner_user = MembershipAuthority::load_user(&pool, owner)
        .await
        .expect("load owner");
    let opened = ConversationService::find_or_create_hr_group(&pool, &owner_user)
        .await
        .expect("open hr group failed");
    assert!(opened.enrolled.contains(&owner));
    assert!(opened.enrolled.contains(&hr_a));

    // A new hire appears on the next fetch without being re-created
    let hr_b = common::seed_user(&pool, "hr").await;
    let again = ConversationService::find_or_create_hr_group(&pool, &owner_user)
        .await
        .expect("reopen hr group failed");
    assert!(!again.created);
    assert_eq!(again.conversation.id, opened.conversation.id);
    assert!(again.enrolled.contains(&hr_b));

    common::cleanup_conversation(&pool, opened.conversation.id).await;
    common::cleanup_users(&pool, &[owner, hr_a, hr_b]).await;
}

#[tokio::test]
#[ignore]
async fn conversation_list_shows_unread_and_last_message() {
    use messaging_service::services::message_service::MessageService;

    let pool = common::bootstrap_pool().await;
    let a = common::seed_user(&pool, "client").await;
    let b = common::seed_user(&pool, "cleaner").await;
    let conversation =
        common::seed_conversation(&pool, ConversationKind::CleanerClient, a, &[a, b]).await;

    MessageService::send(&pool, &conversation, b, "done with the kitchen", "text")
        .await
        .expect("send failed");
    MessageService::send(&pool, &conversation, b, "heading out now", "text")
        .await
        .expect("send failed");

    let summaries = ConversationService::list_for_user(&pool, a)
        .await
        .expect("list failed");
    let summary = summaries
        .iter()
        .find(|s| s.conversation.id == conversation.id)
        .expect("conversation missing from list");
    assert_eq!(summary.unread_count, 2);
    let last = summary.last_message.as_ref().expect("no last message");
    assert_eq!(last.content, "heading out now");

    common::cleanup_conversation(&pool, conversation.id).await;
    common::cleanup_users(&pool, &[a, b]).await;
}
