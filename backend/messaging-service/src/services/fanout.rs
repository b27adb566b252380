use axum::extract::ws::Message as WsMessage;
use uuid::Uuid;

use crate::{
    models::{Conversation, Message, User},
    services::notification_queue::NotificationJob,
    state::AppState,
    websocket::events::{MessagePayload, WsEvent},
};

/// Delivery fan-out for a freshly persisted message.
///
/// Realtime events go to the conversation room (full payload) and to each
/// recipient's personal room (conversation id only, so a client already
/// viewing the room doesn't refetch). Email and push are handed to the
/// notification queue; a failed or dropped notification never fails the
/// send.
pub fn on_message_sent(
    state: &AppState,
    conversation: &Conversation,
    message: &Message,
    sender: &User,
    participants: &[User],
) {
    let sender_name = sender.display_name(&state.pii);

    let room_event = WsEvent::MessageNew {
        conversation_id: conversation.id,
        message: MessagePayload::from_message(message, sender_name.clone()),
    };
    let unread_event = WsEvent::ConversationUnread {
        conversation_id: conversation.id,
    };

    let recipients: Vec<User> = participants
        .iter()
        .filter(|p| p.id != message.sender_id)
        .cloned()
        .collect();

    let registry = state.registry.clone();
    let sender_id = message.sender_id;
    let room_payload = room_event.to_payload(Some(sender_id));
    let unread_payload = unread_event.to_payload(Some(sender_id));
    let recipient_ids: Vec<Uuid> = recipients.iter().map(|r| r.id).collect();
    let conversation_id = conversation.id;

    tokio::spawn(async move {
        registry
            .broadcast_conversation(conversation_id, WsMessage::Text(room_payload))
            .await;
        for recipient_id in recipient_ids {
            registry
                .notify_user(recipient_id, WsMessage::Text(unread_payload.clone()))
                .await;
        }
    });

    for recipient in recipients {
        state.notifications.enqueue(NotificationJob {
            recipient,
            sender_name: sender_name.clone(),
            content: message.content.clone(),
        });
    }
}

/// Tell each newly enrolled user about a conversation they can't know about
/// yet (broadcasts, group creation, fresh 1-to-1s), via their personal room.
pub fn on_conversation_created(state: &AppState, conversation: &Conversation, enrolled: &[Uuid]) {
    let event = WsEvent::ConversationNew {
        conversation_id: conversation.id,
        kind: conversation.kind,
        title: conversation.title.clone(),
    };
    let payload = event.to_payload(Some(conversation.created_by));

    let registry = state.registry.clone();
    let creator = conversation.created_by;
    let targets: Vec<Uuid> = enrolled.iter().copied().filter(|id| *id != creator).collect();

    tokio::spawn(async move {
        for user_id in targets {
            registry
                .notify_user(user_id, WsMessage::Text(payload.clone()))
                .await;
        }
    });
}

/// Broadcast a conversation-room event (reactions, deletions, read
/// receipts). Fire-and-forget.
pub fn broadcast_room_event(state: &AppState, event: WsEvent, actor: Uuid) {
    let registry = state.registry.clone();
    let conversation_id = event.conversation_id();
    let payload = event.to_payload(Some(actor));
    tokio::spawn(async move {
        registry
            .broadcast_conversation(conversation_id, WsMessage::Text(payload))
            .await;
    });
}
