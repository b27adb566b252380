//! Realtime event vocabulary.
//!
//! Every event serializes into the same envelope:
//!
//! ```json
//! {
//!     "type": "message.new",
//!     "timestamp": "2026-02-14T10:30:00Z",
//!     "user_id": "uuid of the acting user, when there is one",
//!     "conversation_id": "uuid",
//!     "data": { ... }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{ConversationKind, Message, ReactionDto};

/// Full message payload carried by `message.new`.
#[derive(Debug, Clone, Serialize)]
pub struct MessagePayload {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub content: String,
    pub message_type: String,
    pub created_at: DateTime<Utc>,
}

impl MessagePayload {
    pub fn from_message(message: &Message, sender_name: String) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id,
            sender_name,
            content: message.content.clone(),
            message_type: message.message_type.clone(),
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub enum WsEvent {
    /// New message in a conversation room (full payload).
    MessageNew {
        conversation_id: Uuid,
        message: MessagePayload,
    },
    /// Message soft-deleted.
    MessageDeleted {
        conversation_id: Uuid,
        message_id: Uuid,
    },
    /// A user's reaction toggled; carries the message's current list.
    ReactionUpdated {
        conversation_id: Uuid,
        message_id: Uuid,
        reactions: Vec<ReactionDto>,
    },
    /// A participant read a batch of messages.
    MessagesRead {
        conversation_id: Uuid,
        message_ids: Vec<Uuid>,
    },
    /// Personal-room signal: a conversation the user was just enrolled in.
    ConversationNew {
        conversation_id: Uuid,
        kind: ConversationKind,
        title: Option<String>,
    },
    /// Personal-room signal: unread activity in a conversation the user is
    /// not currently viewing. Conversation id only; the client refetches.
    ConversationUnread { conversation_id: Uuid },
    TypingStarted { conversation_id: Uuid },
    TypingStopped { conversation_id: Uuid },
}

impl WsEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            WsEvent::MessageNew { .. } => "message.new",
            WsEvent::MessageDeleted { .. } => "message.deleted",
            WsEvent::ReactionUpdated { .. } => "reaction.updated",
            WsEvent::MessagesRead { .. } => "messages.read",
            WsEvent::ConversationNew { .. } => "conversation.new",
            WsEvent::ConversationUnread { .. } => "conversation.unread",
            WsEvent::TypingStarted { .. } => "typing.started",
            WsEvent::TypingStopped { .. } => "typing.stopped",
        }
    }

    pub fn conversation_id(&self) -> Uuid {
        match self {
            WsEvent::MessageNew { conversation_id, .. }
            | WsEvent::MessageDeleted { conversation_id, .. }
            | WsEvent::ReactionUpdated { conversation_id, .. }
            | WsEvent::MessagesRead { conversation_id, .. }
            | WsEvent::ConversationNew { conversation_id, .. }
            | WsEvent::ConversationUnread { conversation_id }
            | WsEvent::TypingStarted { conversation_id }
            | WsEvent::TypingStopped { conversation_id } => *conversation_id,
        }
    }

    fn data(&self) -> serde_json::Value {
        match self {
            WsEvent::MessageNew { message, .. } => serde_json::json!({ "message": message }),
            WsEvent::MessageDeleted { message_id, .. } => {
                serde_json::json!({ "message_id": message_id })
            }
            WsEvent::ReactionUpdated {
                message_id,
                reactions,
                ..
            } => serde_json::json!({ "message_id": message_id, "reactions": reactions }),
            WsEvent::MessagesRead { message_ids, .. } => {
                serde_json::json!({ "message_ids": message_ids })
            }
            WsEvent::ConversationNew { kind, title, .. } => {
                serde_json::json!({ "kind": kind, "title": title })
            }
            WsEvent::ConversationUnread { .. }
            | WsEvent::TypingStarted { .. }
            | WsEvent::TypingStopped { .. } => serde_json::json!({}),
        }
    }

    /// Serialize into the wire envelope. `user_id` is the acting user, when
    /// the event has one.
    pub fn to_payload(&self, user_id: Option<Uuid>) -> String {
        serde_json::json!({
            "type": self.event_type(),
            "timestamp": Utc::now().to_rfc3339(),
            "user_id": user_id,
            "conversation_id": self.conversation_id(),
            "data": self.data(),
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_type_and_conversation() {
        let conversation_id = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let event = WsEvent::ConversationUnread { conversation_id };
        let payload: serde_json::Value =
            serde_json::from_str(&event.to_payload(Some(actor))).unwrap();

        assert_eq!(payload["type"], "conversation.unread");
        assert_eq!(payload["conversation_id"], conversation_id.to_string());
        assert_eq!(payload["user_id"], actor.to_string());
        assert!(payload["timestamp"].is_string());
    }

    #[test]
    fn reaction_event_embeds_current_list() {
        let event = WsEvent::ReactionUpdated {
            conversation_id: Uuid::new_v4(),
            message_id: Uuid::new_v4(),
            reactions: vec![ReactionDto {
                user_id: Uuid::new_v4(),
                emoji: "👍".into(),
            }],
        };
        let payload: serde_json::Value =
            serde_json::from_str(&event.to_payload(None)).unwrap();
        assert_eq!(payload["data"]["reactions"][0]["emoji"], "👍");
    }
}
