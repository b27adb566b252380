use axum::extract::ws::Message;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc::UnboundedSender, RwLock};
use uuid::Uuid;

pub mod events;
pub mod wsroute;

/// In-process connection registry.
///
/// Two room spaces: conversation rooms receive full message/reaction events,
/// per-user personal rooms receive lightweight signals (unread markers, new
/// conversations) so a client that isn't viewing a conversation still learns
/// about it. Dead senders are pruned on the next send to their room.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    conversations: Arc<RwLock<HashMap<Uuid, Vec<UnboundedSender<Message>>>>>,
    users: Arc<RwLock<HashMap<Uuid, Vec<UnboundedSender<Message>>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe_conversation(
        &self,
        conversation_id: Uuid,
        tx: UnboundedSender<Message>,
    ) {
        let mut guard = self.conversations.write().await;
        guard.entry(conversation_id).or_default().push(tx);
    }

    pub async fn subscribe_user(&self, user_id: Uuid, tx: UnboundedSender<Message>) {
        let mut guard = self.users.write().await;
        guard.entry(user_id).or_default().push(tx);
    }

    pub async fn broadcast_conversation(&self, conversation_id: Uuid, msg: Message) {
        let mut guard = self.conversations.write().await;
        if let Some(list) = guard.get_mut(&conversation_id) {
            list.retain(|sender| sender.send(msg.clone()).is_ok());
            if list.is_empty() {
                guard.remove(&conversation_id);
            }
        }
    }

    pub async fn notify_user(&self, user_id: Uuid, msg: Message) {
        let mut guard = self.users.write().await;
        if let Some(list) = guard.get_mut(&user_id) {
            list.retain(|sender| sender.send(msg.clone()).is_ok());
            if list.is_empty() {
                guard.remove(&user_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn broadcast_reaches_room_subscribers_only() {
        let registry = ConnectionRegistry::new();
        let room = Uuid::new_v4();
        let other_room = Uuid::new_v4();

        let (tx_a, mut rx_a) = unbounded_channel();
        let (tx_b, mut rx_b) = unbounded_channel();
        registry.subscribe_conversation(room, tx_a).await;
        registry.subscribe_conversation(other_room, tx_b).await;

        registry
            .broadcast_conversation(room, Message::Text("hello".into()))
            .await;

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_subscribers_are_pruned() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();

        let (tx, rx) = unbounded_channel();
        registry.subscribe_user(user, tx).await;
        drop(rx);

        registry.notify_user(user, Message::Text("ping".into())).await;
        assert!(registry.users.read().await.get(&user).is_none());
    }
}
