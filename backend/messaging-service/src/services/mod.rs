pub mod conversation_service;
pub mod email;
pub mod fanout;
pub mod membership;
pub mod message_service;
pub mod notification_queue;
pub mod pii;
pub mod push;
pub mod relationship;
pub mod safety_gate;
