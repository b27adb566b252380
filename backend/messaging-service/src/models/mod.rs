pub mod conversation;
pub mod message;
pub mod user;

pub use conversation::{Conversation, ConversationKind, Participant};
pub use message::{Message, ReactionDto};
pub use user::{User, UserRole};
