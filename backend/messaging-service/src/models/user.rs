use crate::services::pii::PiiCodec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Platform owner (runs the cleaning business)
    Owner,
    Hr,
    Client,
    Cleaner,
    /// Owner of a partner business with its own employees
    BusinessOwner,
    Employee,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Owner => "owner",
            UserRole::Hr => "hr",
            UserRole::Client => "client",
            UserRole::Cleaner => "cleaner",
            UserRole::BusinessOwner => "business_owner",
            UserRole::Employee => "employee",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "owner" => Some(UserRole::Owner),
            "hr" => Some(UserRole::Hr),
            "client" => Some(UserRole::Client),
            "cleaner" => Some(UserRole::Cleaner),
            "business_owner" => Some(UserRole::BusinessOwner),
            "employee" => Some(UserRole::Employee),
            _ => None,
        }
    }

    /// Owner and HR form the support desk and the staff directory.
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Owner | UserRole::Hr)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    // Ciphertext at rest; decode through the PII codec at the edges only.
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: String,
    pub push_token: Option<String>,
    pub notify_email: bool,
    pub notify_push: bool,
}

impl User {
    pub fn role(&self) -> Option<UserRole> {
        UserRole::parse(&self.role)
    }

    /// Decrypted first name, falling back to the username.
    pub fn display_name(&self, codec: &PiiCodec) -> String {
        self.first_name
            .as_deref()
            .map(|f| codec.decrypt(f))
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.username.clone())
    }

    pub fn email_plain(&self, codec: &PiiCodec) -> Option<String> {
        self.email
            .as_deref()
            .map(|e| codec.decrypt(e))
            .filter(|e| !e.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(first_name: Option<&str>, codec: &PiiCodec) -> User {
        User {
            id: Uuid::new_v4(),
            username: "mop_and_glow".into(),
            first_name: first_name.map(|f| codec.encrypt(f)),
            last_name: None,
            email: None,
            role: "cleaner".into(),
            push_token: None,
            notify_email: true,
            notify_push: true,
        }
    }

    #[test]
    fn display_name_prefers_first_name() {
        let codec = PiiCodec::new("k");
        assert_eq!(user_with(Some("Alice"), &codec).display_name(&codec), "Alice");
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let codec = PiiCodec::new("k");
        assert_eq!(user_with(None, &codec).display_name(&codec), "mop_and_glow");
    }

    #[test]
    fn staff_roles() {
        assert!(UserRole::Owner.is_staff());
        assert!(UserRole::Hr.is_staff());
        assert!(!UserRole::Cleaner.is_staff());
        assert!(!UserRole::BusinessOwner.is_staff());
    }
}
