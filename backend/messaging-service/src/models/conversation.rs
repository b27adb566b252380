use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

/// Closed set of conversation topologies. Every authorization, enrollment and
/// deduplication decision branches on this tag, never on raw strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationKind {
    /// Client <-> cleaner chat scoped to one appointment; locked once the
    /// appointment completes, and the only kind the content safety gate
    /// applies to.
    Appointment,
    /// Requester <-> support desk (all owner + HR users).
    Support,
    /// Platform owner to all staff; one-way fan-out.
    Broadcast,
    /// Staff conversations: the HR group singleton, ad-hoc staff groups and
    /// owner/HR direct messages.
    Internal,
    /// Business owner <-> one of their employees.
    BusinessEmployee,
    /// Two employees of the same business.
    EmployeePeer,
    /// Business owner to all of their active employees.
    EmployeeBroadcast,
    /// Cleaner <-> client relationship chat (not tied to one appointment).
    CleanerClient,
}

impl ConversationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationKind::Appointment => "appointment",
            ConversationKind::Support => "support",
            ConversationKind::Broadcast => "broadcast",
            ConversationKind::Internal => "internal",
            ConversationKind::BusinessEmployee => "business_employee",
            ConversationKind::EmployeePeer => "employee_peer",
            ConversationKind::EmployeeBroadcast => "employee_broadcast",
            ConversationKind::CleanerClient => "cleaner_client",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "appointment" => Some(ConversationKind::Appointment),
            "support" => Some(ConversationKind::Support),
            "broadcast" => Some(ConversationKind::Broadcast),
            "internal" => Some(ConversationKind::Internal),
            "business_employee" => Some(ConversationKind::BusinessEmployee),
            "employee_peer" => Some(ConversationKind::EmployeePeer),
            "employee_broadcast" => Some(ConversationKind::EmployeeBroadcast),
            "cleaner_client" => Some(ConversationKind::CleanerClient),
            _ => None,
        }
    }

    /// Prefix for the canonical pair key of 1-to-1 kinds. Kinds without a
    /// prefix are not pair-deduplicated.
    pub fn pair_key_prefix(&self) -> Option<&'static str> {
        match self {
            ConversationKind::EmployeePeer => Some("emp"),
            ConversationKind::BusinessEmployee => Some("biz"),
            ConversationKind::CleanerClient => Some("cc"),
            ConversationKind::Internal => Some("hr"),
            _ => None,
        }
    }

}

/// Canonical order-independent key for a 1-to-1 conversation, e.g.
/// `emp_<min>_<max>`. Both initiator orders produce the same key.
pub fn pair_key(kind: ConversationKind, a: Uuid, b: Uuid) -> Option<String> {
    let prefix = kind.pair_key_prefix()?;
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    Some(format!("{prefix}_{lo}_{hi}"))
}

/// Reserved singleton key for the HR group conversation. A reserved key
/// rather than a title lookup, so user-supplied titles can't collide with it.
pub const HR_GROUP_KEY: &str = "hr_group";

#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub id: Uuid,
    pub kind: ConversationKind,
    pub title: Option<String>,
    pub created_by: Uuid,
    pub related_entity_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub pair_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// 1-to-1 conversations carry a pair key; the HR group singleton reuses
    /// the pair_key column for its reserved key but is a group.
    pub fn is_direct(&self) -> bool {
        self.pair_key.as_deref().is_some_and(|k| k != HR_GROUP_KEY)
    }

    /// Build from a row containing the conversations.* columns.
    pub fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, crate::error::AppError> {
        let kind_raw: String = row.get("kind");
        let kind = ConversationKind::parse(&kind_raw).ok_or_else(|| {
            tracing::error!(kind = %kind_raw, "unknown conversation kind in database");
            crate::error::AppError::Internal
        })?;
        Ok(Self {
            id: row.get("id"),
            kind,
            title: row.get("title"),
            created_by: row.get("created_by"),
            related_entity_id: row.get("related_entity_id"),
            appointment_id: row.get("appointment_id"),
            pair_key: row.get("pair_key"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Participant {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub role: Option<String>,
    pub business_employee_id: Option<Uuid>,
    pub last_read_at: Option<DateTime<Utc>>,
    pub joined_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_key_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(
            pair_key(ConversationKind::EmployeePeer, a, b),
            pair_key(ConversationKind::EmployeePeer, b, a)
        );
    }

    #[test]
    fn pair_key_uses_kind_prefix() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let key = pair_key(ConversationKind::EmployeePeer, a, b).unwrap();
        assert!(key.starts_with("emp_"));
        let key = pair_key(ConversationKind::CleanerClient, a, b).unwrap();
        assert!(key.starts_with("cc_"));
    }

    #[test]
    fn broadcast_kinds_have_no_pair_key() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(pair_key(ConversationKind::Broadcast, a, b).is_none());
        assert!(pair_key(ConversationKind::Support, a, b).is_none());
    }

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in [
            ConversationKind::Appointment,
            ConversationKind::Support,
            ConversationKind::Broadcast,
            ConversationKind::Internal,
            ConversationKind::BusinessEmployee,
            ConversationKind::EmployeePeer,
            ConversationKind::EmployeeBroadcast,
            ConversationKind::CleanerClient,
        ] {
            assert_eq!(ConversationKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ConversationKind::parse("group_dm"), None);
    }
}
