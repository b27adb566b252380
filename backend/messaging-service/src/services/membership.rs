use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Conversation, ConversationKind, User, UserRole},
    services::relationship::{CleanerClientLink, RelationshipLookup},
};

const USER_COLUMNS: &str = "id, username, first_name, last_name, email, role, \
                            push_token, notify_email, notify_push";

/// Per-kind authorization and auto-enrollment rules. The registry asks this
/// module who may open a conversation and who belongs in it; the send path
/// asks whether a conversation still accepts messages.
pub struct MembershipAuthority;

impl MembershipAuthority {
    pub async fn load_user(db: &Pool<Postgres>, user_id: Uuid) -> Result<User, AppError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn users_by_role(
        db: &Pool<Postgres>,
        roles: &[UserRole],
    ) -> Result<Vec<User>, AppError> {
        let role_strs: Vec<String> = roles.iter().map(|r| r.as_str().to_string()).collect();
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE role = ANY($1)");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(&role_strs)
            .fetch_all(db)
            .await?)
    }

    /// The support desk: every current owner and HR user, found by role
    /// query so new hires appear in future lookups without a fixed list.
    pub async fn support_roster(db: &Pool<Postgres>) -> Result<Vec<User>, AppError> {
        Self::users_by_role(db, &[UserRole::Owner, UserRole::Hr]).await
    }

    pub async fn hr_users(db: &Pool<Postgres>) -> Result<Vec<User>, AppError> {
        Self::users_by_role(db, &[UserRole::Hr]).await
    }

    /// Recipients of a platform broadcast: all staff and cleaners.
    pub async fn broadcast_roster(db: &Pool<Postgres>) -> Result<Vec<User>, AppError> {
        Self::users_by_role(db, &[UserRole::Hr, UserRole::Cleaner]).await
    }

    /// Recipients of a business owner's employee broadcast: their active
    /// employees.
    pub async fn employee_roster(
        db: &Pool<Postgres>,
        business_owner_id: Uuid,
    ) -> Result<Vec<User>, AppError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE id IN (SELECT employee_id FROM business_employees \
                          WHERE business_owner_id = $1 AND active = TRUE)"
        );
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(business_owner_id)
            .fetch_all(db)
            .await?)
    }

    /// Support conversations are opened by requesters; owner and HR are the
    /// desk, not requesters.
    pub fn ensure_support_requester(user: &User) -> Result<(), AppError> {
        match user.role() {
            Some(role) if role.is_staff() => Err(AppError::forbidden(
                "support staff cannot open support conversations",
            )),
            _ => Ok(()),
        }
    }

    pub fn ensure_role(user: &User, role: UserRole, action: &str) -> Result<(), AppError> {
        if user.role() == Some(role) {
            Ok(())
        } else {
            Err(AppError::forbidden(format!("{action} requires the {} role", role.as_str())))
        }
    }

    /// Resolve the other party of an owner/HR direct message.
    ///
    /// The owner must name a target HR member. HR defaults to the owner when
    /// no target is given, may name the owner or another HR member, and may
    /// never target themselves.
    pub async fn resolve_hr_direct_target(
        db: &Pool<Postgres>,
        caller: &User,
        explicit: Option<Uuid>,
    ) -> Result<User, AppError> {
        let target = match (caller.role(), explicit) {
            (Some(UserRole::Owner), Some(id)) => {
                let target = Self::load_user(db, id).await?;
                if target.role() != Some(UserRole::Hr) {
                    return Err(AppError::forbidden("target is not an HR member"));
                }
                target
            }
            (Some(UserRole::Owner), None) => {
                return Err(AppError::InvalidInput("target user is required".into()));
            }
            (Some(UserRole::Hr), Some(id)) => {
                let target = Self::load_user(db, id).await?;
                match target.role() {
                    Some(UserRole::Owner) | Some(UserRole::Hr) => target,
                    _ => return Err(AppError::forbidden("target is not owner or HR")),
                }
            }
            (Some(UserRole::Hr), None) => {
                // Default to the platform owner
                Self::users_by_role(db, &[UserRole::Owner])
                    .await?
                    .into_iter()
                    .next()
                    .ok_or(AppError::NotFound)?
            }
            _ => {
                return Err(AppError::forbidden(
                    "direct staff messages are limited to owner and HR",
                ));
            }
        };

        if target.id == caller.id {
            return Err(AppError::forbidden("cannot message yourself"));
        }
        Ok(target)
    }

    /// Resolve the (cleaner, client) pair for a cleaner_client conversation
    /// and verify an active relationship backs it.
    ///
    /// A missing target with no resolvable preferred cleaner is NotFound; a
    /// resolved pair with no qualifying relationship is Forbidden.
    pub async fn resolve_cleaner_client_pair(
        db: &Pool<Postgres>,
        caller: &User,
        explicit: Option<Uuid>,
    ) -> Result<(Uuid, Uuid, CleanerClientLink), AppError> {
        let (cleaner_id, client_id) = match caller.role() {
            Some(UserRole::Client) => {
                let cleaner_id = match explicit {
                    Some(id) => id,
                    None => RelationshipLookup::preferred_cleaner(db, caller.id)
                        .await?
                        .ok_or(AppError::NotFound)?,
                };
                (cleaner_id, caller.id)
            }
            Some(UserRole::Cleaner) => {
                let client_id = explicit.ok_or(AppError::NotFound)?;
                (caller.id, client_id)
            }
            _ => {
                return Err(AppError::forbidden(
                    "only cleaners and clients may open this conversation",
                ));
            }
        };

        if cleaner_id == client_id {
            return Err(AppError::forbidden("cannot message yourself"));
        }

        let link = RelationshipLookup::active_cleaner_client(db, cleaner_id, client_id)
            .await?
            .ok_or_else(|| AppError::forbidden("no active cleaner-client relationship"))?;

        Ok((cleaner_id, client_id, link))
    }

    /// Whether a conversation still accepts messages. Appointment-scoped
    /// conversations lock once the linked appointment completes.
    pub async fn ensure_sendable(
        db: &Pool<Postgres>,
        conversation: &Conversation,
    ) -> Result<(), AppError> {
        if conversation.kind != ConversationKind::Appointment {
            return Ok(());
        }
        let appointment_id = conversation.appointment_id.ok_or(AppError::Internal)?;
        if RelationshipLookup::appointment_completed(db, appointment_id).await? {
            return Err(AppError::Locked);
        }
        Ok(())
    }
}
