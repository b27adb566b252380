use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::error::AppError;

/// How a cleaner and client qualify for a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanerClientLink {
    /// An active cleaner_clients record; carries its id for
    /// related_entity_id.
    Record(Uuid),
    /// The cleaner is the preferred cleaner on the client's home.
    PreferredCleaner,
}

impl CleanerClientLink {
    pub fn related_entity_id(&self) -> Option<Uuid> {
        match self {
            CleanerClientLink::Record(id) => Some(*id),
            CleanerClientLink::PreferredCleaner => None,
        }
    }
}

/// Read-only lookups over the relationship records owned by the scheduling
/// and account services. These back the creation gates for cleaner_client
/// and business_employee conversations.
pub struct RelationshipLookup;

impl RelationshipLookup {
    /// Active cleaner<->client relationship, if any. Checks the explicit
    /// relationship record first, then the client's home preferred-cleaner
    /// field.
    pub async fn active_cleaner_client(
        db: &Pool<Postgres>,
        cleaner_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<CleanerClientLink>, AppError> {
        let rec = sqlx::query(
            "SELECT id FROM cleaner_clients \
             WHERE cleaner_id = $1 AND client_id = $2 AND active = TRUE \
             LIMIT 1",
        )
        .bind(cleaner_id)
        .bind(client_id)
        .fetch_optional(db)
        .await?;
        if let Some(row) = rec {
            return Ok(Some(CleanerClientLink::Record(row.get("id"))));
        }

        let preferred = sqlx::query(
            "SELECT 1 FROM homes WHERE client_id = $1 AND preferred_cleaner_id = $2 LIMIT 1",
        )
        .bind(client_id)
        .bind(cleaner_id)
        .fetch_optional(db)
        .await?;
        Ok(preferred.map(|_| CleanerClientLink::PreferredCleaner))
    }

    /// Active employment record between a business owner and an employee.
    pub async fn active_business_employee(
        db: &Pool<Postgres>,
        business_owner_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Option<Uuid>, AppError> {
        let rec = sqlx::query(
            "SELECT id FROM business_employees \
             WHERE business_owner_id = $1 AND employee_id = $2 AND active = TRUE \
             LIMIT 1",
        )
        .bind(business_owner_id)
        .bind(employee_id)
        .fetch_optional(db)
        .await?;
        Ok(rec.map(|row| row.get("id")))
    }

    /// Do two employees share a business? Gates employee_peer conversations.
    pub async fn are_coworkers(
        db: &Pool<Postgres>,
        employee_a: Uuid,
        employee_b: Uuid,
    ) -> Result<bool, AppError> {
        let rec = sqlx::query(
            "SELECT 1 FROM business_employees a \
             JOIN business_employees b ON a.business_owner_id = b.business_owner_id \
             WHERE a.employee_id = $1 AND b.employee_id = $2 \
               AND a.active = TRUE AND b.active = TRUE \
             LIMIT 1",
        )
        .bind(employee_a)
        .bind(employee_b)
        .fetch_optional(db)
        .await?;
        Ok(rec.is_some())
    }

    /// The client's preferred cleaner, resolved from their home record.
    pub async fn preferred_cleaner(
        db: &Pool<Postgres>,
        client_id: Uuid,
    ) -> Result<Option<Uuid>, AppError> {
        let rec = sqlx::query(
            "SELECT preferred_cleaner_id FROM homes \
             WHERE client_id = $1 AND preferred_cleaner_id IS NOT NULL \
             LIMIT 1",
        )
        .bind(client_id)
        .fetch_optional(db)
        .await?;
        Ok(rec.and_then(|row| row.get("preferred_cleaner_id")))
    }

    /// Appointment completion flag; completed appointments lock messaging.
    pub async fn appointment_completed(
        db: &Pool<Postgres>,
        appointment_id: Uuid,
    ) -> Result<bool, AppError> {
        let completed: Option<bool> =
            sqlx::query_scalar("SELECT completed FROM appointments WHERE id = $1")
                .bind(appointment_id)
                .fetch_optional(db)
                .await?;
        completed.ok_or(AppError::NotFound)
    }
}
