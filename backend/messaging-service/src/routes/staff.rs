use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::guards::User as AuthUser,
    services::membership::MembershipAuthority,
    state::AppState,
};

#[derive(Deserialize)]
pub struct StaffQuery {
    pub search: Option<String>,
}

#[derive(Serialize)]
pub struct StaffMemberDto {
    pub id: Uuid,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
}

/// GET /staff?search=
/// Directory of eligible direct-message targets for owner/HR. Names are
/// decrypted here and filtered case-insensitively in-process: the ciphertext
/// columns can't be matched in SQL, and the staff roster is small.
pub async fn search_staff(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<StaffQuery>,
) -> Result<Json<Vec<StaffMemberDto>>, AppError> {
    let caller = MembershipAuthority::load_user(&state.db, user.id).await?;
    if !caller.role().is_some_and(|role| role.is_staff()) {
        return Err(AppError::forbidden("the staff directory is owner/HR only"));
    }

    let needle = query.search.unwrap_or_default().trim().to_lowercase();

    let mut members: Vec<StaffMemberDto> = MembershipAuthority::support_roster(&state.db)
        .await?
        .into_iter()
        .filter(|staff| staff.id != caller.id)
        .map(|staff| {
            let first_name = staff.first_name.as_deref().map(|v| state.pii.decrypt(v));
            let last_name = staff.last_name.as_deref().map(|v| state.pii.decrypt(v));
            StaffMemberDto {
                id: staff.id,
                username: staff.username,
                first_name,
                last_name,
                role: staff.role,
            }
        })
        .filter(|member| {
            if needle.is_empty() {
                return true;
            }
            member
                .first_name
                .as_deref()
                .is_some_and(|name| name.to_lowercase().contains(&needle))
                || member
                    .last_name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains(&needle))
                || member.username.to_lowercase().contains(&needle)
        })
        .collect();

    members.sort_by(|a, b| a.username.cmp(&b.username));

    Ok(Json(members))
}
