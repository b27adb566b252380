use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub exp: i64,
}

/// Validate a Bearer token (HS256, shared platform secret) and return its
/// claims. Token issuance is owned by the auth service.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized)
}

/// Middleware: extract the JWT and stash the caller's user id in request
/// extensions for the `User` extractor.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    let claims = verify_jwt(token, &state.config.jwt_secret)?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)?;
    req.extensions_mut().insert(user_id);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestClaims {
        sub: String,
        exp: i64,
    }

    fn token_for(sub: &str, secret: &str, exp: i64) -> String {
        encode(
            &Header::default(),
            &TestClaims {
                sub: sub.into(),
                exp,
            },
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn accepts_valid_token() {
        let user_id = Uuid::new_v4().to_string();
        let exp = chrono::Utc::now().timestamp() + 3600;
        let token = token_for(&user_id, "secret", exp);
        let claims = verify_jwt(&token, "secret").unwrap();
        assert_eq!(claims.sub, user_id);
    }

    #[test]
    fn rejects_wrong_secret() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let token = token_for("u", "secret", exp);
        assert!(verify_jwt(&token, "other-secret").is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let exp = chrono::Utc::now().timestamp() - 3600;
        let token = token_for("u", "secret", exp);
        assert!(verify_jwt(&token, "secret").is_err());
    }
}
