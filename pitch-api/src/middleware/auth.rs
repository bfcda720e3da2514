use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use pitch_core::Principal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, state::{AppState, AuthConfig}};

pub const ROLE_USER: &str = "USER";
pub const ROLE_GUEST: &str = "GUEST";

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id, or `guest-<uuid>` for guest tokens
    pub sub: String,
    pub tenant_id: Option<Uuid>,
    pub email: Option<String>,
    pub role: String,
    pub exp: usize,
}

impl Claims {
    pub fn user(user_id: Uuid, tenant_id: Uuid, email: &str, auth: &AuthConfig) -> Self {
        Self {
            sub: user_id.to_string(),
            tenant_id: Some(tenant_id),
            email: Some(email.to_string()),
            role: ROLE_USER.to_owned(),
            exp: expiry(auth),
        }
    }

    pub fn guest(auth: &AuthConfig) -> Self {
        Self {
            sub: format!("guest-{}", Uuid::new_v4()),
            tenant_id: None,
            email: None,
            role: ROLE_GUEST.to_owned(),
            exp: expiry(auth),
        }
    }

    /// The dashboard user behind the token, `None` for guests.
    pub fn user_id(&self) -> Option<Uuid> {
        if self.role != ROLE_USER {
            return None;
        }
        Uuid::parse_str(&self.sub).ok()
    }
}

fn expiry(auth: &AuthConfig) -> usize {
    (Utc::now() + Duration::seconds(auth.expiration as i64)).timestamp() as usize
}

pub fn issue_token(claims: &Claims, auth: &AuthConfig) -> Result<String, AppError> {
    encode(&Header::default(), claims, &EncodingKey::from_secret(auth.secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

pub fn decode_token(token: &str, auth: &AuthConfig) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::AuthenticationError("Invalid or expired token".to_string()))
}

// ============================================================================
// Dashboard Authentication Middleware
// ============================================================================

/// Resolves the bearer token to a [`Principal`] with the user's current
/// permissions and stores it in the request extensions.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 1. Extract token from Authorization header
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token".to_string()))?;

    // 2. Decode and validate JWT
    let claims = decode_token(token, &state.auth)?;

    // 3. Guests never reach the dashboard
    let user_id = claims
        .user_id()
        .ok_or_else(|| AppError::AuthorizationError("Dashboard access requires a user account".to_string()))?;

    // 4. Permissions come from the store so role edits apply immediately
    let user = state
        .users
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::AuthenticationError("Unknown user".to_string()))?;
    if claims.tenant_id != Some(user.tenant_id) {
        return Err(AppError::AuthenticationError("Token tenant mismatch".to_string()));
    }
    let roles = state.roles.list_roles(user.tenant_id).await?;
    let principal = Principal::resolve(&user, &roles);

    // 5. Inject principal
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> AuthConfig {
        AuthConfig { secret: "test-secret".to_string(), expiration: 60 }
    }

    #[test]
    fn test_token_roundtrip_keeps_identity() {
        let user_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();
        let token = issue_token(&Claims::user(user_id, tenant_id, "a@b.io", &auth()), &auth()).unwrap();

        let claims = decode_token(&token, &auth()).unwrap();
        assert_eq!(claims.user_id(), Some(user_id));
        assert_eq!(claims.tenant_id, Some(tenant_id));
    }

    #[test]
    fn test_guest_token_has_no_user() {
        let token = issue_token(&Claims::guest(&auth()), &auth()).unwrap();
        let claims = decode_token(&token, &auth()).unwrap();
        assert_eq!(claims.role, ROLE_GUEST);
        assert_eq!(claims.user_id(), None);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = issue_token(&Claims::guest(&auth()), &auth()).unwrap();
        let other = AuthConfig { secret: "other".to_string(), expiration: 60 };
        assert!(matches!(decode_token(&token, &other), Err(AppError::AuthenticationError(_))));
    }
}
