use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::middleware::auth::{decode_token, issue_token, Claims};
use crate::{error::AppError, state::AppState};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    tenant_slug: String,
    email: String,
    password: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/login", post(login))
        .route("/v1/auth/guest", post(login_guest))
        .route("/v1/auth/me", get(me))
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    use argon2::password_hash::rand_core::OsRng;
    use argon2::password_hash::SaltString;
    use argon2::{Argon2, PasswordHasher};

    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::ValidationError(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::InternalServerError(format!("Password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let invalid = || AppError::AuthenticationError("Invalid credentials".to_string());

    let tenant = state.tenants.get_tenant_by_slug(&req.tenant_slug).await?.ok_or_else(invalid)?;
    let user = state
        .users
        .find_user_by_email(tenant.id, &req.email)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&req.password, &user.password_hash) {
        return Err(invalid());
    }

    info!(user_id = %user.id, tenant = %tenant.slug, "user logged in");
    let token = issue_token(&Claims::user(user.id, tenant.id, &user.email, &state.auth), &state.auth)?;
    Ok(Json(AuthResponse { token }))
}

async fn login_guest(State(state): State<AppState>) -> Result<Json<AuthResponse>, AppError> {
    let token = issue_token(&Claims::guest(&state.auth), &state.auth)?;
    Ok(Json(AuthResponse { token }))
}

async fn me(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Claims>, AppError> {
    Ok(Json(decode_token(bearer.token(), &state.auth)?))
}
