use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use pitch_core::{Permission, Principal, Tenant, TenantSettings, User};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::hash_password;
use crate::middleware::auth::{issue_token, Claims};
use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct RegisterTenantRequest {
    pub name: String,
    pub slug: String,
    pub owner_email: String,
    pub owner_name: String,
    pub owner_password: String,
    #[serde(default)]
    pub settings: Option<TenantSettings>,
}

#[derive(Debug, Serialize)]
pub struct RegisterTenantResponse {
    pub tenant: Tenant,
    pub owner: User,
    pub token: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/tenants", post(register_tenant))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/tenant", get(get_tenant))
        .route("/v1/admin/tenant/settings", put(update_settings))
}

/// POST /v1/tenants
///
/// Creates the tenant and its owner account, returning a token for the owner.
async fn register_tenant(
    State(state): State<AppState>,
    Json(req): Json<RegisterTenantRequest>,
) -> Result<(StatusCode, Json<RegisterTenantResponse>), AppError> {
    let tenant = Tenant::new(req.name, req.slug, req.settings.unwrap_or_default())?;
    let owner = User::new(
        tenant.id,
        &req.owner_email,
        &req.owner_name,
        hash_password(&req.owner_password)?,
        true,
    )?;

    state.tenants.register_tenant(&tenant, &owner).await?;

    info!(tenant_id = %tenant.id, slug = %tenant.slug, "tenant registered");
    let token = issue_token(&Claims::user(owner.id, tenant.id, &owner.email, &state.auth), &state.auth)?;
    Ok((StatusCode::CREATED, Json(RegisterTenantResponse { tenant, owner, token })))
}

/// GET /v1/admin/tenant
async fn get_tenant(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Tenant>, AppError> {
    principal.require(Permission::TenantManage)?;
    let tenant = state
        .tenants
        .get_tenant(principal.tenant_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("tenant not found".to_string()))?;
    Ok(Json(tenant))
}

/// PUT /v1/admin/tenant/settings
async fn update_settings(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(settings): Json<TenantSettings>,
) -> Result<Json<Tenant>, AppError> {
    principal.require(Permission::TenantManage)?;
    settings.validate()?;
    state.tenants.update_settings(principal.tenant_id, &settings).await?;

    let tenant = state
        .tenants
        .get_tenant(principal.tenant_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("tenant not found".to_string()))?;
    Ok(Json(tenant))
}
