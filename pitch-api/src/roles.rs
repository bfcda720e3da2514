use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use pitch_core::identity::RoleInput;
use pitch_core::{Permission, Principal, Role, User};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::hash_password;
use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub role_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRolesRequest {
    pub role_ids: Vec<Uuid>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/roles", get(list_roles).post(create_role))
        .route("/v1/admin/roles/{id}", put(update_role).delete(delete_role))
        .route("/v1/admin/users", get(list_users).post(create_user))
        .route("/v1/admin/users/{id}/roles", put(assign_roles))
}

async fn tenant_role(state: &AppState, principal: &Principal, id: Uuid) -> Result<Role, AppError> {
    state
        .roles
        .get_role(id)
        .await?
        .filter(|r| r.tenant_id == principal.tenant_id)
        .ok_or_else(|| AppError::NotFoundError(format!("role {} not found", id)))
}

/// Rejects role ids that do not belong to the caller's tenant.
async fn check_role_ids(state: &AppState, principal: &Principal, role_ids: &[Uuid]) -> Result<(), AppError> {
    let roles = state.roles.list_roles(principal.tenant_id).await?;
    match role_ids.iter().find(|id| !roles.iter().any(|r| r.id == **id)) {
        Some(unknown) => Err(AppError::ValidationError(format!("unknown role {}", unknown))),
        None => Ok(()),
    }
}

// ============================================================================
// Role Handlers
// ============================================================================

async fn list_roles(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<Role>>, AppError> {
    principal.require(Permission::RolesManage)?;
    Ok(Json(state.roles.list_roles(principal.tenant_id).await?))
}

async fn create_role(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(input): Json<RoleInput>,
) -> Result<(StatusCode, Json<Role>), AppError> {
    principal.require(Permission::RolesManage)?;
    let role = Role::new(principal.tenant_id, input)?;
    state.roles.create_role(&role).await?;

    info!(role_id = %role.id, name = %role.name, "role created");
    Ok((StatusCode::CREATED, Json(role)))
}

async fn update_role(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(input): Json<RoleInput>,
) -> Result<Json<Role>, AppError> {
    principal.require(Permission::RolesManage)?;
    let mut role = tenant_role(&state, &principal, id).await?;
    role.apply(input)?;
    state.roles.update_role(&role).await?;
    Ok(Json(role))
}

async fn delete_role(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    principal.require(Permission::RolesManage)?;
    tenant_role(&state, &principal, id).await?;
    state.roles.delete_role(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// User Handlers
// ============================================================================

async fn list_users(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<User>>, AppError> {
    principal.require(Permission::UsersManage)?;
    Ok(Json(state.users.list_users(principal.tenant_id).await?))
}

async fn create_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    principal.require(Permission::UsersManage)?;
    check_role_ids(&state, &principal, &req.role_ids).await?;

    let mut user = User::new(principal.tenant_id, &req.email, &req.name, hash_password(&req.password)?, false)?;
    user.role_ids = req.role_ids;
    state.users.create_user(&user).await?;

    info!(user_id = %user.id, by = %principal.user_id, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn assign_roles(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignRolesRequest>,
) -> Result<Json<User>, AppError> {
    principal.require(Permission::UsersManage)?;
    let user = state
        .users
        .get_user(id)
        .await?
        .filter(|u| u.tenant_id == principal.tenant_id)
        .ok_or_else(|| AppError::NotFoundError(format!("user {} not found", id)))?;
    check_role_ids(&state, &principal, &req.role_ids).await?;

    state.users.set_user_roles(user.id, &req.role_ids).await?;
    let updated = state
        .users
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("user {} not found", id)))?;
    Ok(Json(updated))
}
