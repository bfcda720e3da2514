use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Extension, Json, Router,
};
use pitch_catalog::schedule::build_week;
use pitch_catalog::{DayOfWeek, Field, FieldInput, Schedule, ScheduleInput, SportType};
use pitch_core::{Permission, Principal};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListFieldsQuery {
    pub sport_type: Option<SportType>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/fields", get(list_fields).post(create_field))
        .route("/v1/admin/fields/{id}", get(get_field).put(update_field).delete(delete_field))
        .route("/v1/admin/fields/{id}/schedules", get(list_schedules).put(replace_schedules))
        .route("/v1/admin/fields/{id}/schedules/{day}", delete(delete_schedule))
}

/// Loads a field of the caller's tenant; other tenants' fields look missing.
pub(crate) async fn tenant_field(state: &AppState, principal: &Principal, id: Uuid) -> Result<Field, AppError> {
    state
        .fields
        .get_field(id)
        .await?
        .filter(|f| f.tenant_id == principal.tenant_id)
        .ok_or_else(|| AppError::NotFoundError(format!("field {} not found", id)))
}

// ============================================================================
// Field Management Handlers
// ============================================================================

/// GET /v1/admin/fields
async fn list_fields(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListFieldsQuery>,
) -> Result<Json<Vec<Field>>, AppError> {
    principal.require(Permission::FieldsRead)?;
    Ok(Json(state.fields.list_fields(principal.tenant_id, query.sport_type).await?))
}

/// POST /v1/admin/fields
async fn create_field(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(input): Json<FieldInput>,
) -> Result<(StatusCode, Json<Field>), AppError> {
    principal.require(Permission::FieldsWrite)?;
    let field = Field::new(principal.tenant_id, input)?;
    state.fields.create_field(&field).await?;

    info!(field_id = %field.id, tenant_id = %field.tenant_id, "field created");
    Ok((StatusCode::CREATED, Json(field)))
}

/// GET /v1/admin/fields/{id}
async fn get_field(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<Field>, AppError> {
    principal.require(Permission::FieldsRead)?;
    Ok(Json(tenant_field(&state, &principal, id).await?))
}

/// PUT /v1/admin/fields/{id}
async fn update_field(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(input): Json<FieldInput>,
) -> Result<Json<Field>, AppError> {
    principal.require(Permission::FieldsWrite)?;
    let mut field = tenant_field(&state, &principal, id).await?;
    field.apply(input)?;
    state.fields.update_field(&field).await?;
    Ok(Json(field))
}

/// DELETE /v1/admin/fields/{id}
async fn delete_field(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    principal.require(Permission::FieldsWrite)?;
    tenant_field(&state, &principal, id).await?;
    state.fields.delete_field(id).await?;

    info!(field_id = %id, "field deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Schedule Handlers
// ============================================================================

/// GET /v1/admin/fields/{id}/schedules
async fn list_schedules(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Schedule>>, AppError> {
    principal.require(Permission::FieldsRead)?;
    tenant_field(&state, &principal, id).await?;
    Ok(Json(state.fields.list_schedules(id).await?))
}

/// PUT /v1/admin/fields/{id}/schedules
///
/// Replaces the whole week; days left out become closed.
async fn replace_schedules(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(week): Json<Vec<ScheduleInput>>,
) -> Result<Json<Vec<Schedule>>, AppError> {
    principal.require(Permission::SchedulesWrite)?;
    tenant_field(&state, &principal, id).await?;

    let schedules = build_week(id, week)?;
    state.fields.replace_schedules(id, &schedules).await?;
    Ok(Json(schedules))
}

/// DELETE /v1/admin/fields/{id}/schedules/{day}
async fn delete_schedule(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((id, day)): Path<(Uuid, String)>,
) -> Result<StatusCode, AppError> {
    principal.require(Permission::SchedulesWrite)?;
    tenant_field(&state, &principal, id).await?;

    let day: DayOfWeek = day.parse()?;
    state.fields.delete_schedule(id, day).await?;
    Ok(StatusCode::NO_CONTENT)
}
