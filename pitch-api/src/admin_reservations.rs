use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use pitch_booking::{Reservation, ReservationStatus};
use pitch_core::repository::ReservationFilter;
use pitch_core::{Payment, PaymentStatus, Permission, Principal};
use pitch_shared::models::events::{PaymentRecordedEvent, ReservationStatusChangedEvent};
use pitch_shared::models::DomainEvent;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ReservationStatus,
}

#[derive(Debug, Deserialize)]
pub struct RecordPaymentRequest {
    pub status: PaymentStatus,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReservationDetail {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub payment: Option<Payment>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/reservations", get(list_reservations))
        .route("/v1/admin/reservations/{id}", get(get_reservation))
        .route("/v1/admin/reservations/{id}/status", post(update_status))
        .route("/v1/admin/reservations/{id}/payment", get(get_payment).post(record_payment))
}

async fn tenant_reservation(state: &AppState, principal: &Principal, id: Uuid) -> Result<Reservation, AppError> {
    state
        .reservations
        .get_reservation(id)
        .await?
        .filter(|r| r.tenant_id == principal.tenant_id)
        .ok_or_else(|| AppError::NotFoundError(format!("reservation {} not found", id)))
}

/// GET /v1/admin/reservations?field_id=&from=&to=&status=
async fn list_reservations(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(filter): Query<ReservationFilter>,
) -> Result<Json<Vec<Reservation>>, AppError> {
    principal.require(Permission::ReservationsRead)?;
    Ok(Json(state.reservations.list_reservations(principal.tenant_id, &filter).await?))
}

/// GET /v1/admin/reservations/{id}
async fn get_reservation(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationDetail>, AppError> {
    principal.require(Permission::ReservationsRead)?;
    let reservation = tenant_reservation(&state, &principal, id).await?;
    let payment = state.reservations.get_payment(id).await?;
    Ok(Json(ReservationDetail { reservation, payment }))
}

/// POST /v1/admin/reservations/{id}/status
async fn update_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Reservation>, AppError> {
    principal.require(Permission::ReservationsWrite)?;
    let mut reservation = tenant_reservation(&state, &principal, id).await?;

    let previous = reservation.transition(req.status)?;
    state.reservations.update_reservation(&reservation, previous).await?;

    info!(reservation_id = %id, from = %previous, to = %reservation.status, by = %principal.user_id, "reservation status changed");

    state
        .events
        .publish(DomainEvent::ReservationStatusChanged(ReservationStatusChangedEvent {
            reservation_id: reservation.id,
            tenant_id: reservation.tenant_id,
            field_id: reservation.field_id,
            from: previous.to_string(),
            to: reservation.status.to_string(),
            timestamp: Utc::now().timestamp(),
        }))
        .await;

    Ok(Json(reservation))
}

/// GET /v1/admin/reservations/{id}/payment
async fn get_payment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<Payment>, AppError> {
    principal.require(Permission::ReservationsRead)?;
    tenant_reservation(&state, &principal, id).await?;
    let payment = state
        .reservations
        .get_payment(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("payment for reservation {} not found", id)))?;
    Ok(Json(payment))
}

/// POST /v1/admin/reservations/{id}/payment
async fn record_payment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<RecordPaymentRequest>,
) -> Result<Json<Payment>, AppError> {
    principal.require(Permission::PaymentsWrite)?;
    let reservation = tenant_reservation(&state, &principal, id).await?;
    let mut payment = state
        .reservations
        .get_payment(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("payment for reservation {} not found", id)))?;

    let previous = payment.status;
    payment.record(req.status, req.method, req.reference)?;
    state.reservations.update_payment(&payment, previous).await?;

    info!(reservation_id = %id, status = %payment.status, "payment recorded");

    state
        .events
        .publish(DomainEvent::PaymentRecorded(PaymentRecordedEvent {
            payment_id: payment.id,
            reservation_id: reservation.id,
            tenant_id: reservation.tenant_id,
            status: payment.status.to_string(),
            amount: payment.amount,
            timestamp: Utc::now().timestamp(),
        }))
        .await;

    Ok(Json(payment))
}
