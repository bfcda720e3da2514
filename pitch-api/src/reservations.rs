use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{DateTime, NaiveDate, Utc};
use pitch_booking::slots::day_window;
use pitch_booking::{plan_booking, BookingPlan, BookingRequest, Customer, GuestContact, Reservation, ReservationStatus, SlotKey};
use pitch_core::Payment;
use pitch_shared::models::events::ReservationCreatedEvent;
use pitch_shared::models::DomainEvent;
use pitch_shared::pii::{mask_email, mask_phone};
use pitch_store::redis_repo::slot_hold_key;
use pitch_catalog::TimeOfDay;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::fields::load_field_context;
use crate::middleware::auth::decode_token;
use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/reservations", post(create_reservation))
        .route("/v1/reservations/{id}", get(get_reservation))
}

#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    pub field_id: Uuid,
    pub date: NaiveDate,
    pub slots: Vec<TimeOfDay>,
    #[serde(default)]
    pub guest: Option<GuestContact>,
}

#[derive(Debug, Serialize)]
pub struct CreateReservationResponse {
    pub reservation: Reservation,
    pub payment: Payment,
}

/// Public view of a reservation; guest contact details are masked.
#[derive(Debug, Serialize)]
pub struct ReservationView {
    pub id: Uuid,
    pub field_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub amount: i64,
    pub status: ReservationStatus,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Reservation> for ReservationView {
    fn from(r: &Reservation) -> Self {
        let guest = r.customer.guest();
        Self {
            id: r.id,
            field_id: r.field_id,
            start_time: r.start_time,
            end_time: r.end_time,
            amount: r.amount,
            status: r.status,
            guest_name: guest.map(|g| g.name.clone()),
            guest_email: guest.and_then(|g| g.email.as_ref()).map(|e| mask_email(e.expose())),
            guest_phone: guest.and_then(|g| g.phone.as_ref()).map(|p| mask_phone(p.expose())),
            created_at: r.created_at,
        }
    }
}

/// POST /v1/reservations
async fn create_reservation(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<CreateReservationResponse>), AppError> {
    let ctx = load_field_context(&state, req.field_id).await?;

    // 1. Who is booking: a signed-in user of this tenant, or a guest with contact details
    let claims = match bearer {
        Some(TypedHeader(Authorization(bearer))) => Some(decode_token(bearer.token(), &state.auth)?),
        None => None,
    };
    let customer = match claims.as_ref().and_then(|c| c.user_id().map(|id| (id, c.tenant_id))) {
        Some((user_id, tenant_id)) => {
            if tenant_id != Some(ctx.tenant.id) {
                return Err(AppError::AuthorizationError("User belongs to another tenant".to_string()));
            }
            Customer::User { user_id }
        }
        None => {
            let guest = req
                .guest
                .ok_or_else(|| AppError::ValidationError("guest contact is required".to_string()))?;
            Customer::Guest(guest)
        }
    };
    customer.validate()?;

    // 2. Re-run the slot rules against current reservations
    let schedules = state.fields.list_schedules(ctx.field.id).await?;
    let (from, to) = day_window(req.date, ctx.offset)?;
    let existing = state.reservations.list_for_field(ctx.field.id, from, to).await?;
    let request = BookingRequest { date: req.date, slots: req.slots };
    let plan = plan_booking(&ctx.field, &schedules, &existing, &request, ctx.offset, Utc::now())?;

    let reservation = Reservation::new(ctx.tenant.id, &plan, customer);
    let payment = Payment::pending(reservation.id, reservation.amount);

    // 3. Fail fast when another request is committing the same slots
    let holds = acquire_holds(&state, &plan, reservation.id).await?;

    // 4. The store re-checks overlap atomically with the insert
    let stored = state.reservations.insert_reservation(&reservation, &payment).await;
    release_holds(&state, &holds, reservation.id).await;
    stored?;

    info!(
        reservation_id = %reservation.id,
        field_id = %reservation.field_id,
        start = %reservation.start_time,
        hours = plan.hours,
        "reservation created"
    );

    state
        .events
        .publish(DomainEvent::ReservationCreated(ReservationCreatedEvent {
            reservation_id: reservation.id,
            tenant_id: reservation.tenant_id,
            field_id: reservation.field_id,
            start_time: reservation.start_time.timestamp(),
            end_time: reservation.end_time.timestamp(),
            amount: reservation.amount,
            timestamp: Utc::now().timestamp(),
        }))
        .await;

    Ok((StatusCode::CREATED, Json(CreateReservationResponse { reservation, payment })))
}

async fn acquire_holds(state: &AppState, plan: &BookingPlan, holder_id: Uuid) -> Result<Vec<String>, AppError> {
    let Some(redis) = &state.redis else {
        return Ok(Vec::new());
    };

    let holder = holder_id.to_string();
    let mut acquired = Vec::new();
    for start in &plan.slots {
        let key = slot_hold_key(plan.field_id, &SlotKey::new(plan.date, *start));
        match redis.acquire_slot_hold(&key, &holder, state.booking_rules.slot_hold_seconds).await {
            Ok(true) => acquired.push(key),
            Ok(false) => {
                release_holds(state, &acquired, holder_id).await;
                return Err(AppError::ConflictError(format!("slot {} is being booked", start)));
            }
            // Fail open: the store still rejects overlaps
            Err(e) => warn!("Slot hold unavailable for {}: {}", key, e),
        }
    }
    Ok(acquired)
}

async fn release_holds(state: &AppState, keys: &[String], holder: Uuid) {
    let Some(redis) = &state.redis else {
        return;
    };
    let holder = holder.to_string();
    for key in keys {
        if let Err(e) = redis.release_slot_hold(key, &holder).await {
            warn!("Failed to release slot hold {}: {}", key, e);
        }
    }
}

/// GET /v1/reservations/{id}
async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationView>, AppError> {
    let reservation = state
        .reservations
        .get_reservation(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("reservation {} not found", id)))?;
    Ok(Json(ReservationView::from(&reservation)))
}
