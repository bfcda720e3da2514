use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use futures_util::{Stream, StreamExt};
use pitch_booking::slots::{day_window, derive_day, derive_range, multi_day_window, today};
use pitch_booking::{plan_booking, BookingRequest, DayAvailability, OccupiedSlots, Reservation, SlotKey};
use pitch_catalog::pricing::quote;
use pitch_catalog::{Field, PriceQuote, Schedule, SportType, TimeOfDay};
use pitch_core::Tenant;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/tenants/{slug}/fields", get(list_tenant_fields))
        .route("/v1/fields/{id}", get(get_field))
        .route("/v1/fields/{id}/availability", get(get_availability))
        .route("/v1/fields/{id}/quote", post(quote_selection))
        .route("/v1/fields/{id}/stream", get(stream_field_events))
}

#[derive(Debug, Deserialize)]
struct ListFieldsQuery {
    sport_type: Option<SportType>,
}

#[derive(Debug, Serialize)]
struct FieldDetail {
    #[serde(flatten)]
    field: Field,
    currency: String,
    schedules: Vec<Schedule>,
}

#[derive(Debug, Deserialize)]
struct AvailabilityQuery {
    date: Option<NaiveDate>,
    from: Option<NaiveDate>,
    days: Option<u32>,
}

#[derive(Debug, Serialize)]
struct AvailabilityResponse {
    field_id: Uuid,
    price_per_hour: i64,
    night_price_per_hour: Option<i64>,
    currency: String,
    utc_offset_minutes: i32,
    days: Vec<DayAvailability>,
    /// "date-slot" keys of every occupied candidate in the window
    occupied: Vec<String>,
}

#[derive(Debug, Serialize)]
struct QuoteResponse {
    field_id: Uuid,
    date: NaiveDate,
    slots: Vec<TimeOfDay>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    currency: String,
    #[serde(flatten)]
    quote: PriceQuote,
}

/// A field together with the tenant whose clock its schedules follow.
pub(crate) struct FieldContext {
    pub field: Field,
    pub tenant: Tenant,
    pub offset: FixedOffset,
}

pub(crate) async fn load_field_context(state: &AppState, field_id: Uuid) -> Result<FieldContext, AppError> {
    let field = state
        .fields
        .get_field(field_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("field {} not found", field_id)))?;
    let tenant = state
        .tenants
        .get_tenant(field.tenant_id)
        .await?
        .ok_or_else(|| AppError::InternalServerError(format!("field {} has no tenant", field_id)))?;
    let offset = tenant.settings.offset()?;
    Ok(FieldContext { field, tenant, offset })
}

/// GET /v1/tenants/{slug}/fields
async fn list_tenant_fields(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<ListFieldsQuery>,
) -> Result<Json<Vec<Field>>, AppError> {
    let tenant = state
        .tenants
        .get_tenant_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("tenant {} not found", slug)))?;

    let fields = state.fields.list_fields(tenant.id, query.sport_type).await?;
    Ok(Json(fields.into_iter().filter(|f| f.is_available).collect()))
}

/// GET /v1/fields/{id}
async fn get_field(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FieldDetail>, AppError> {
    let ctx = load_field_context(&state, id).await?;
    let schedules = state.fields.list_schedules(id).await?;
    Ok(Json(FieldDetail {
        field: ctx.field,
        currency: ctx.tenant.settings.currency,
        schedules,
    }))
}

/// GET /v1/fields/{id}/availability?date= | ?from=&days=
async fn get_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let ctx = load_field_context(&state, id).await?;
    let schedules = state.fields.list_schedules(id).await?;
    let rules = &state.booking_rules;

    let (from, days) = match query.date {
        Some(date) => (date, 1),
        None => (
            query.from.unwrap_or_else(|| today(ctx.offset)),
            query.days.unwrap_or(rules.default_window_days),
        ),
    };
    if days == 0 || days > rules.max_window_days {
        return Err(AppError::ValidationError(format!(
            "days must be between 1 and {}",
            rules.max_window_days
        )));
    }

    let (window_start, window_end) = if days == 1 {
        day_window(from, ctx.offset)?
    } else {
        multi_day_window(from, days, ctx.offset)?
    };
    let reservations = state.reservations.list_for_field(id, window_start, window_end).await?;

    let days = if days == 1 {
        vec![derive_day(from, &schedules, &reservations, ctx.offset)]
    } else {
        derive_range(from, days, &schedules, &reservations, ctx.offset)
    };
    let occupied = occupied_keys(&days, &reservations, ctx.offset);

    tracing::debug!(field_id = %id, %from, days = days.len(), occupied = occupied.len(), "availability derived");

    Ok(Json(AvailabilityResponse {
        field_id: id,
        price_per_hour: ctx.field.price_per_hour,
        night_price_per_hour: ctx.field.night_price_per_hour,
        currency: ctx.tenant.settings.currency,
        utc_offset_minutes: ctx.tenant.settings.utc_offset_minutes,
        days,
        occupied,
    }))
}

fn occupied_keys(days: &[DayAvailability], reservations: &[Reservation], offset: FixedOffset) -> Vec<String> {
    let candidates: Vec<SlotKey> = days
        .iter()
        .flat_map(|d| d.slots.iter().map(move |s| SlotKey::new(d.date, s.start)))
        .collect();
    OccupiedSlots::compute(&candidates, reservations, offset).keys()
}

/// POST /v1/fields/{id}/quote
async fn quote_selection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<BookingRequest>,
) -> Result<Json<QuoteResponse>, AppError> {
    let ctx = load_field_context(&state, id).await?;
    let schedules = state.fields.list_schedules(id).await?;
    let (from, to) = day_window(req.date, ctx.offset)?;
    let existing = state.reservations.list_for_field(id, from, to).await?;

    let plan = plan_booking(&ctx.field, &schedules, &existing, &req, ctx.offset, Utc::now())?;

    Ok(Json(QuoteResponse {
        field_id: id,
        date: plan.date,
        slots: plan.slots,
        start_time: plan.start_time,
        end_time: plan.end_time,
        currency: ctx.tenant.settings.currency,
        quote: quote(&ctx.field, plan.hours),
    }))
}

/// GET /v1/fields/{id}/stream
///
/// Server-sent events for reservation changes on the field, so open booking
/// pages can refresh occupied slots.
async fn stream_field_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    load_field_context(&state, id).await?;
    let rx = state.events.subscribe();

    let stream = tokio_stream::wrappers::BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) if event.field_id() == Some(id) => {
                Some(Event::default().event(event.name()).json_data(&event))
            }
            // Lagged receivers just skip what they missed
            _ => None,
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
