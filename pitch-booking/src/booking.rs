use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use pitch_catalog::pricing::total_price;
use pitch_catalog::{Field, Schedule, TimeOfDay};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::selection::MAX_SELECTED_SLOTS;
use crate::slots::{check_date, derive_day, local_to_utc, DayAvailability};
use crate::{BookingError, Reservation};

/// Slots a customer asks to reserve on one local date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub date: NaiveDate,
    pub slots: Vec<TimeOfDay>,
}

/// A request that passed every check, ready to become a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingPlan {
    pub field_id: Uuid,
    pub date: NaiveDate,
    pub slots: Vec<TimeOfDay>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub hours: u32,
    pub amount: i64,
}

/// Applies the booking-page selection rules on the server.
///
/// `existing` must contain the field's reservations for at least the requested
/// date; `now` rejects slots that have already started.
pub fn plan_booking(
    field: &Field,
    schedules: &[Schedule],
    existing: &[Reservation],
    request: &BookingRequest,
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> Result<BookingPlan, BookingError> {
    if !field.is_available {
        return Err(BookingError::FieldUnavailable);
    }
    check_date(request.date)?;
    if request.slots.is_empty() || request.slots.len() > MAX_SELECTED_SLOTS {
        return Err(BookingError::InvalidSelection(format!(
            "select between 1 and {} slots",
            MAX_SELECTED_SLOTS
        )));
    }

    let day = derive_day(request.date, schedules, existing, offset);
    let mut indices = resolve_indices(&day, &request.slots)?;
    indices.sort_unstable();
    indices.dedup();
    if indices.len() != request.slots.len() {
        return Err(BookingError::InvalidSelection("duplicate slot".to_string()));
    }
    if indices.windows(2).any(|w| w[1] - w[0] != 1) {
        return Err(BookingError::NotContiguous);
    }

    let first = &day.slots[indices[0]];
    let start_time = local_to_utc(first.start.on(day.date), offset);
    if start_time <= now {
        return Err(BookingError::PastSlot(first.start.to_string()));
    }
    if let Some(taken) = indices.iter().map(|i| &day.slots[*i]).find(|s| s.occupied) {
        return Err(BookingError::SlotOccupied(taken.start.to_string()));
    }

    // Ends where the last slot's view ends, so a slot cut at local midnight
    // books and displays the same interval.
    let last = &day.slots[indices[indices.len() - 1]];
    let end_time = local_to_utc(last.end.on(day.date), offset);

    let hours = indices.len() as u32;
    Ok(BookingPlan {
        field_id: field.id,
        date: request.date,
        slots: indices.iter().map(|i| day.slots[*i].start).collect(),
        start_time,
        end_time,
        hours,
        amount: total_price(field.price_per_hour, hours),
    })
}

fn resolve_indices(day: &DayAvailability, slots: &[TimeOfDay]) -> Result<Vec<usize>, BookingError> {
    slots
        .iter()
        .map(|s| day.index_of(*s).ok_or_else(|| BookingError::SlotNotOffered(s.to_string())))
        .collect()
}
