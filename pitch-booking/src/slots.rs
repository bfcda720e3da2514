//! Hourly slot derivation.
//!
//! A field's weekly schedule is turned into candidate 60-minute start times for
//! a calendar date; existing reservations then mark candidates as occupied.
//! All dates and times here are tenant-local wall clock; reservations are
//! stored in UTC and converted through the tenant's fixed offset.

use chrono::{DateTime, Datelike, Days, Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use pitch_catalog::{DayOfWeek, Schedule, TimeOfDay};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::{BookingError, Reservation};

pub const SLOT_MINUTES: u16 = 60;

pub fn utc_offset(minutes: i32) -> Result<FixedOffset, BookingError> {
    FixedOffset::east_opt(minutes * 60).ok_or(BookingError::InvalidOffset(minutes))
}

pub fn local_to_utc(local: NaiveDateTime, offset: FixedOffset) -> DateTime<Utc> {
    (local - Duration::seconds(i64::from(offset.local_minus_utc()))).and_utc()
}

pub fn utc_to_local(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDateTime {
    instant.with_timezone(&offset).naive_local()
}

pub fn today(offset: FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(&offset).date_naive()
}

/// Schedule entry for the weekday of `date`, if the field opens that day.
pub fn schedule_for(date: NaiveDate, schedules: &[Schedule]) -> Option<&Schedule> {
    let day = DayOfWeek::from(date.weekday());
    schedules.iter().find(|s| s.day_of_week == day)
}

/// One start time per hour from opening, strictly before closing.
pub fn hourly_slots(schedule: &Schedule) -> Vec<TimeOfDay> {
    let mut slots = Vec::new();
    let mut cursor = Some(schedule.start_time);
    while let Some(start) = cursor {
        if start >= schedule.end_time {
            break;
        }
        slots.push(start);
        cursor = start.checked_add_minutes(SLOT_MINUTES);
    }
    slots
}

/// Latest calendar year accepted for availability and bookings. Keeps every
/// window and offset shift well inside chrono's representable range.
pub const MAX_YEAR: i32 = 9999;

pub fn check_date(date: NaiveDate) -> Result<NaiveDate, BookingError> {
    if (1..=MAX_YEAR).contains(&date.year()) {
        Ok(date)
    } else {
        Err(BookingError::DateOutOfRange(date))
    }
}

/// UTC bounds of the local calendar day `[00:00, next 00:00)`.
pub fn day_window(date: NaiveDate, offset: FixedOffset) -> Result<(DateTime<Utc>, DateTime<Utc>), BookingError> {
    multi_day_window(date, 1, offset)
}

/// UTC bounds of `days` consecutive local days starting at `from`.
pub fn multi_day_window(
    from: NaiveDate,
    days: u32,
    offset: FixedOffset,
) -> Result<(DateTime<Utc>, DateTime<Utc>), BookingError> {
    let last = from
        .checked_add_days(Days::new(u64::from(days.max(1) - 1)))
        .ok_or(BookingError::DateOutOfRange(from))?;
    check_date(from)?;
    check_date(last)?;

    let start = TimeOfDay::MIDNIGHT.on(from);
    let end = TimeOfDay::END_OF_DAY.on(last);
    Ok((local_to_utc(start, offset), local_to_utc(end, offset)))
}

/// Identifies one candidate slot; rendered as `"<date>-<HH:MM>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub date: NaiveDate,
    pub start: TimeOfDay,
}

impl SlotKey {
    pub fn new(date: NaiveDate, start: TimeOfDay) -> Self {
        Self { date, start }
    }

    fn local_start(&self) -> NaiveDateTime {
        self.start.on(self.date)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.date.format("%Y-%m-%d"), self.start)
    }
}

/// Set of candidate slots covered by a live reservation.
#[derive(Debug, Clone, Default)]
pub struct OccupiedSlots(HashSet<SlotKey>);

impl OccupiedSlots {
    /// A candidate is occupied when its start lies in `[reservation start, reservation end)`.
    pub fn compute(candidates: &[SlotKey], reservations: &[Reservation], offset: FixedOffset) -> Self {
        let mut occupied = HashSet::new();
        for reservation in reservations.iter().filter(|r| r.status.occupies_slot()) {
            let start = utc_to_local(reservation.start_time, offset);
            let end = utc_to_local(reservation.end_time, offset);
            for key in candidates {
                let slot_start = key.local_start();
                if start <= slot_start && slot_start < end {
                    occupied.insert(*key);
                }
            }
        }
        Self(occupied)
    }

    pub fn contains(&self, date: NaiveDate, start: TimeOfDay) -> bool {
        self.0.contains(&SlotKey::new(date, start))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `"date-slot"` keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<&SlotKey> = self.0.iter().collect();
        keys.sort();
        keys.into_iter().map(|k| k.to_string()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotView {
    pub index: usize,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub occupied: bool,
}

/// Candidate slots of one field on one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub day_of_week: DayOfWeek,
    pub slots: Vec<SlotView>,
}

impl DayAvailability {
    pub fn index_of(&self, start: TimeOfDay) -> Option<usize> {
        self.slots.iter().position(|s| s.start == start)
    }

    pub fn slot(&self, index: usize) -> Option<&SlotView> {
        self.slots.get(index)
    }

    pub fn free_count(&self) -> usize {
        self.slots.iter().filter(|s| !s.occupied).count()
    }
}

/// Derives the slot list for `date`. `reservations` may cover a wider window;
/// only those touching this date's candidates matter.
pub fn derive_day(
    date: NaiveDate,
    schedules: &[Schedule],
    reservations: &[Reservation],
    offset: FixedOffset,
) -> DayAvailability {
    let starts = schedule_for(date, schedules).map(hourly_slots).unwrap_or_default();
    let keys: Vec<SlotKey> = starts.iter().map(|s| SlotKey::new(date, *s)).collect();
    let occupied = OccupiedSlots::compute(&keys, reservations, offset);

    let slots = starts
        .into_iter()
        .enumerate()
        .map(|(index, start)| SlotView {
            index,
            start,
            end: start.checked_add_minutes(SLOT_MINUTES).unwrap_or(TimeOfDay::END_OF_DAY),
            occupied: occupied.contains(date, start),
        })
        .collect();

    DayAvailability {
        date,
        day_of_week: DayOfWeek::from(date.weekday()),
        slots,
    }
}

/// Availability for `days` consecutive dates starting at `from`.
pub fn derive_range(
    from: NaiveDate,
    days: u32,
    schedules: &[Schedule],
    reservations: &[Reservation],
    offset: FixedOffset,
) -> Vec<DayAvailability> {
    from.iter_days()
        .take(days as usize)
        .map(|date| derive_day(date, schedules, reservations, offset))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Customer, ReservationStatus};
    use uuid::Uuid;

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    // 2030-01-07 is a Monday
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()
    }

    fn schedule(day: DayOfWeek, start: &str, end: &str) -> Schedule {
        Schedule::new(Uuid::new_v4(), day, t(start), t(end)).unwrap()
    }

    fn reservation_at(date: NaiveDate, start: &str, hours: i64, offset: FixedOffset) -> Reservation {
        let start = local_to_utc(t(start).on(date), offset);
        Reservation {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            field_id: Uuid::new_v4(),
            start_time: start,
            end_time: start + Duration::hours(hours),
            amount: 0,
            status: ReservationStatus::Confirmed,
            customer: Customer::User { user_id: Uuid::new_v4() },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn utc() -> FixedOffset {
        utc_offset(0).unwrap()
    }

    #[test]
    fn test_two_hour_window_yields_two_slots() {
        let slots = hourly_slots(&schedule(DayOfWeek::Monday, "08:00", "10:00"));
        assert_eq!(slots, vec![t("08:00"), t("09:00")]);
    }

    #[test]
    fn test_partial_trailing_hour_is_offered() {
        let slots = hourly_slots(&schedule(DayOfWeek::Monday, "08:00", "09:30"));
        assert_eq!(slots, vec![t("08:00"), t("09:00")]);

        let slots = hourly_slots(&schedule(DayOfWeek::Monday, "22:30", "24:00"));
        assert_eq!(slots, vec![t("22:30"), t("23:30")]);
    }

    #[test]
    fn test_no_schedule_for_weekday_means_no_slots() {
        let schedules = vec![schedule(DayOfWeek::Tuesday, "08:00", "12:00")];
        let day = derive_day(monday(), &schedules, &[], utc());
        assert!(day.slots.is_empty());
        assert_eq!(day.day_of_week, DayOfWeek::Monday);
    }

    #[test]
    fn test_reservation_marks_covered_slots() {
        let schedules = vec![schedule(DayOfWeek::Monday, "08:00", "12:00")];
        let reservations = vec![reservation_at(monday(), "09:00", 2, utc())];

        let day = derive_day(monday(), &schedules, &reservations, utc());
        let occupied: Vec<bool> = day.slots.iter().map(|s| s.occupied).collect();
        assert_eq!(occupied, vec![false, true, true, false]);
        assert_eq!(day.free_count(), 2);
    }

    #[test]
    fn test_reservation_end_is_exclusive() {
        let schedules = vec![schedule(DayOfWeek::Monday, "08:00", "10:00")];
        let reservations = vec![reservation_at(monday(), "07:00", 1, utc())];

        let day = derive_day(monday(), &schedules, &reservations, utc());
        assert!(day.slots.iter().all(|s| !s.occupied));
    }

    #[test]
    fn test_reservation_on_other_day_does_not_occupy() {
        let schedules = vec![schedule(DayOfWeek::Monday, "08:00", "10:00")];
        let next_week = monday() + Duration::days(7);
        let reservations = vec![reservation_at(next_week, "08:00", 1, utc())];

        let day = derive_day(monday(), &schedules, &reservations, utc());
        assert_eq!(day.free_count(), 2);
    }

    #[test]
    fn test_cancelled_reservation_frees_slot() {
        let schedules = vec![schedule(DayOfWeek::Monday, "08:00", "10:00")];
        let mut cancelled = reservation_at(monday(), "08:00", 1, utc());
        cancelled.status = ReservationStatus::Cancelled;

        let day = derive_day(monday(), &schedules, &[cancelled], utc());
        assert_eq!(day.free_count(), 2);
    }

    #[test]
    fn test_offset_is_applied() {
        // UTC+02:00: a booking at 06:00Z is 08:00 local
        let plus_two = utc_offset(120).unwrap();
        let schedules = vec![schedule(DayOfWeek::Monday, "08:00", "10:00")];
        let start = monday().and_hms_opt(6, 0, 0).unwrap().and_utc();
        let mut r = reservation_at(monday(), "00:00", 1, utc());
        r.start_time = start;
        r.end_time = start + Duration::hours(1);

        let day = derive_day(monday(), &schedules, &[r], plus_two);
        assert!(day.slots[0].occupied);
        assert!(!day.slots[1].occupied);

        let (from, to) = day_window(monday(), plus_two).unwrap();
        assert_eq!(from, NaiveDate::from_ymd_opt(2030, 1, 6).unwrap().and_hms_opt(22, 0, 0).unwrap().and_utc());
        assert_eq!(to - from, Duration::days(1));
    }

    #[test]
    fn test_occupied_keys_are_date_slot() {
        let keys = vec![SlotKey::new(monday(), t("08:00")), SlotKey::new(monday(), t("09:00"))];
        let reservations = vec![reservation_at(monday(), "08:00", 1, utc())];
        let occupied = OccupiedSlots::compute(&keys, &reservations, utc());
        assert_eq!(occupied.keys(), vec!["2030-01-07-08:00".to_string()]);
        assert!(occupied.contains(monday(), t("08:00")));
        assert!(!occupied.contains(monday(), t("09:00")));
    }

    #[test]
    fn test_derive_range_walks_days() {
        let schedules = vec![
            schedule(DayOfWeek::Monday, "08:00", "10:00"),
            schedule(DayOfWeek::Wednesday, "18:00", "21:00"),
        ];
        let days = derive_range(monday(), 3, &schedules, &[], utc());
        assert_eq!(days.len(), 3);
        assert_eq!(days[0].slots.len(), 2);
        assert_eq!(days[1].slots.len(), 0);
        assert_eq!(days[2].slots.len(), 3);

        let (from, to) = multi_day_window(monday(), 3, utc()).unwrap();
        assert_eq!(to - from, Duration::days(3));
    }

    #[test]
    fn test_windows_reject_dates_past_the_calendar() {
        let last = NaiveDate::from_ymd_opt(MAX_YEAR, 12, 31).unwrap();
        let (from, to) = day_window(last, utc_offset(-600).unwrap()).unwrap();
        assert_eq!(to - from, Duration::days(1));

        assert_eq!(day_window(NaiveDate::MAX, utc()), Err(BookingError::DateOutOfRange(NaiveDate::MAX)));
        assert!(matches!(multi_day_window(last, 2, utc()), Err(BookingError::DateOutOfRange(_))));
        assert!(matches!(multi_day_window(NaiveDate::MIN, 7, utc()), Err(BookingError::DateOutOfRange(_))));
        assert!(multi_day_window(monday(), u32::MAX, utc()).is_err());
    }
}
