use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{CatalogError, TimeOfDay};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "MONDAY",
            DayOfWeek::Tuesday => "TUESDAY",
            DayOfWeek::Wednesday => "WEDNESDAY",
            DayOfWeek::Thursday => "THURSDAY",
            DayOfWeek::Friday => "FRIDAY",
            DayOfWeek::Saturday => "SATURDAY",
            DayOfWeek::Sunday => "SUNDAY",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayOfWeek {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MONDAY" => Ok(DayOfWeek::Monday),
            "TUESDAY" => Ok(DayOfWeek::Tuesday),
            "WEDNESDAY" => Ok(DayOfWeek::Wednesday),
            "THURSDAY" => Ok(DayOfWeek::Thursday),
            "FRIDAY" => Ok(DayOfWeek::Friday),
            "SATURDAY" => Ok(DayOfWeek::Saturday),
            "SUNDAY" => Ok(DayOfWeek::Sunday),
            _ => Err(CatalogError::InvalidDay(s.to_string())),
        }
    }
}

/// Opening window of a field on one weekday
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schedule {
    pub id: Uuid,
    pub field_id: Uuid,
    pub day_of_week: DayOfWeek,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInput {
    pub day_of_week: DayOfWeek,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
}

impl Schedule {
    pub fn new(
        field_id: Uuid,
        day_of_week: DayOfWeek,
        start_time: TimeOfDay,
        end_time: TimeOfDay,
    ) -> Result<Self, CatalogError> {
        if start_time >= end_time {
            return Err(CatalogError::InvalidWindow {
                start: start_time.to_string(),
                end: end_time.to_string(),
            });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            field_id,
            day_of_week,
            start_time,
            end_time,
        })
    }

    /// Parses a stored `"HH:MM"` pair.
    pub fn from_parts(
        id: Uuid,
        field_id: Uuid,
        day_of_week: &str,
        start_time: &str,
        end_time: &str,
    ) -> Result<Self, CatalogError> {
        let mut schedule = Self::new(field_id, day_of_week.parse()?, start_time.parse()?, end_time.parse()?)?;
        schedule.id = id;
        Ok(schedule)
    }

    /// Length of the open window in minutes.
    pub fn open_minutes(&self) -> u16 {
        self.end_time.minutes() - self.start_time.minutes()
    }
}

/// Builds a full weekly set for a field, rejecting repeated days.
pub fn build_week(field_id: Uuid, inputs: Vec<ScheduleInput>) -> Result<Vec<Schedule>, CatalogError> {
    let mut seen = HashSet::new();
    let mut week = Vec::with_capacity(inputs.len());
    for input in inputs {
        if !seen.insert(input.day_of_week) {
            return Err(CatalogError::DuplicateDay(input.day_of_week.to_string()));
        }
        week.push(Schedule::new(field_id, input.day_of_week, input.start_time, input.end_time)?);
    }
    week.sort_by_key(|s| s.day_of_week);
    Ok(week)
}
