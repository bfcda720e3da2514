use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::CatalogError;

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Wall-clock time as minutes since midnight, written as `"HH:MM"`.
///
/// `24:00` is accepted so that a schedule can close at midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);
    pub const END_OF_DAY: TimeOfDay = TimeOfDay(MINUTES_PER_DAY);

    pub fn from_minutes(minutes: u16) -> Result<Self, CatalogError> {
        if minutes > MINUTES_PER_DAY {
            return Err(CatalogError::InvalidTime(format!("{} minutes", minutes)));
        }
        Ok(Self(minutes))
    }

    pub fn from_hm(hour: u16, minute: u16) -> Result<Self, CatalogError> {
        if minute >= 60 {
            return Err(CatalogError::InvalidTime(format!("{:02}:{:02}", hour, minute)));
        }
        Self::from_minutes(hour * 60 + minute)
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }

    /// Returns `None` when the result would pass `24:00`.
    pub fn checked_add_minutes(self, minutes: u16) -> Option<Self> {
        let total = self.0.checked_add(minutes)?;
        (total <= MINUTES_PER_DAY).then_some(Self(total))
    }

    /// Local date-time for this time on `date`. `24:00` rolls over to the next
    /// day, saturating at `NaiveDateTime::MAX` on the last representable date.
    pub fn on(self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(NaiveTime::MIN)
            .checked_add_signed(chrono::Duration::minutes(i64::from(self.0)))
            .unwrap_or(NaiveDateTime::MAX)
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(time: NaiveTime) -> Self {
        Self((time.hour() * 60 + time.minute()) as u16)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CatalogError::InvalidTime(s.to_string());

        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour: u16 = h.parse().map_err(|_| invalid())?;
        let minute: u16 = m.parse().map_err(|_| invalid())?;
        if hour > 24 || (hour == 24 && minute != 0) {
            return Err(invalid());
        }
        Self::from_hm(hour, minute).map_err(|_| invalid())
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format() {
        let t: TimeOfDay = "08:30".parse().unwrap();
        assert_eq!(t.minutes(), 510);
        assert_eq!(t.to_string(), "08:30");

        let t: TimeOfDay = "7:05".parse().unwrap();
        assert_eq!(t.to_string(), "07:05");

        assert_eq!("24:00".parse::<TimeOfDay>().unwrap(), TimeOfDay::END_OF_DAY);
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["", "8", "08:3", "08:60", "25:00", "24:01", "ab:cd", "08-00"] {
            assert!(bad.parse::<TimeOfDay>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_add_and_rollover() {
        let t: TimeOfDay = "23:00".parse().unwrap();
        assert_eq!(t.checked_add_minutes(60), Some(TimeOfDay::END_OF_DAY));
        assert_eq!(t.checked_add_minutes(61), None);

        let date = NaiveDate::from_ymd_opt(2030, 1, 7).unwrap();
        let next = NaiveDate::from_ymd_opt(2030, 1, 8).unwrap();
        assert_eq!(TimeOfDay::END_OF_DAY.on(date), next.and_time(NaiveTime::MIN));

        // No day after the last one
        assert_eq!(TimeOfDay::END_OF_DAY.on(NaiveDate::MAX), NaiveDateTime::MAX);
    }

    #[test]
    fn test_serde_uses_hh_mm() {
        let t: TimeOfDay = "18:00".parse().unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"18:00\"");
        let back: TimeOfDay = serde_json::from_str("\"18:00\"").unwrap();
        assert_eq!(back, t);
        assert!(serde_json::from_str::<TimeOfDay>("\"6pm\"").is_err());
    }
}
