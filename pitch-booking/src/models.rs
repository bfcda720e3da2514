use chrono::{DateTime, Utc};
use pitch_shared::pii::Masked;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::booking::BookingPlan;
use crate::BookingError;

/// Reservation status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Cancelled => "CANCELLED",
            ReservationStatus::Completed => "COMPLETED",
            ReservationStatus::NoShow => "NO_SHOW",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Cancelled | ReservationStatus::Completed | ReservationStatus::NoShow
        )
    }

    /// Cancelled reservations free their slots.
    pub fn occupies_slot(&self) -> bool {
        *self != ReservationStatus::Cancelled
    }

    /// Pending → Confirmed | Cancelled; Confirmed → Completed | NoShow | Cancelled.
    pub fn can_transition_to(&self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Completed) | (Confirmed, NoShow) | (Confirmed, Cancelled)
        )
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(ReservationStatus::Pending),
            "CONFIRMED" => Ok(ReservationStatus::Confirmed),
            "CANCELLED" => Ok(ReservationStatus::Cancelled),
            "COMPLETED" => Ok(ReservationStatus::Completed),
            "NO_SHOW" => Ok(ReservationStatus::NoShow),
            _ => Err(BookingError::InvalidStatus(s.to_string())),
        }
    }
}

/// Contact details for customers booking without an account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuestContact {
    pub name: String,
    #[serde(default)]
    pub email: Option<Masked<String>>,
    #[serde(default)]
    pub phone: Option<Masked<String>>,
}

impl GuestContact {
    pub fn validate(&self) -> Result<(), BookingError> {
        if self.name.trim().is_empty() {
            return Err(BookingError::MissingContact("guest name is required".to_string()));
        }
        let has_email = self.email.as_ref().is_some_and(|e| e.expose().contains('@'));
        let has_phone = self
            .phone
            .as_ref()
            .is_some_and(|p| p.expose().chars().filter(|c| c.is_ascii_digit()).count() >= 6);
        if !has_email && !has_phone {
            return Err(BookingError::MissingContact("guest email or phone is required".to_string()));
        }
        Ok(())
    }
}

/// Who a reservation is for: a registered user or a guest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Customer {
    User { user_id: Uuid },
    Guest(GuestContact),
}

impl Customer {
    pub fn validate(&self) -> Result<(), BookingError> {
        match self {
            Customer::User { .. } => Ok(()),
            Customer::Guest(contact) => contact.validate(),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Customer::User { user_id } => Some(*user_id),
            Customer::Guest(_) => None,
        }
    }

    pub fn guest(&self) -> Option<&GuestContact> {
        match self {
            Customer::User { .. } => None,
            Customer::Guest(contact) => Some(contact),
        }
    }
}

/// A booked interval on a field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reservation {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub field_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub amount: i64,
    pub status: ReservationStatus,
    pub customer: Customer,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(tenant_id: Uuid, plan: &BookingPlan, customer: Customer) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            field_id: plan.field_id,
            start_time: plan.start_time,
            end_time: plan.end_time,
            amount: plan.amount,
            status: ReservationStatus::Pending,
            customer,
            created_at: now,
            updated_at: now,
        }
    }

    /// Half-open overlap test against `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && self.end_time > start
    }

    /// Moves to `next`, returning the previous status.
    pub fn transition(&mut self, next: ReservationStatus) -> Result<ReservationStatus, BookingError> {
        if !self.status.can_transition_to(next) {
            return Err(BookingError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        let previous = self.status;
        self.status = next;
        self.updated_at = Utc::now();
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn reservation() -> Reservation {
        let start = Utc::now();
        Reservation {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            field_id: Uuid::new_v4(),
            start_time: start,
            end_time: start + Duration::hours(1),
            amount: 3000,
            status: ReservationStatus::Pending,
            customer: Customer::User { user_id: Uuid::new_v4() },
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn test_reservation_lifecycle() {
        let mut r = reservation();

        assert_eq!(r.transition(ReservationStatus::Confirmed).unwrap(), ReservationStatus::Pending);
        assert_eq!(r.status, ReservationStatus::Confirmed);

        r.transition(ReservationStatus::Completed).unwrap();
        assert!(r.status.is_terminal());
        assert!(r.updated_at >= r.created_at);
    }

    #[test]
    fn test_invalid_transition() {
        let mut r = reservation();

        // Cannot complete a reservation that was never confirmed
        let result = r.transition(ReservationStatus::Completed);
        assert_eq!(
            result,
            Err(BookingError::InvalidTransition { from: "PENDING".to_string(), to: "COMPLETED".to_string() })
        );

        r.transition(ReservationStatus::Cancelled).unwrap();
        assert!(r.transition(ReservationStatus::Confirmed).is_err());
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(serde_json::to_string(&ReservationStatus::NoShow).unwrap(), "\"NO_SHOW\"");
        assert_eq!("no_show".parse::<ReservationStatus>().unwrap(), ReservationStatus::NoShow);
        assert!(!ReservationStatus::Cancelled.occupies_slot());
        assert!(ReservationStatus::Pending.occupies_slot());
    }

    #[test]
    fn test_guest_contact_validation() {
        let guest = GuestContact { name: "Ana".to_string(), email: None, phone: Some(Masked::new("600 123 456".to_string())) };
        assert!(Customer::Guest(guest).validate().is_ok());

        let guest = GuestContact { name: "Ana".to_string(), email: Some(Masked::new("not-an-email".to_string())), phone: None };
        assert!(matches!(guest.validate(), Err(BookingError::MissingContact(_))));

        let guest = GuestContact { name: " ".to_string(), email: Some(Masked::new("a@b.co".to_string())), phone: None };
        assert!(guest.validate().is_err());
    }

    #[test]
    fn test_customer_serialization() {
        let guest = Customer::Guest(GuestContact {
            name: "Ana".to_string(),
            email: Some(Masked::new("ana@example.com".to_string())),
            phone: None,
        });
        let json = serde_json::to_value(&guest).unwrap();
        assert_eq!(json["kind"], "guest");
        assert_eq!(json["email"], "ana@example.com");
        assert!(!format!("{:?}", guest).contains("ana@example.com"));
    }
}
