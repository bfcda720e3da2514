use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationCreatedEvent {
    pub reservation_id: Uuid,
    pub tenant_id: Uuid,
    pub field_id: Uuid,
    pub start_time: i64,
    pub end_time: i64,
    pub amount: i64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationStatusChangedEvent {
    pub reservation_id: Uuid,
    pub tenant_id: Uuid,
    pub field_id: Uuid,
    pub from: String,
    pub to: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecordedEvent {
    pub payment_id: Uuid,
    pub reservation_id: Uuid,
    pub tenant_id: Uuid,
    pub status: String,
    pub amount: i64,
    pub timestamp: i64,
}

/// Everything the booking service announces to subscribers (SSE, Redis pub/sub).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    ReservationCreated(ReservationCreatedEvent),
    ReservationStatusChanged(ReservationStatusChangedEvent),
    PaymentRecorded(PaymentRecordedEvent),
}

impl DomainEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            DomainEvent::ReservationCreated(_) => "reservations.created",
            DomainEvent::ReservationStatusChanged(_) => "reservations.status_changed",
            DomainEvent::PaymentRecorded(_) => "payments.recorded",
        }
    }

    pub fn tenant_id(&self) -> Uuid {
        match self {
            DomainEvent::ReservationCreated(e) => e.tenant_id,
            DomainEvent::ReservationStatusChanged(e) => e.tenant_id,
            DomainEvent::PaymentRecorded(e) => e.tenant_id,
        }
    }

    /// Events that change slot occupancy carry the field they concern.
    pub fn field_id(&self) -> Option<Uuid> {
        match self {
            DomainEvent::ReservationCreated(e) => Some(e.field_id),
            DomainEvent::ReservationStatusChanged(e) => Some(e.field_id),
            DomainEvent::PaymentRecorded(_) => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::ReservationCreated(_) => "reservation_created",
            DomainEvent::ReservationStatusChanged(_) => "reservation_status_changed",
            DomainEvent::PaymentRecorded(_) => "payment_recorded",
        }
    }
}
