use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }

    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Paid) | (Pending, Failed) | (Failed, Pending) | (Failed, Paid) | (Paid, Refunded)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            "FAILED" => Ok(PaymentStatus::Failed),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            _ => Err(CoreError::ValidationError(format!("unknown payment status {}", s))),
        }
    }
}

/// Money collected (or owed) for one reservation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payment {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub amount: i64,
    pub status: PaymentStatus,
    pub method: Option<String>,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn pending(reservation_id: Uuid, amount: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            reservation_id,
            amount,
            status: PaymentStatus::Pending,
            method: None,
            reference: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Records a status change from the dashboard. Re-applying the current
    /// status only refreshes method/reference.
    pub fn record(&mut self, status: PaymentStatus, method: Option<String>, reference: Option<String>) -> CoreResult<()> {
        if status != self.status && !self.status.can_transition_to(status) {
            return Err(CoreError::InvalidPaymentTransition {
                from: self.status.to_string(),
                to: status.to_string(),
            });
        }
        self.status = status;
        if method.is_some() {
            self.method = method;
        }
        if reference.is_some() {
            self.reference = reference;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_flow() {
        let mut payment = Payment::pending(Uuid::new_v4(), 7000);
        assert_eq!(payment.status, PaymentStatus::Pending);

        payment.record(PaymentStatus::Paid, Some("cash".to_string()), None).unwrap();
        assert_eq!(payment.status, PaymentStatus::Paid);
        assert_eq!(payment.method.as_deref(), Some("cash"));

        payment.record(PaymentStatus::Paid, None, Some("R-1".to_string())).unwrap();
        assert_eq!(payment.method.as_deref(), Some("cash"));
        assert_eq!(payment.reference.as_deref(), Some("R-1"));

        payment.record(PaymentStatus::Refunded, None, None).unwrap();
        assert!(payment.record(PaymentStatus::Paid, None, None).is_err());
    }

    #[test]
    fn test_failed_payment_can_be_retried() {
        let mut payment = Payment::pending(Uuid::new_v4(), 100);
        payment.record(PaymentStatus::Failed, None, None).unwrap();
        payment.record(PaymentStatus::Paid, None, None).unwrap();
        assert!(matches!(
            payment.record(PaymentStatus::Pending, None, None),
            Err(CoreError::InvalidPaymentTransition { .. })
        ));
    }
}
