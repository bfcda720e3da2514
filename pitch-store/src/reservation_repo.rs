use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pitch_booking::{Customer, GuestContact, Reservation, ReservationStatus};
use pitch_core::repository::{RepoResult, ReservationFilter, ReservationRepository};
use pitch_core::{Payment, PaymentStatus, RepositoryError};
use pitch_shared::pii::Masked;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::database::{corrupt, db_error};

pub struct StoreReservationRepository {
    pool: PgPool,
}

impl StoreReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Tells a missing row apart from one whose status moved underneath a
    /// compare-and-set update.
    async fn stale_write(&self, table: &str, what: &str, id: Uuid) -> RepositoryError {
        let exists: Result<bool, _> = sqlx::query_scalar(&format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)", table))
            .bind(id)
            .fetch_one(&self.pool)
            .await;

        match exists {
            Ok(true) => {
                warn!(%id, what, "concurrent status change rejected");
                RepositoryError::Conflict(format!("{} {} was changed concurrently", what, id))
            }
            Ok(false) => RepositoryError::NotFound(format!("{} {}", what, id)),
            Err(e) => db_error(e),
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    tenant_id: Uuid,
    field_id: Uuid,
    user_id: Option<Uuid>,
    guest_name: Option<String>,
    guest_email: Option<String>,
    guest_phone: Option<String>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    amount: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = RepositoryError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        let customer = match (row.user_id, row.guest_name) {
            (Some(user_id), _) => Customer::User { user_id },
            (None, Some(name)) => Customer::Guest(GuestContact {
                name,
                email: row.guest_email.map(Masked::new),
                phone: row.guest_phone.map(Masked::new),
            }),
            (None, None) => {
                return Err(RepositoryError::Corrupt(format!("reservation {} has no customer", row.id)))
            }
        };

        Ok(Reservation {
            id: row.id,
            tenant_id: row.tenant_id,
            field_id: row.field_id,
            start_time: row.start_time,
            end_time: row.end_time,
            amount: row.amount,
            status: row.status.parse().map_err(|e| corrupt("reservation status", e))?,
            customer,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    reservation_id: Uuid,
    amount: i64,
    status: String,
    method: Option<String>,
    reference: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = RepositoryError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: row.id,
            reservation_id: row.reservation_id,
            amount: row.amount,
            status: row.status.parse().map_err(|e| corrupt("payment status", e))?,
            method: row.method,
            reference: row.reference,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const RESERVATION_COLUMNS: &str = "id, tenant_id, field_id, user_id, guest_name, guest_email, guest_phone, \
     start_time, end_time, amount, status, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, reservation_id, amount, status, method, reference, created_at, updated_at";

#[async_trait]
impl ReservationRepository for StoreReservationRepository {
    async fn insert_reservation(&self, reservation: &Reservation, payment: &Payment) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Serializes concurrent bookings of the same field
        let field: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM fields WHERE id = $1 FOR UPDATE")
            .bind(reservation.field_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;
        if field.is_none() {
            return Err(RepositoryError::NotFound(format!("field {}", reservation.field_id)));
        }

        let (overlapping,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM reservations
            WHERE field_id = $1 AND status <> 'CANCELLED' AND start_time < $3 AND end_time > $2
            "#,
        )
        .bind(reservation.field_id)
        .bind(reservation.start_time)
        .bind(reservation.end_time)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;
        if overlapping > 0 {
            warn!(field_id = %reservation.field_id, start = %reservation.start_time, "overlapping reservation rejected");
            return Err(RepositoryError::Conflict("slot already reserved".to_string()));
        }

        let guest = reservation.customer.guest();
        sqlx::query(
            r#"
            INSERT INTO reservations (id, tenant_id, field_id, user_id, guest_name, guest_email, guest_phone,
                                      start_time, end_time, amount, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.tenant_id)
        .bind(reservation.field_id)
        .bind(reservation.customer.user_id())
        .bind(guest.map(|g| g.name.clone()))
        .bind(guest.and_then(|g| g.email.as_ref()).map(|e| e.expose().clone()))
        .bind(guest.and_then(|g| g.phone.as_ref()).map(|p| p.expose().clone()))
        .bind(reservation.start_time)
        .bind(reservation.end_time)
        .bind(reservation.amount)
        .bind(reservation.status.as_str())
        .bind(reservation.created_at)
        .bind(reservation.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        sqlx::query(
            r#"
            INSERT INTO payments (id, reservation_id, amount, status, method, reference, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(payment.id)
        .bind(payment.reservation_id)
        .bind(payment.amount)
        .bind(payment.status.as_str())
        .bind(&payment.method)
        .bind(&payment.reference)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        debug!(reservation_id = %reservation.id, "reservation stored");
        Ok(())
    }

    async fn get_reservation(&self, id: Uuid) -> RepoResult<Option<Reservation>> {
        let row: Option<ReservationRow> =
            sqlx::query_as(&format!("SELECT {} FROM reservations WHERE id = $1", RESERVATION_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        row.map(Reservation::try_from).transpose()
    }

    async fn list_for_field(&self, field_id: Uuid, from: DateTime<Utc>, to: DateTime<Utc>) -> RepoResult<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM reservations WHERE field_id = $1 AND start_time < $3 AND end_time > $2 ORDER BY start_time",
            RESERVATION_COLUMNS
        ))
        .bind(field_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(Reservation::try_from).collect()
    }

    async fn list_reservations(&self, tenant_id: Uuid, filter: &ReservationFilter) -> RepoResult<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM reservations
            WHERE tenant_id = $1
              AND ($2::UUID IS NULL OR field_id = $2)
              AND ($3::TIMESTAMPTZ IS NULL OR end_time > $3)
              AND ($4::TIMESTAMPTZ IS NULL OR start_time < $4)
              AND ($5::TEXT IS NULL OR status = $5)
            ORDER BY start_time
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(tenant_id)
        .bind(filter.field_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(Reservation::try_from).collect()
    }

    async fn update_reservation(&self, reservation: &Reservation, expected: ReservationStatus) -> RepoResult<()> {
        let result = sqlx::query("UPDATE reservations SET status = $2, updated_at = $3 WHERE id = $1 AND status = $4")
            .bind(reservation.id)
            .bind(reservation.status.as_str())
            .bind(reservation.updated_at)
            .bind(expected.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(self.stale_write("reservations", "reservation", reservation.id).await);
        }
        Ok(())
    }

    async fn get_payment(&self, reservation_id: Uuid) -> RepoResult<Option<Payment>> {
        let row: Option<PaymentRow> =
            sqlx::query_as(&format!("SELECT {} FROM payments WHERE reservation_id = $1", PAYMENT_COLUMNS))
                .bind(reservation_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        row.map(Payment::try_from).transpose()
    }

    async fn update_payment(&self, payment: &Payment, expected: PaymentStatus) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE payments SET status = $2, method = $3, reference = $4, updated_at = $5 WHERE id = $1 AND status = $6",
        )
        .bind(payment.id)
        .bind(payment.status.as_str())
        .bind(&payment.method)
        .bind(&payment.reference)
        .bind(payment.updated_at)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(self.stale_write("payments", "payment", payment.id).await);
        }
        Ok(())
    }
}
