use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pitch_booking::{Reservation, ReservationStatus};
use pitch_catalog::{DayOfWeek, Field, Schedule, SportType};
use serde::Deserialize;
use uuid::Uuid;

use crate::identity::{Role, User};
use crate::payment::{Payment, PaymentStatus};
use crate::tenancy::{Tenant, TenantSettings};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Admin reservation listing filter; all conditions are ANDed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationFilter {
    pub field_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub status: Option<ReservationStatus>,
}

impl ReservationFilter {
    pub fn matches(&self, reservation: &Reservation) -> bool {
        self.field_id.map_or(true, |id| reservation.field_id == id)
            && self.from.map_or(true, |from| reservation.end_time > from)
            && self.to.map_or(true, |to| reservation.start_time < to)
            && self.status.map_or(true, |s| reservation.status == s)
    }
}

#[async_trait]
pub trait TenantRepository: Send + Sync {
    /// Fails with `Conflict` when the slug is taken.
    async fn create_tenant(&self, tenant: &Tenant) -> RepoResult<()>;

    /// Inserts the tenant together with its owner account; neither is kept
    /// when either insert fails.
    async fn register_tenant(&self, tenant: &Tenant, owner: &User) -> RepoResult<()>;

    async fn get_tenant(&self, id: Uuid) -> RepoResult<Option<Tenant>>;

    async fn get_tenant_by_slug(&self, slug: &str) -> RepoResult<Option<Tenant>>;

    async fn update_settings(&self, id: Uuid, settings: &TenantSettings) -> RepoResult<()>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is already used in the tenant.
    async fn create_user(&self, user: &User) -> RepoResult<()>;

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;

    async fn find_user_by_email(&self, tenant_id: Uuid, email: &str) -> RepoResult<Option<User>>;

    async fn list_users(&self, tenant_id: Uuid) -> RepoResult<Vec<User>>;

    async fn set_user_roles(&self, user_id: Uuid, role_ids: &[Uuid]) -> RepoResult<()>;
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Fails with `Conflict` when the name is already used in the tenant.
    async fn create_role(&self, role: &Role) -> RepoResult<()>;

    async fn get_role(&self, id: Uuid) -> RepoResult<Option<Role>>;

    async fn list_roles(&self, tenant_id: Uuid) -> RepoResult<Vec<Role>>;

    async fn update_role(&self, role: &Role) -> RepoResult<()>;

    /// Also detaches the role from every user holding it.
    async fn delete_role(&self, id: Uuid) -> RepoResult<()>;
}

#[async_trait]
pub trait FieldRepository: Send + Sync {
    async fn create_field(&self, field: &Field) -> RepoResult<()>;

    async fn get_field(&self, id: Uuid) -> RepoResult<Option<Field>>;

    async fn list_fields(&self, tenant_id: Uuid, sport_type: Option<SportType>) -> RepoResult<Vec<Field>>;

    async fn update_field(&self, field: &Field) -> RepoResult<()>;

    /// Fails with `Conflict` while live reservations reference the field.
    async fn delete_field(&self, id: Uuid) -> RepoResult<()>;

    async fn list_schedules(&self, field_id: Uuid) -> RepoResult<Vec<Schedule>>;

    /// Replaces the whole weekly set atomically.
    async fn replace_schedules(&self, field_id: Uuid, schedules: &[Schedule]) -> RepoResult<()>;

    async fn delete_schedule(&self, field_id: Uuid, day: DayOfWeek) -> RepoResult<()>;
}

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Inserts the reservation with its pending payment. The overlap check
    /// against live reservations of the same field runs in the same critical
    /// section as the insert; an overlap yields `Conflict`.
    async fn insert_reservation(&self, reservation: &Reservation, payment: &Payment) -> RepoResult<()>;

    async fn get_reservation(&self, id: Uuid) -> RepoResult<Option<Reservation>>;

    /// Reservations of a field overlapping `[from, to)`, any status.
    async fn list_for_field(&self, field_id: Uuid, from: DateTime<Utc>, to: DateTime<Utc>) -> RepoResult<Vec<Reservation>>;

    async fn list_reservations(&self, tenant_id: Uuid, filter: &ReservationFilter) -> RepoResult<Vec<Reservation>>;

    /// Writes the new status only if the stored one is still `expected`;
    /// a concurrent change yields `Conflict`.
    async fn update_reservation(&self, reservation: &Reservation, expected: ReservationStatus) -> RepoResult<()>;

    async fn get_payment(&self, reservation_id: Uuid) -> RepoResult<Option<Payment>>;

    /// Same compare-and-set rule as `update_reservation`.
    async fn update_payment(&self, payment: &Payment, expected: PaymentStatus) -> RepoResult<()>;
}
