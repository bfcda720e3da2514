use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pitch_booking::{Reservation, ReservationStatus};
use pitch_catalog::{DayOfWeek, Field, Schedule, SportType};
use pitch_core::repository::{
    FieldRepository, RepoResult, ReservationFilter, ReservationRepository, RoleRepository, TenantRepository,
    UserRepository,
};
use pitch_core::{Payment, PaymentStatus, RepositoryError, Role, Tenant, TenantSettings, User};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct State {
    tenants: HashMap<Uuid, Tenant>,
    users: HashMap<Uuid, User>,
    roles: HashMap<Uuid, Role>,
    fields: HashMap<Uuid, Field>,
    schedules: HashMap<Uuid, Vec<Schedule>>,
    reservations: HashMap<Uuid, Reservation>,
    // keyed by reservation id
    payments: HashMap<Uuid, Payment>,
}

/// Single-process store used when no database is configured, and by the API tests.
///
/// Every write takes the one lock, so the overlap check in
/// `insert_reservation` and the insert itself cannot interleave.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(what: &str, id: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::NotFound(format!("{} {}", what, id))
}

fn stale(what: &str, id: Uuid) -> RepositoryError {
    RepositoryError::Conflict(format!("{} {} was changed concurrently", what, id))
}

#[async_trait]
impl TenantRepository for MemoryStore {
    async fn create_tenant(&self, tenant: &Tenant) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if state.tenants.values().any(|t| t.slug == tenant.slug) {
            return Err(RepositoryError::Conflict(format!("slug {} is taken", tenant.slug)));
        }
        state.tenants.insert(tenant.id, tenant.clone());
        Ok(())
    }

    async fn register_tenant(&self, tenant: &Tenant, owner: &User) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if state.tenants.values().any(|t| t.slug == tenant.slug) {
            return Err(RepositoryError::Conflict(format!("slug {} is taken", tenant.slug)));
        }
        if owner.tenant_id != tenant.id {
            return Err(RepositoryError::Conflict(format!("owner {} belongs to another tenant", owner.id)));
        }
        if let Some(missing) = owner.role_ids.iter().find(|id| !state.roles.contains_key(*id)) {
            return Err(RepositoryError::Conflict(format!("unknown role {}", missing)));
        }
        state.tenants.insert(tenant.id, tenant.clone());
        state.users.insert(owner.id, owner.clone());
        Ok(())
    }

    async fn get_tenant(&self, id: Uuid) -> RepoResult<Option<Tenant>> {
        Ok(self.state.read().await.tenants.get(&id).cloned())
    }

    async fn get_tenant_by_slug(&self, slug: &str) -> RepoResult<Option<Tenant>> {
        Ok(self.state.read().await.tenants.values().find(|t| t.slug == slug).cloned())
    }

    async fn update_settings(&self, id: Uuid, settings: &TenantSettings) -> RepoResult<()> {
        let mut state = self.state.write().await;
        let tenant = state.tenants.get_mut(&id).ok_or_else(|| not_found("tenant", id))?;
        tenant.settings = settings.clone();
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: &User) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if !state.tenants.contains_key(&user.tenant_id) {
            return Err(RepositoryError::Conflict(format!("unknown tenant {}", user.tenant_id)));
        }
        if state.users.values().any(|u| u.tenant_id == user.tenant_id && u.email == user.email) {
            return Err(RepositoryError::Conflict(format!("email {} is taken", user.email)));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, tenant_id: Uuid, email: &str) -> RepoResult<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.tenant_id == tenant_id && u.email == email)
            .cloned())
    }

    async fn list_users(&self, tenant_id: Uuid) -> RepoResult<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().filter(|u| u.tenant_id == tenant_id).cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn set_user_roles(&self, user_id: Uuid, role_ids: &[Uuid]) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if let Some(missing) = role_ids.iter().find(|id| !state.roles.contains_key(*id)) {
            return Err(RepositoryError::Conflict(format!("unknown role {}", missing)));
        }
        let user = state.users.get_mut(&user_id).ok_or_else(|| not_found("user", user_id))?;
        let mut ids = role_ids.to_vec();
        ids.sort();
        ids.dedup();
        user.role_ids = ids;
        Ok(())
    }
}

#[async_trait]
impl RoleRepository for MemoryStore {
    async fn create_role(&self, role: &Role) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if state.roles.values().any(|r| r.tenant_id == role.tenant_id && r.name == role.name) {
            return Err(RepositoryError::Conflict(format!("role {} already exists", role.name)));
        }
        state.roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn get_role(&self, id: Uuid) -> RepoResult<Option<Role>> {
        Ok(self.state.read().await.roles.get(&id).cloned())
    }

    async fn list_roles(&self, tenant_id: Uuid) -> RepoResult<Vec<Role>> {
        let state = self.state.read().await;
        let mut roles: Vec<Role> = state.roles.values().filter(|r| r.tenant_id == tenant_id).cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn update_role(&self, role: &Role) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if state
            .roles
            .values()
            .any(|r| r.id != role.id && r.tenant_id == role.tenant_id && r.name == role.name)
        {
            return Err(RepositoryError::Conflict(format!("role {} already exists", role.name)));
        }
        let slot = state.roles.get_mut(&role.id).ok_or_else(|| not_found("role", role.id))?;
        *slot = role.clone();
        Ok(())
    }

    async fn delete_role(&self, id: Uuid) -> RepoResult<()> {
        let mut state = self.state.write().await;
        state.roles.remove(&id).ok_or_else(|| not_found("role", id))?;
        for user in state.users.values_mut() {
            user.role_ids.retain(|r| *r != id);
        }
        Ok(())
    }
}

#[async_trait]
impl FieldRepository for MemoryStore {
    async fn create_field(&self, field: &Field) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if !state.tenants.contains_key(&field.tenant_id) {
            return Err(RepositoryError::Conflict(format!("unknown tenant {}", field.tenant_id)));
        }
        state.fields.insert(field.id, field.clone());
        Ok(())
    }

    async fn get_field(&self, id: Uuid) -> RepoResult<Option<Field>> {
        Ok(self.state.read().await.fields.get(&id).cloned())
    }

    async fn list_fields(&self, tenant_id: Uuid, sport_type: Option<SportType>) -> RepoResult<Vec<Field>> {
        let state = self.state.read().await;
        let mut fields: Vec<Field> = state
            .fields
            .values()
            .filter(|f| f.tenant_id == tenant_id && sport_type.map_or(true, |s| f.sport_type == s))
            .cloned()
            .collect();
        fields.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(fields)
    }

    async fn update_field(&self, field: &Field) -> RepoResult<()> {
        let mut state = self.state.write().await;
        let slot = state.fields.get_mut(&field.id).ok_or_else(|| not_found("field", field.id))?;
        *slot = field.clone();
        Ok(())
    }

    async fn delete_field(&self, id: Uuid) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if !state.fields.contains_key(&id) {
            return Err(not_found("field", id));
        }
        let live = state
            .reservations
            .values()
            .filter(|r| r.field_id == id && !r.status.is_terminal())
            .count();
        if live > 0 {
            return Err(RepositoryError::Conflict(format!("field {} has {} live reservations", id, live)));
        }

        state.fields.remove(&id);
        state.schedules.remove(&id);
        let dropped: Vec<Uuid> = state.reservations.values().filter(|r| r.field_id == id).map(|r| r.id).collect();
        for reservation_id in dropped {
            state.reservations.remove(&reservation_id);
            state.payments.remove(&reservation_id);
        }
        Ok(())
    }

    async fn list_schedules(&self, field_id: Uuid) -> RepoResult<Vec<Schedule>> {
        Ok(self.state.read().await.schedules.get(&field_id).cloned().unwrap_or_default())
    }

    async fn replace_schedules(&self, field_id: Uuid, schedules: &[Schedule]) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if !state.fields.contains_key(&field_id) {
            return Err(not_found("field", field_id));
        }
        let mut week = schedules.to_vec();
        week.sort_by_key(|s| s.day_of_week);
        state.schedules.insert(field_id, week);
        Ok(())
    }

    async fn delete_schedule(&self, field_id: Uuid, day: DayOfWeek) -> RepoResult<()> {
        let mut state = self.state.write().await;
        let week = state.schedules.get_mut(&field_id).ok_or_else(|| not_found("field schedules", field_id))?;
        let before = week.len();
        week.retain(|s| s.day_of_week != day);
        if week.len() == before {
            return Err(RepositoryError::NotFound(format!("{} schedule of field {}", day, field_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl ReservationRepository for MemoryStore {
    async fn insert_reservation(&self, reservation: &Reservation, payment: &Payment) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if !state.fields.contains_key(&reservation.field_id) {
            return Err(not_found("field", reservation.field_id));
        }
        let taken = state.reservations.values().any(|r| {
            r.field_id == reservation.field_id
                && r.status.occupies_slot()
                && r.overlaps(reservation.start_time, reservation.end_time)
        });
        if taken {
            return Err(RepositoryError::Conflict("slot already reserved".to_string()));
        }

        state.reservations.insert(reservation.id, reservation.clone());
        state.payments.insert(reservation.id, payment.clone());
        Ok(())
    }

    async fn get_reservation(&self, id: Uuid) -> RepoResult<Option<Reservation>> {
        Ok(self.state.read().await.reservations.get(&id).cloned())
    }

    async fn list_for_field(&self, field_id: Uuid, from: DateTime<Utc>, to: DateTime<Utc>) -> RepoResult<Vec<Reservation>> {
        let state = self.state.read().await;
        let mut found: Vec<Reservation> = state
            .reservations
            .values()
            .filter(|r| r.field_id == field_id && r.overlaps(from, to))
            .cloned()
            .collect();
        found.sort_by_key(|r| r.start_time);
        Ok(found)
    }

    async fn list_reservations(&self, tenant_id: Uuid, filter: &ReservationFilter) -> RepoResult<Vec<Reservation>> {
        let state = self.state.read().await;
        let mut found: Vec<Reservation> = state
            .reservations
            .values()
            .filter(|r| r.tenant_id == tenant_id && filter.matches(r))
            .cloned()
            .collect();
        found.sort_by_key(|r| r.start_time);
        Ok(found)
    }

    async fn update_reservation(&self, reservation: &Reservation, expected: ReservationStatus) -> RepoResult<()> {
        let mut state = self.state.write().await;
        let slot = state
            .reservations
            .get_mut(&reservation.id)
            .ok_or_else(|| not_found("reservation", reservation.id))?;
        if slot.status != expected {
            return Err(stale("reservation", reservation.id));
        }
        slot.status = reservation.status;
        slot.updated_at = reservation.updated_at;
        Ok(())
    }

    async fn get_payment(&self, reservation_id: Uuid) -> RepoResult<Option<Payment>> {
        Ok(self.state.read().await.payments.get(&reservation_id).cloned())
    }

    async fn update_payment(&self, payment: &Payment, expected: PaymentStatus) -> RepoResult<()> {
        let mut state = self.state.write().await;
        let slot = state
            .payments
            .get_mut(&payment.reservation_id)
            .ok_or_else(|| not_found("payment", payment.id))?;
        if slot.status != expected {
            return Err(stale("payment", payment.id));
        }
        *slot = payment.clone();
        Ok(())
    }
}
