use std::sync::Arc;
use pitch_core::repository::{
    FieldRepository, ReservationRepository, RoleRepository, TenantRepository, UserRepository,
};
use pitch_store::app_config::BookingRules;
use pitch_store::{
    DbClient, EventProducer, MemoryStore, RedisClient, StoreFieldRepository, StoreIdentityRepository,
    StoreReservationRepository, StoreTenantRepository,
};

const EVENT_CHANNEL_CAPACITY: usize = 100;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub tenants: Arc<dyn TenantRepository>,
    pub users: Arc<dyn UserRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub fields: Arc<dyn FieldRepository>,
    pub reservations: Arc<dyn ReservationRepository>,
    /// Rate limiting and slot holds are skipped without Redis.
    pub redis: Option<Arc<RedisClient>>,
    pub events: Arc<EventProducer>,
    pub auth: AuthConfig,
    pub booking_rules: BookingRules,
}

impl AppState {
    pub fn postgres(db: &DbClient, redis: Option<Arc<RedisClient>>, auth: AuthConfig, booking_rules: BookingRules) -> Self {
        let identity = Arc::new(StoreIdentityRepository::new(db.pool.clone()));
        Self {
            tenants: Arc::new(StoreTenantRepository::new(db.pool.clone())),
            users: identity.clone(),
            roles: identity,
            fields: Arc::new(StoreFieldRepository::new(db.pool.clone())),
            reservations: Arc::new(StoreReservationRepository::new(db.pool.clone())),
            events: Arc::new(EventProducer::new(EVENT_CHANNEL_CAPACITY, redis.clone())),
            redis,
            auth,
            booking_rules,
        }
    }

    pub fn in_memory(redis: Option<Arc<RedisClient>>, auth: AuthConfig, booking_rules: BookingRules) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            tenants: store.clone(),
            users: store.clone(),
            roles: store.clone(),
            fields: store.clone(),
            reservations: store,
            events: Arc::new(EventProducer::new(EVENT_CHANNEL_CAPACITY, redis.clone())),
            redis,
            auth,
            booking_rules,
        }
    }
}
