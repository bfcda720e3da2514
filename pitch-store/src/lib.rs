pub mod app_config;
pub mod database;
pub mod redis_repo;
pub mod events;
pub mod tenant_repo;
pub mod identity_repo;
pub mod catalog_repo;
pub mod reservation_repo;
pub mod memory;

pub use database::DbClient;
pub use redis_repo::RedisClient;
pub use events::EventProducer;
pub use memory::MemoryStore;
pub use tenant_repo::StoreTenantRepository;
pub use identity_repo::StoreIdentityRepository;
pub use catalog_repo::StoreFieldRepository;
pub use reservation_repo::StoreReservationRepository;
