use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    pub auth: AuthConfig,
    #[serde(default)]
    pub booking: BookingRules,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BookingRules {
    /// TTL of the Redis hold taken on a slot while its reservation is written
    pub slot_hold_seconds: u64,
    /// Availability window when the caller gives no date
    pub default_window_days: u32,
    pub max_window_days: u32,
    /// Requests per client IP per minute; only enforced with Redis
    pub rate_limit_per_minute: i64,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            slot_hold_seconds: 30,
            default_window_days: 7,
            max_window_days: 31,
            rate_limit_per_minute: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Empty selects the in-memory store.
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `PITCH__SERVER__PORT=8081`
            .add_source(config::Environment::with_prefix("PITCH").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
