use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use pitch_api::{app, state::{AppState, AuthConfig}};
use pitch_store::{app_config::Config, DbClient, RedisClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pitch_api=debug,pitch_store=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Pitch API on port {}", config.server.port);

    // Redis Connection (optional)
    let redis = match &config.redis {
        Some(redis_config) => {
            let client = RedisClient::new(&redis_config.url)
                .await
                .context("Failed to connect to Redis")?;
            Some(Arc::new(client))
        }
        None => {
            tracing::warn!("No Redis configured; rate limiting and slot holds are disabled");
            None
        }
    };

    let auth = AuthConfig {
        secret: config.auth.jwt_secret.clone(),
        expiration: config.auth.jwt_expiration_seconds,
    };

    let app_state = if config.database.url.is_empty() {
        tracing::warn!("No database configured; using the in-memory store");
        AppState::in_memory(redis, auth, config.booking.clone())
    } else {
        let db = DbClient::new(&config.database.url, config.database.max_connections)
            .await
            .context("Failed to connect to Postgres")?;
        if config.database.run_migrations {
            db.migrate().await.context("Failed to run migrations")?;
        }
        AppState::postgres(&db, redis, auth, config.booking.clone())
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>()
    ).await?;

    Ok(())
}
