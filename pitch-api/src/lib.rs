use axum::{
    extract::State,
    http::Method,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod admin_reservations;
pub mod auth;
pub mod error;
pub mod fields;
pub mod middleware;
pub mod reservations;
pub mod roles;
pub mod state;
pub mod tenants;

pub use state::AppState;

const RATE_LIMIT_WINDOW_SECONDS: i64 = 60;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let dashboard = Router::new()
        .merge(admin::routes())
        .merge(admin_reservations::routes())
        .merge(roles::routes())
        .merge(tenants::admin_routes())
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::admin_auth_middleware,
        ));

    let router = Router::new()
        .route("/health", get(health))
        .merge(auth::routes())
        .merge(tenants::routes())
        .merge(fields::routes())
        .merge(reservations::routes())
        .merge(dashboard)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Client addresses are only known when served with connect info
    let router = if state.redis.is_some() {
        router.layer(axum::middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
    } else {
        router
    };

    router.with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn rate_limit_middleware(
    State(state): State<AppState>,
    axum::extract::ConnectInfo(addr): axum::extract::ConnectInfo<SocketAddr>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<impl IntoResponse, impl IntoResponse> {
    let Some(redis) = &state.redis else {
        return Ok(next.run(req).await);
    };
    let key = format!("ratelimit:{}", addr.ip());

    match redis
        .check_rate_limit(&key, state.booking_rules.rate_limit_per_minute, RATE_LIMIT_WINDOW_SECONDS)
        .await
    {
        Ok(true) => Ok(next.run(req).await),
        Ok(false) => Err((axum::http::StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded")),
        Err(e) => {
            // Fail open
            tracing::warn!("Rate limit check failed: {}", e);
            Ok(next.run(req).await)
        }
    }
}
