use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, NaiveDate, Utc};
use pitch_api::{app, state::AuthConfig, AppState};
use pitch_store::app_config::BookingRules;
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app() -> Router {
    let auth = AuthConfig {
        secret: "integration-secret".to_string(),
        expiration: 3600,
    };
    app(AppState::in_memory(None, auth, BookingRules::default()))
}

async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// A date safely in the future; every weekday is open 08:00-12:00 below.
fn booking_date() -> NaiveDate {
    Utc::now().date_naive() + Duration::days(3)
}

struct Seeded {
    owner_token: String,
    field_id: String,
}

async fn seed(app: &Router, slug: &str) -> Seeded {
    let (status, body) = send(
        app,
        "POST",
        "/v1/tenants",
        None,
        Some(json!({
            "name": "Arena Sports",
            "slug": slug,
            "owner_email": "owner@arena.io",
            "owner_name": "Olivia Owner",
            "owner_password": "owner-password"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let owner_token = body["token"].as_str().unwrap().to_string();

    let (status, field) = send(
        app,
        "POST",
        "/v1/admin/fields",
        Some(&owner_token),
        Some(json!({
            "name": "Court 1",
            "sport_type": "FUTSAL",
            "price_per_hour": 3500,
            "night_price_per_hour": 5000,
            "address": "1 Main St",
            "features": ["Lights", "parking", "lights"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", field);
    let field_id = field["id"].as_str().unwrap().to_string();

    let week: Vec<Value> = ["MONDAY", "TUESDAY", "WEDNESDAY", "THURSDAY", "FRIDAY", "SATURDAY", "SUNDAY"]
        .iter()
        .map(|day| json!({ "day_of_week": day, "start_time": "08:00", "end_time": "12:00" }))
        .collect();
    let (status, schedules) = send(
        app,
        "PUT",
        &format!("/v1/admin/fields/{}/schedules", field_id),
        Some(&owner_token),
        Some(Value::Array(week)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", schedules);
    assert_eq!(schedules.as_array().unwrap().len(), 7);

    Seeded { owner_token, field_id }
}

fn guest_booking(field_id: &str, slots: &[&str]) -> Value {
    json!({
        "field_id": field_id,
        "date": booking_date().to_string(),
        "slots": slots,
        "guest": { "name": "Jane Guest", "email": "jane@example.com" }
    })
}

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_public_catalog_and_availability() {
    let app = test_app();
    let seeded = seed(&app, "arena").await;

    let (status, fields) = send(&app, "GET", "/v1/tenants/arena/fields?sport_type=FUTSAL", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fields.as_array().unwrap().len(), 1);
    assert_eq!(fields[0]["features"], json!(["lights", "parking"]));

    let (_, fields) = send(&app, "GET", "/v1/tenants/arena/fields?sport_type=TENNIS", None, None).await;
    assert!(fields.as_array().unwrap().is_empty());

    let (status, detail) = send(&app, "GET", &format!("/v1/fields/{}", seeded.field_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["currency"], "USD");
    assert_eq!(detail["schedules"].as_array().unwrap().len(), 7);

    let uri = format!("/v1/fields/{}/availability?date={}", seeded.field_id, booking_date());
    let (status, availability) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let slots = availability["days"][0]["slots"].as_array().unwrap();
    let starts: Vec<&str> = slots.iter().map(|s| s["start"].as_str().unwrap()).collect();
    assert_eq!(starts, vec!["08:00", "09:00", "10:00", "11:00"]);
    assert!(slots.iter().all(|s| s["occupied"] == false));

    let uri = format!("/v1/fields/{}/availability?from={}&days=5", seeded.field_id, booking_date());
    let (status, range) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(range["days"].as_array().unwrap().len(), 5);

    let uri = format!("/v1/fields/{}/availability?days=40", seeded.field_id);
    let (status, _) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/v1/tenants/nobody/fields", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_quote_uses_day_price_only() {
    let app = test_app();
    let seeded = seed(&app, "arena").await;

    let uri = format!("/v1/fields/{}/quote", seeded.field_id);
    let (status, quote) = send(
        &app,
        "POST",
        &uri,
        None,
        Some(json!({ "date": booking_date().to_string(), "slots": ["10:00", "11:00"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", quote);
    assert_eq!(quote["hours"], 2);
    assert_eq!(quote["total"], 7000);
    assert_eq!(quote["night_price_per_hour"], 5000);
}

#[tokio::test]
async fn test_guest_booking_and_double_booking() {
    let app = test_app();
    let seeded = seed(&app, "arena").await;

    let (status, created) = send(
        &app,
        "POST",
        "/v1/reservations",
        None,
        Some(guest_booking(&seeded.field_id, &["09:00", "10:00"])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["reservation"]["status"], "PENDING");
    assert_eq!(created["reservation"]["amount"], 7000);
    assert_eq!(created["payment"]["status"], "PENDING");
    assert_eq!(created["payment"]["amount"], 7000);
    let reservation_id = created["reservation"]["id"].as_str().unwrap().to_string();

    // Overlaps the second hour
    let (status, _) = send(
        &app,
        "POST",
        "/v1/reservations",
        None,
        Some(guest_booking(&seeded.field_id, &["10:00", "11:00"])),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let uri = format!("/v1/fields/{}/availability?date={}", seeded.field_id, booking_date());
    let (_, availability) = send(&app, "GET", &uri, None, None).await;
    let occupied: Vec<bool> = availability["days"][0]["slots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["occupied"].as_bool().unwrap())
        .collect();
    assert_eq!(occupied, vec![false, true, true, false]);
    assert_eq!(
        availability["occupied"],
        json!([format!("{}-09:00", booking_date()), format!("{}-10:00", booking_date())])
    );

    // Public lookup masks contact details
    let (status, view) = send(&app, "GET", &format!("/v1/reservations/{}", reservation_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["guest_name"], "Jane Guest");
    assert_eq!(view["guest_email"], "j***@example.com");
}

#[tokio::test]
async fn test_invalid_selections_are_rejected() {
    let app = test_app();
    let seeded = seed(&app, "arena").await;
    let book = |slots: &[&str]| guest_booking(&seeded.field_id, slots);

    for body in [book(&["08:00", "10:00"]), book(&["08:00", "09:00", "10:00"]), book(&[]), book(&["12:00"])] {
        let (status, _) = send(&app, "POST", "/v1/reservations", None, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // Neither a user token nor guest contact
    let (status, _) = send(
        &app,
        "POST",
        "/v1/reservations",
        None,
        Some(json!({ "field_id": seeded.field_id, "date": booking_date().to_string(), "slots": ["08:00"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_far_future_dates_are_rejected() {
    let app = test_app();
    let seeded = seed(&app, "arena").await;

    for query in ["date=%2B262142-12-31", "from=%2B262142-12-25&days=7", "from=9999-12-30&days=5"] {
        let uri = format!("/v1/fields/{}/availability?{}", seeded.field_id, query);
        let (status, body) = send(&app, "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}: {}", query, body);
    }

    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/fields/{}/quote", seeded.field_id),
        None,
        Some(json!({ "date": "+262142-12-31", "slots": ["08:00"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut booking = guest_booking(&seeded.field_id, &["08:00"]);
    booking["date"] = json!("+262142-12-31");
    let (status, _) = send(&app, "POST", "/v1/reservations", None, Some(booking)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The last supported day still works
    let uri = format!("/v1/fields/{}/availability?date=9999-12-31", seeded.field_id);
    let (status, body) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["days"][0]["slots"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_status_and_payment_updates() {
    let app = test_app();
    let seeded = seed(&app, "arena").await;

    let (_, created) = send(
        &app,
        "POST",
        "/v1/reservations",
        None,
        Some(guest_booking(&seeded.field_id, &["08:00"])),
    )
    .await;
    let id = created["reservation"]["id"].as_str().unwrap().to_string();
    let token = Some(seeded.owner_token.as_str());

    let (status, listed) = send(&app, "GET", "/v1/admin/reservations?status=PENDING", token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    // Dashboard sees the full contact
    assert_eq!(listed[0]["customer"]["email"], "jane@example.com");

    let status_uri = format!("/v1/admin/reservations/{}/status", id);
    let (status, confirmed) = send(&app, "POST", &status_uri, token, Some(json!({ "status": "CONFIRMED" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "CONFIRMED");

    let (status, _) = send(&app, "POST", &status_uri, token, Some(json!({ "status": "PENDING" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let payment_uri = format!("/v1/admin/reservations/{}/payment", id);
    let (status, paid) = send(
        &app,
        "POST",
        &payment_uri,
        token,
        Some(json!({ "status": "PAID", "method": "cash" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "PAID");
    assert_eq!(paid["method"], "cash");

    let (status, _) = send(&app, "POST", &payment_uri, token, Some(json!({ "status": "FAILED" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cancellation_frees_slot() {
    let app = test_app();
    let seeded = seed(&app, "arena").await;
    let token = Some(seeded.owner_token.as_str());

    let (_, created) = send(&app, "POST", "/v1/reservations", None, Some(guest_booking(&seeded.field_id, &["11:00"]))).await;
    let id = created["reservation"]["id"].as_str().unwrap().to_string();

    let uri = format!("/v1/admin/reservations/{}/status", id);
    let (status, _) = send(&app, "POST", &uri, token, Some(json!({ "status": "CANCELLED" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", "/v1/reservations", None, Some(guest_booking(&seeded.field_id, &["11:00"]))).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_permissions_are_enforced() {
    let app = test_app();
    let seeded = seed(&app, "arena").await;
    let owner = Some(seeded.owner_token.as_str());

    let (status, role) = send(
        &app,
        "POST",
        "/v1/admin/roles",
        owner,
        Some(json!({ "name": "Viewer", "permissions": ["fields:read"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", role);

    let (status, user) = send(
        &app,
        "POST",
        "/v1/admin/users",
        owner,
        Some(json!({
            "email": "viewer@arena.io",
            "name": "Vic Viewer",
            "password": "viewer-password",
            "role_ids": [role["id"]]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", user);
    assert!(user.get("password_hash").is_none());

    let (status, login) = send(
        &app,
        "POST",
        "/v1/auth/login",
        None,
        Some(json!({ "tenant_slug": "arena", "email": "Viewer@Arena.io", "password": "viewer-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let viewer = login["token"].as_str().map(str::to_string);
    let viewer = viewer.as_deref();

    let (status, _) = send(&app, "GET", "/v1/admin/fields", viewer, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        "/v1/admin/fields",
        viewer,
        Some(json!({ "name": "Court 2", "sport_type": "TENNIS", "price_per_hour": 1000 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "GET", "/v1/admin/roles", viewer, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Role edits apply to existing tokens
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/v1/admin/roles/{}", role["id"].as_str().unwrap()),
        owner,
        Some(json!({ "name": "Viewer", "permissions": ["fields:read", "fields:write"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        "POST",
        "/v1/admin/fields",
        viewer,
        Some(json!({ "name": "Court 2", "sport_type": "TENNIS", "price_per_hour": 1000 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_authentication_failures() {
    let app = test_app();
    seed(&app, "arena").await;

    let (status, _) = send(
        &app,
        "POST",
        "/v1/auth/login",
        None,
        Some(json!({ "tenant_slug": "arena", "email": "owner@arena.io", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/v1/admin/fields", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/v1/admin/fields", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Guest tokens cannot reach the dashboard
    let (_, guest) = send(&app, "POST", "/v1/auth/guest", None, None).await;
    let (status, _) = send(&app, "GET", "/v1/admin/fields", guest["token"].as_str(), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_tenants_are_isolated() {
    let app = test_app();
    let arena = seed(&app, "arena").await;

    let (status, other) = send(
        &app,
        "POST",
        "/v1/tenants",
        None,
        Some(json!({
            "name": "Other Club",
            "slug": "other-club",
            "owner_email": "owner@other.io",
            "owner_name": "Otto",
            "owner_password": "other-password"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let other_token = other["token"].as_str();

    let (status, _) = send(&app, "GET", &format!("/v1/admin/fields/{}", arena.field_id), other_token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Slugs are unique
    let (status, _) = send(
        &app,
        "POST",
        "/v1/tenants",
        None,
        Some(json!({
            "name": "Copycat",
            "slug": "arena",
            "owner_email": "cat@copy.io",
            "owner_name": "Cat",
            "owner_password": "copycat-password"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, settings) = send(
        &app,
        "PUT",
        "/v1/admin/tenant/settings",
        Some(&arena.owner_token),
        Some(json!({ "currency": "EUR", "utc_offset_minutes": 60 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", settings);
    assert_eq!(settings["settings"]["currency"], "EUR");
}
