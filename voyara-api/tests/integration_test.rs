use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use voyara_api::middleware::auth::CustomerClaims;
use voyara_api::state::AuthConfig;
use voyara_api::{app, AppState};
use voyara_booking::webhook::sign;
use voyara_booking::{BookingLifecycleManager, PaymentIntentCoordinator, PaymentWebhookProcessor};
use voyara_core::flights::OpenFlightLookup;
use voyara_core::notify::LogNotifier;
use voyara_core::passenger::ValidationRules;
use voyara_core::payment::MockPaymentGateway;
use voyara_store::{MemoryBookingStore, MemoryLockManager};

const JWT_SECRET: &str = "test-jwt-secret";
const WEBHOOK_SECRET: &str = "whsec_test";

fn test_app() -> axum::Router {
    let store = Arc::new(MemoryBookingStore::new());
    let lifecycle = Arc::new(BookingLifecycleManager::new(
        store.clone(),
        Arc::new(OpenFlightLookup),
        ValidationRules::default(),
    ));
    let payments = Arc::new(PaymentIntentCoordinator::new(
        store.clone(),
        Arc::new(MockPaymentGateway),
        Arc::new(MemoryLockManager::new()),
        lifecycle.clone(),
        Duration::from_secs(2),
    ));
    let webhooks = Arc::new(PaymentWebhookProcessor::new(
        store,
        lifecycle.clone(),
        Arc::new(LogNotifier),
        WEBHOOK_SECRET.to_string(),
    ));

    app(AppState {
        lifecycle,
        payments,
        webhooks,
        auth: AuthConfig {
            secret: JWT_SECRET.to_string(),
        },
    })
}

fn token_for(customer_id: &str) -> String {
    let claims = CustomerClaims {
        sub: customer_id.to_string(),
        email: format!("{}@example.com", customer_id),
        role: "CUSTOMER".to_string(),
        exp: 4_102_444_800, // 2100-01-01
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

fn booking_request_body() -> Value {
    json!({
        "flight_id": uuid::Uuid::new_v4(),
        "total_amount": "1234.56",
        "currency": "BRL",
        "passengers": [{
            "first_name": "Ana",
            "last_name": "Souza",
            "email": "ana@example.com",
            "phone": "+55 11 91234-5678",
            "document": "123.456.789-09",
            "birth_date": "1990-05-10"
        }]
    })
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create_booking(app: &axum::Router, token: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/v1/bookings",
        Some(token),
        Some(booking_request_body()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

#[tokio::test]
async fn booking_creation_and_retrieval() {
    let app = test_app();
    let token = token_for("customer-a");

    let created = create_booking(&app, &token).await;
    assert_eq!(created["status"], "AWAITING_PAYMENT");
    assert_eq!(created["passengers"].as_array().unwrap().len(), 1);

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = send(
        &app,
        "GET",
        &format!("/v1/bookings/{}", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], created["id"]);
}

#[tokio::test]
async fn requests_without_token_are_unauthorized() {
    let app = test_app();
    let (status, _) = send(&app, "POST", "/v1/bookings", None, Some(booking_request_body())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_passengers_yield_bad_request() {
    let app = test_app();
    let token = token_for("customer-a");

    let mut body = booking_request_body();
    body["passengers"][0]["document"] = json!("111.111.111-11");
    let (status, response) = send(&app, "POST", "/v1/bookings", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"]
        .as_str()
        .unwrap()
        .contains("invalid identity document"));
}

#[tokio::test]
async fn foreign_bookings_read_as_not_found() {
    let app = test_app();
    let owner = token_for("customer-a");
    let stranger = token_for("customer-b");

    let created = create_booking(&app, &owner).await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = send(
        &app,
        "GET",
        &format!("/v1/bookings/{}", id),
        Some(&stranger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/v1/payments/intent",
        Some(&stranger),
        Some(json!({ "booking_id": id })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn payment_intent_is_idempotent_across_requests() {
    let app = test_app();
    let token = token_for("customer-a");
    let created = create_booking(&app, &token).await;
    let id = created["id"].as_str().unwrap();

    let (status, first) = send(
        &app,
        "POST",
        "/v1/payments/intent",
        Some(&token),
        Some(json!({ "booking_id": id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["amount"], "1234.56");
    assert_eq!(first["currency"], "BRL");
    // The mock gateway's secret is "<intent id>_secret_<nonce>".
    let first_intent = first["client_secret"]
        .as_str()
        .unwrap()
        .split("_secret_")
        .next()
        .unwrap()
        .to_string();

    let (status, second) = send(
        &app,
        "POST",
        "/v1/payments/intent",
        Some(&token),
        Some(json!({ "booking_id": id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let second_intent = second["client_secret"]
        .as_str()
        .unwrap()
        .split("_secret_")
        .next()
        .unwrap();
    assert_eq!(second_intent, first_intent);
    assert_eq!(second["amount"], "1234.56");
}

#[tokio::test]
async fn webhook_settles_booking_end_to_end() {
    let app = test_app();
    let token = token_for("customer-a");
    let created = create_booking(&app, &token).await;
    let id = created["id"].as_str().unwrap();

    let (_, intent) = send(
        &app,
        "POST",
        "/v1/payments/intent",
        Some(&token),
        Some(json!({ "booking_id": id })),
    )
    .await;
    // The mock gateway's secret is "<intent id>_secret_<nonce>".
    let secret = intent["client_secret"].as_str().unwrap();
    let intent_id = secret.split("_secret_").next().unwrap();

    let event = json!({
        "id": "evt_1",
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": intent_id, "status": "succeeded" } }
    })
    .to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/v1/webhooks/payment")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-webhook-signature", sign(WEBHOOK_SECRET, event.as_bytes()))
        .body(Body::from(event.clone()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["received"], true);

    let (_, fetched) = send(
        &app,
        "GET",
        &format!("/v1/bookings/{}", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(fetched["status"], "PAID");

    // A paid booking can no longer be cancelled.
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/v1/bookings/{}", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // And a further intent request conflicts.
    let (status, _) = send(
        &app,
        "POST",
        "/v1/payments/intent",
        Some(&token),
        Some(json!({ "booking_id": id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn webhook_with_bad_signature_is_rejected() {
    let app = test_app();
    let event = json!({
        "id": "evt_1",
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": "pi_1", "status": "succeeded" } }
    })
    .to_string();

    let request = Request::builder()
        .method("POST")
        .uri("/v1/webhooks/payment")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-webhook-signature", "deadbeef")
        .body(Body::from(event))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancel_with_reason_via_delete() {
    let app = test_app();
    let token = token_for("customer-a");
    let created = create_booking(&app, &token).await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/v1/bookings/{}", id),
        Some(&token),
        Some(json!({ "reason": "change of plans" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CANCELLED");
    assert!(body["notes"].as_str().unwrap().contains("change of plans"));
}
