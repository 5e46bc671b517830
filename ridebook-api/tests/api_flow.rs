use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use ridebook_api::{app, AppState};
use ridebook_catalog::{PricingConfig, VehicleRateRecord};
use ridebook_infra::{InMemoryBookingStore, LogNotifier, SandboxProcessor, StaticCatalog, WebhookVerifier};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "whsec_test";

fn fleet() -> Vec<VehicleRateRecord> {
    vec![VehicleRateRecord {
        vehicle_id: "toyota-alphard".to_string(),
        name: "Toyota Alphard".to_string(),
        airport_transfer_price: Some(8000),
        trip_price: Some(6500),
        six_hour_price: Some(30000),
        twelve_hour_price: Some(55000),
        per_hour_rate: Some(5500),
    }]
}

fn setup() -> (Router, SandboxProcessor) {
    let sandbox = SandboxProcessor::new("http://localhost:3000/sandbox/checkout", SECRET);
    let state = AppState::new(
        Arc::new(StaticCatalog::new(fleet())),
        Arc::new(InMemoryBookingStore::new()),
        Arc::new(sandbox.clone()),
        Arc::new(LogNotifier),
        PricingConfig::default(),
        WebhookVerifier::new(SECRET, 300),
        30,
    );
    (app(state), sandbox)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    read(app.clone().oneshot(req).await.unwrap()).await
}

async fn webhook(app: &Router, body: Vec<u8>, signature: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/v1/webhooks/payments")
        .header("content-type", "application/json")
        .header("Stripe-Signature", signature)
        .body(Body::from(body))
        .unwrap();
    read(app.clone().oneshot(req).await.unwrap()).await
}

async fn read(resp: axum::response::Response) -> (StatusCode, Value) {
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn airport_trip() -> Value {
    json!({
        "trip_type": "ONE_WAY",
        "pickup_location": "Changi Airport Terminal 3",
        "dropoff_location": "1 Raffles Place",
        "pickup_date": "2026-05-02",
        "pickup_time": "14:00:00"
    })
}

fn customer() -> Value {
    json!({ "name": "Jane Tan", "email": "jane.tan@example.com", "phone": "+65 9123 4567" })
}

async fn quote_and_book(app: &Router) -> String {
    let (status, quote) = call(
        app,
        "POST",
        "/v1/quotes",
        Some(json!({ "vehicle_id": "toyota-alphard", "trip": airport_trip() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, created) = call(
        app,
        "POST",
        "/v1/bookings",
        Some(json!({
            "vehicle_id": "toyota-alphard",
            "customer": customer(),
            "trip": airport_trip(),
            "quote": quote["quote"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    created["booking_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = setup();
    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_quote_airport_transfer() {
    let (app, _) = setup();
    let (status, body) = call(
        &app,
        "POST",
        "/v1/quotes",
        Some(json!({ "vehicle_id": "toyota-alphard", "trip": airport_trip() })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vehicle_name"], "Toyota Alphard");
    assert_eq!(body["quote"]["category"], "AIRPORT_TRANSFER");
    assert_eq!(body["quote"]["total"], 8000);
    assert_eq!(body["quote"]["midnight_surcharge"], 0);
}

#[tokio::test]
async fn test_unknown_vehicle_is_404() {
    let (app, _) = setup();
    let (status, _) = call(
        &app,
        "POST",
        "/v1/quotes",
        Some(json!({ "vehicle_id": "bus", "trip": airport_trip() })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_email_names_the_field() {
    let (app, _) = setup();
    let (_, quote) = call(
        &app,
        "POST",
        "/v1/quotes",
        Some(json!({ "vehicle_id": "toyota-alphard", "trip": airport_trip() })),
    )
    .await;

    let (status, body) = call(
        &app,
        "POST",
        "/v1/bookings",
        Some(json!({
            "vehicle_id": "toyota-alphard",
            "customer": { "name": "Jane Tan", "email": "not-an-email", "phone": "+65 9123 4567" },
            "trip": airport_trip(),
            "quote": quote["quote"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["field"], "customer.email");
}

#[tokio::test]
async fn test_tampered_quote_is_rejected() {
    let (app, _) = setup();
    let (_, mut quote) = call(
        &app,
        "POST",
        "/v1/quotes",
        Some(json!({ "vehicle_id": "toyota-alphard", "trip": airport_trip() })),
    )
    .await;
    quote["quote"]["total"] = json!(100);

    let (status, body) = call(
        &app,
        "POST",
        "/v1/bookings",
        Some(json!({
            "vehicle_id": "toyota-alphard",
            "customer": customer(),
            "trip": airport_trip(),
            "quote": quote["quote"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["field"], "quote");
}

#[tokio::test]
async fn test_full_payment_flow_via_webhook() {
    let (app, sandbox) = setup();
    let booking_id = quote_and_book(&app).await;

    let (status, _) = call(&app, "GET", &format!("/v1/bookings/{}/receipt", booking_id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, redirect) = call(
        &app,
        "POST",
        &format!("/v1/bookings/{}/payment", booking_id),
        Some(json!({ "policy": "full" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", redirect);
    assert_eq!(redirect["amount"], 8000);
    assert_eq!(redirect["reused"], false);
    let session_ref = redirect["session_ref"].as_str().unwrap().to_string();

    // Asking again hands back the same open session.
    let (_, again) = call(
        &app,
        "POST",
        &format!("/v1/bookings/{}/payment", booking_id),
        Some(json!({ "policy": "full" })),
    )
    .await;
    assert_eq!(again["session_ref"], session_ref.as_str());
    assert_eq!(again["reused"], true);

    sandbox.complete(&session_ref, None).unwrap();
    let (body, signature) = sandbox.signed_event(&session_ref, "checkout.session.completed").unwrap();

    let (status, ack) = webhook(&app, body.clone(), &signature).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["disposition"], "APPLIED");

    let (status, ack) = webhook(&app, body, &signature).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["disposition"], "DUPLICATE");

    let (_, booking) = call(&app, "GET", &format!("/v1/bookings/{}", booking_id), None).await;
    assert_eq!(booking["status"], "CONFIRMED");
    assert_eq!(booking["payment_status"], "PAID");
    assert_eq!(booking["amount_paid"], 8000);

    let (status, receipt) = call(&app, "GET", &format!("/v1/bookings/{}/receipt", booking_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["customer_email"], "j*******@example.com");
    assert_eq!(receipt["payment_method"], "visa 4242");
    assert_eq!(receipt["balance_due"], 0);

    let (status, _) = call(
        &app,
        "POST",
        &format!("/v1/bookings/{}/payment", booking_id),
        Some(json!({ "policy": "full" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_deposit_then_confirm_from_return_page() {
    let (app, sandbox) = setup();
    let booking_id = quote_and_book(&app).await;

    let (status, redirect) = call(
        &app,
        "POST",
        &format!("/v1/bookings/{}/payment", booking_id),
        Some(json!({ "policy": "deposit" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(redirect["amount"], 2400);
    let session_ref = redirect["session_ref"].as_str().unwrap().to_string();

    let (_, pending) = call(&app, "POST", "/v1/payments/confirm", Some(json!({ "booking_id": booking_id }))).await;
    assert_eq!(pending["disposition"], "PENDING");

    sandbox.complete(&session_ref, None).unwrap();
    let (status, confirmed) = call(
        &app,
        "POST",
        "/v1/payments/confirm",
        Some(json!({ "session_ref": session_ref })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["disposition"], "APPLIED");
    assert_eq!(confirmed["payment_status"], "PAID");
    assert_eq!(confirmed["amount_paid"], 2400);

    let (_, receipt) = call(&app, "GET", &format!("/v1/bookings/{}/receipt", booking_id), None).await;
    assert_eq!(receipt["total"], 8000);
    assert_eq!(receipt["balance_due"], 5600);
}

#[tokio::test]
async fn test_confirm_requires_a_target() {
    let (app, _) = setup();
    let (status, body) = call(&app, "POST", "/v1/payments/confirm", Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["field"], "booking_id");
}

#[tokio::test]
async fn test_webhook_rejects_bad_signature() {
    let (app, sandbox) = setup();
    let booking_id = quote_and_book(&app).await;
    let (_, redirect) = call(
        &app,
        "POST",
        &format!("/v1/bookings/{}/payment", booking_id),
        Some(json!({ "policy": "full" })),
    )
    .await;
    let session_ref = redirect["session_ref"].as_str().unwrap().to_string();
    sandbox.complete(&session_ref, None).unwrap();
    let (body, _) = sandbox.signed_event(&session_ref, "checkout.session.completed").unwrap();

    let forged = WebhookVerifier::new("whsec_attacker", 300)
        .header_for(&body, chrono::Utc::now().timestamp())
        .unwrap();
    let (status, _) = webhook(&app, body, &forged).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, booking) = call(&app, "GET", &format!("/v1/bookings/{}", booking_id), None).await;
    assert_eq!(booking["payment_status"], "PENDING");
}

#[tokio::test]
async fn test_expired_event_is_acknowledged_and_ignored() {
    let (app, sandbox) = setup();
    let booking_id = quote_and_book(&app).await;
    let (_, redirect) = call(
        &app,
        "POST",
        &format!("/v1/bookings/{}/payment", booking_id),
        Some(json!({ "policy": "full" })),
    )
    .await;
    let session_ref = redirect["session_ref"].as_str().unwrap().to_string();

    let (body, signature) = sandbox.signed_event(&session_ref, "checkout.session.expired").unwrap();
    let (status, ack) = webhook(&app, body, &signature).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["handled"], false);
}
