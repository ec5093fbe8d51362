use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower::ServiceExt;

use sancharie_api::state::{AppState, AuthConfig, Backends, ThrottlePolicy};
use sancharie_api::{app, cors_layer};
use sancharie_core::memory::{MemoryBookingRepository, MemoryExpiringStore, MemoryUserRepository};
use sancharie_core::mocks::{FakePaymentGateway, RecordingSmsGateway, StaticInventory};
use sancharie_core::otp::{OtpConfig, OtpService};
use sancharie_order::{CheckoutOrchestrator, SessionManager};
use sancharie_shared::{Masked, PhoneNumber};

const PHONE: &str = "9876543210";

struct TestApp {
    router: Router,
    sms: Arc<RecordingSmsGateway>,
    inventory: Arc<StaticInventory>,
    payments: Arc<FakePaymentGateway>,
}

fn test_app_with_throttle(max_requests: u64) -> TestApp {
    let store = Arc::new(MemoryExpiringStore::new());
    let sms = Arc::new(RecordingSmsGateway::new());
    let inventory = StaticInventory::with_sample_layout();
    let payments = Arc::new(FakePaymentGateway::new("test-secret"));
    let bookings = Arc::new(MemoryBookingRepository::new());
    let sessions = Arc::new(Mutex::new(SessionManager::new(Duration::from_secs(1800))));

    let state = AppState {
        users: Arc::new(MemoryUserRepository::new()),
        bookings: bookings.clone(),
        inventory: inventory.clone(),
        otp: Arc::new(OtpService::new(store.clone(), sms.clone(), OtpConfig::default())),
        checkout: Arc::new(CheckoutOrchestrator::new(
            inventory.clone(),
            payments.clone(),
            bookings,
            sessions,
        )),
        counters: store,
        throttle: ThrottlePolicy {
            max_requests,
            window: Duration::from_secs(900),
        },
        auth: AuthConfig {
            secret: Masked::new("integration-secret".to_string()),
            expiration: 3600,
        },
        backends: Backends::default(),
    };

    TestApp {
        router: app(state, cors_layer(&[])),
        sms,
        inventory,
        payments,
    }
}

fn test_app() -> TestApp {
    test_app_with_throttle(10_000)
}

async fn send(app: &TestApp, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Send, verify and complete an OTP login; returns the bearer token.
async fn login(app: &TestApp) -> String {
    let (status, _) = send(app, "POST", "/auth/send-otp", None, Some(json!({ "mobile": PHONE }))).await;
    assert_eq!(status, StatusCode::OK);

    let code = app.sms.last_code(&PhoneNumber::parse(PHONE).unwrap()).unwrap();
    let (status, body) = send(
        app,
        "POST",
        "/auth/verify-otp",
        None,
        Some(json!({ "mobile": PHONE, "otp": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (status, body) = send(app, "POST", "/user/login-complete", None, Some(json!({ "phone": PHONE }))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["token"].as_str().unwrap().to_string()
}

async fn open_session(app: &TestApp) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/bus/sessions",
        None,
        Some(json!({
            "searchToken": "search-token",
            "resultIndex": 1,
            "busName": "Sancharie Express",
            "busType": "A/C Sleeper (2+1)",
            "source": "Bengaluru",
            "destination": "Hyderabad",
            "journeyDate": "2026-11-02"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["session"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_and_unknown_route() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, "GET", "/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_send_otp_rejects_invalid_phone() {
    let app = test_app();
    let (status, body) = send(&app, "POST", "/auth/send-otp", None, Some(json!({ "mobile": "12345" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please enter a valid 10-digit mobile number");
    assert_eq!(app.sms.sent_count(), 0);
}

#[tokio::test]
async fn test_otp_requests_are_throttled() {
    let app = test_app();
    for _ in 0..3 {
        let (status, _) = send(&app, "POST", "/auth/send-otp", None, Some(json!({ "mobile": PHONE }))).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = send(&app, "POST", "/auth/resend-otp", None, Some(json!({ "mobile": PHONE }))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["retryAfter"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn test_login_requires_verified_otp() {
    let app = test_app();
    let (status, _) = send(&app, "POST", "/user/login-complete", None, Some(json!({ "phone": PHONE }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_and_profile() {
    let app = test_app();
    let token = login(&app).await;

    let (status, body) = send(&app, "GET", "/user/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["phone"], PHONE);
    assert_eq!(body["user"]["isProfileComplete"], false);

    let (status, body) = send(
        &app,
        "PUT",
        "/user/profile",
        Some(&token),
        Some(json!({ "name": "Asha Rao", "email": "asha@example.com", "age": 29, "gender": "female" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["user"]["isProfileComplete"], true);

    let (status, _) = send(
        &app,
        "PUT",
        "/user/profile",
        Some(&token),
        Some(json!({ "email": "not-an-email" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "POST", "/user/verify-token", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Asha Rao");
}

#[tokio::test]
async fn test_protected_routes_need_valid_token() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/user/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Access token required");

    let (status, _) = send(&app, "GET", "/user/profile", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_search_returns_buses() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/bus/search",
        None,
        Some(json!({ "originId": "230", "destinationId": "9573", "date": "2026-11-02" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["searchToken"], "search-token");
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn test_seat_selection_and_fare() {
    let app = test_app();
    let id = open_session(&app).await;

    let uri = format!("/bus/sessions/{}/seats/toggle", id);
    let (_, body) = send(&app, "POST", &uri, None, Some(json!({ "seat": "L1" }))).await;
    assert_eq!(body["toggle"]["outcome"], "selected");
    send(&app, "POST", &uri, None, Some(json!({ "seat": "L3" }))).await;

    let (status, body) = send(&app, "POST", &uri, None, Some(json!({ "seat": "L4" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["toggle"]["outcome"], "ignored");
    assert_eq!(body["session"]["selectedSeats"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "GET", &format!("/bus/sessions/{}/fare", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fare"]["total"].as_f64().unwrap(), 1845.0);

    let (_, body) = send(
        &app,
        "GET",
        &format!("/bus/sessions/{}/seats?availability=available&order=price&descending=true", id),
        None,
        None,
    )
    .await;
    assert_eq!(body["count"], 4);
    assert_eq!(body["seats"][0]["id"], "U1");

    let (_, body) = send(&app, "POST", &format!("/bus/sessions/{}/reload", id), None, None).await;
    assert!(body["session"]["selectedSeats"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_session() {
    let app = test_app();
    let uri = format!("/bus/sessions/{}", uuid::Uuid::new_v4());
    let (status, _) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_booking_gate_and_submission() {
    let app = test_app();
    let token = login(&app).await;
    let id = open_session(&app).await;
    send(
        &app,
        "POST",
        &format!("/bus/sessions/{}/seats/toggle", id),
        None,
        Some(json!({ "seat": "L1" })),
    )
    .await;

    let book_uri = format!("/bus/sessions/{}/book", id);
    let passengers = json!({
        "passengers": [{ "name": "Asha Rao", "age": 29, "gender": "female", "seatName": "L1" }]
    });

    let (status, body) = send(&app, "POST", &book_uri, Some(&token), Some(passengers.clone())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Please select a boarding point");

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/bus/sessions/{}/points", id),
        None,
        Some(json!({ "boardingPointId": "b1", "droppingPointId": "d1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    app.inventory.fail_booking(true);
    let (status, _) = send(&app, "POST", &book_uri, Some(&token), Some(passengers.clone())).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let (_, body) = send(&app, "GET", &format!("/bus/sessions/{}", id), None, None).await;
    assert_eq!(body["session"]["selectedSeats"].as_array().unwrap().len(), 1);

    app.inventory.fail_booking(false);
    let mut forged = passengers.clone();
    forged["payment"] = json!({
        "razorpay_order_id": "order_000001",
        "razorpay_payment_id": "pay_fake",
        "razorpay_signature": "forged"
    });
    let (status, body) = send(&app, "POST", &book_uri, Some(&token), Some(forged)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("Payment verification failed"));
    assert!(app.inventory.submissions().is_empty());

    let mut paid = passengers;
    paid["payment"] = json!({
        "razorpay_order_id": "order_000001",
        "razorpay_payment_id": "pay_321",
        "razorpay_signature": app.payments.sign("order_000001", "pay_321")
    });
    let (status, body) = send(&app, "POST", &book_uri, Some(&token), Some(paid)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let booking_id = body["booking"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["booking"]["status"], "confirmed");
    assert_eq!(body["booking"]["paymentStatus"], "completed");
    assert_eq!(body["booking"]["paymentId"], "pay_321");

    let (_, body) = send(&app, "GET", "/user/bookings", Some(&token), None).await;
    assert_eq!(body["bookings"].as_array().unwrap().len(), 1);

    let cancel_uri = format!("/bus/bookings/{}/cancel", booking_id);
    let (status, body) = send(&app, "POST", &cancel_uri, Some(&token), Some(json!({ "reason": "Plans changed" }))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["booking"]["status"], "cancelled");
    assert_eq!(app.inventory.cancellation_count(), 1);

    let (status, _) = send(&app, "POST", &cancel_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_record_booking_directly() {
    let app = test_app();
    let token = login(&app).await;
    let (status, body) = send(
        &app,
        "POST",
        "/user/bookings",
        Some(&token),
        Some(json!({
            "busName": "Sancharie Express",
            "source": "Bengaluru",
            "destination": "Hyderabad",
            "journeyDate": "2026-11-02",
            "selectedSeats": ["L1"],
            "totalFare": 915
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["booking"]["bookingId"].as_str().unwrap().starts_with("SAN"));

    let id = body["booking"]["id"].as_str().unwrap();
    let (status, body) = send(&app, "GET", &format!("/user/bookings/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["paymentStatus"], "completed");
}

#[tokio::test]
async fn test_payment_flow() {
    let app = test_app();
    let token = login(&app).await;

    let (status, body) = send(&app, "GET", "/payment/config", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["key_id"], "rzp_test_fake");

    let (status, _) = send(&app, "POST", "/payment/create-order", Some(&token), Some(json!({ "amount": 0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/payment/create-order",
        Some(&token),
        Some(json!({ "amount": 1845 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["amount"], 184_500);
    let order_id = body["data"]["order_id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "GET", &format!("/payment/order/{}", order_id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let signature = app.payments.sign(&order_id, "pay_123");
    let (status, body) = send(
        &app,
        "POST",
        "/payment/verify-payment",
        Some(&token),
        Some(json!({
            "razorpay_order_id": order_id,
            "razorpay_payment_id": "pay_123",
            "razorpay_signature": signature
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], true);
    assert_eq!(body["data"]["method"], "upi");

    let (status, body) = send(
        &app,
        "POST",
        "/payment/verify-payment",
        Some(&token),
        Some(json!({
            "razorpay_order_id": order_id,
            "razorpay_payment_id": "pay_124",
            "razorpay_signature": signature
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["outcome"], "failed");

    let (status, _) = send(
        &app,
        "POST",
        "/payment/verify-payment",
        Some(&token),
        Some(json!({ "razorpay_order_id": "ord_1", "razorpay_payment_id": "pay_1", "razorpay_signature": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/payment/verify-payment",
        Some(&token),
        Some(json!({ "razorpay_order_id": order_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "cancelled");
}

#[tokio::test]
async fn test_global_throttle() {
    let app = test_app_with_throttle(2);
    for _ in 0..2 {
        let (status, _) = send(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], false);
}
