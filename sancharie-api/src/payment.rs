use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use sancharie_core::payment::{PaymentOutcome, CURRENCY_INR, MAX_ORDER_AMOUNT};
use sancharie_order::PaymentReport;
use sancharie_seating::Amount;

use crate::middleware::user_auth_middleware;
use crate::{error::AppError, state::AppState};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    #[serde(default)]
    pub bus_name: Option<String>,
    #[serde(default)]
    pub travel_date: Option<String>,
    #[serde(default)]
    pub seats: Vec<String>,
    #[serde(default)]
    pub passenger_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Rupees.
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub notes: BTreeMap<String, String>,
    #[serde(default)]
    pub booking_details: Option<BookingDetails>,
}

impl CreateOrderRequest {
    fn validated_amount(&self) -> Result<Amount, AppError> {
        let amount = self
            .amount
            .filter(|a| a.is_finite() && *a > 0.0)
            .and_then(Amount::from_decimal)
            .filter(|a| !a.is_zero())
            .ok_or_else(|| AppError::Validation("Valid amount is required (must be positive number)".to_string()))?;
        if amount > Amount::from_major(MAX_ORDER_AMOUNT) {
            return Err(AppError::Validation("Amount exceeds maximum limit".to_string()));
        }
        Ok(amount)
    }

    fn order_notes(&self) -> BTreeMap<String, String> {
        let mut notes = self.notes.clone();
        if let Some(details) = &self.booking_details {
            notes.insert("bus_name".to_string(), details.bus_name.clone().unwrap_or_default());
            notes.insert("travel_date".to_string(), details.travel_date.clone().unwrap_or_default());
            notes.insert("seats".to_string(), details.seats.join(", "));
            notes.insert(
                "passenger_count".to_string(),
                details.passenger_count.map(|c| c.to_string()).unwrap_or_default(),
            );
        }
        notes
    }
}

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/payment/create-order", post(create_order))
        .route("/payment/verify-payment", post(verify_payment))
        .route("/payment/order/{id}", get(get_order))
        .route_layer(middleware::from_fn_with_state(state, user_auth_middleware));

    Router::new().route("/payment/config", get(payment_config)).merge(protected)
}

fn payments_unconfigured() -> AppError {
    AppError::Unavailable("Payment service not configured".to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /payment/config
/// Public checkout parameters; never the key secret.
async fn payment_config(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let config = state.checkout.payments().public_config();
    if config.key_id.is_empty() {
        return Err(payments_unconfigured());
    }
    Ok(Json(json!({
        "success": true,
        "data": {
            "key_id": config.key_id,
            "currency": config.currency,
            "name": config.name,
            "description": config.description,
        },
    })))
}

/// POST /payment/create-order
async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<Value>, AppError> {
    let amount = req.validated_amount()?;
    if let Some(currency) = req.currency.as_deref() {
        if !currency.eq_ignore_ascii_case(CURRENCY_INR) {
            return Err(AppError::Validation(format!("Unsupported currency: {}", currency)));
        }
    }

    let order = state
        .checkout
        .create_payment_order(amount, req.receipt.clone(), req.order_notes())
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "order_id": order.id,
            "amount": order.amount.minor(),
            "amount_inr": order.amount,
            "currency": order.currency,
            "receipt": order.receipt,
        },
    })))
}

/// POST /payment/verify-payment
/// Settles what the checkout widget reported into one outcome.
async fn verify_payment(
    State(state): State<AppState>,
    Json(report): Json<PaymentReport>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let malformed = report.order_id.as_deref().is_some_and(|id| !id.starts_with("order_"))
        || report.payment_id.as_deref().is_some_and(|id| !id.starts_with("pay_"));
    if malformed {
        return Err(AppError::Validation("Invalid Razorpay ID format".to_string()));
    }

    let (status, body) = match state.checkout.settle_payment(&report).await {
        PaymentOutcome::Verified {
            order_id,
            payment_id,
            status,
            method,
        } => (
            StatusCode::OK,
            json!({
                "success": true,
                "message": "Payment verified successfully",
                "verified": true,
                "outcome": "verified",
                "data": {
                    "order_id": order_id,
                    "payment_id": payment_id,
                    "status": status,
                    "method": method,
                },
            }),
        ),
        PaymentOutcome::Failed { reason } => (
            StatusCode::BAD_REQUEST,
            json!({
                "success": false,
                "message": format!("Payment verification failed. {}", reason),
                "verified": false,
                "outcome": "failed",
            }),
        ),
        PaymentOutcome::Cancelled => (
            StatusCode::OK,
            json!({
                "success": false,
                "message": "Payment cancelled",
                "verified": false,
                "outcome": "cancelled",
            }),
        ),
    };
    Ok((status, Json(body)))
}

/// GET /payment/order/{id}
async fn get_order(State(state): State<AppState>, Path(order_id): Path<String>) -> Result<Json<Value>, AppError> {
    if !order_id.starts_with("order_") {
        return Err(AppError::Validation("Invalid order ID format".to_string()));
    }
    let order = state.checkout.payments().fetch_order(&order_id).await?;
    Ok(Json(json!({ "success": true, "data": order })))
}
