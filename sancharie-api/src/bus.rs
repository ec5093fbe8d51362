use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use sancharie_core::inventory::{BusSearchQuery, Passenger};
use sancharie_order::{PaymentReport, TripContext};
use sancharie_seating::{GenderPolicy, SeatFilter, SeatOrder};

use crate::middleware::{user_auth_middleware, UserClaims};
use crate::{error::AppError, state::AppState};

const DEFAULT_CANCEL_REASON: &str = "Cancelled by customer";

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSessionRequest {
    #[serde(flatten)]
    pub trip: TripContext,
    #[serde(default)]
    pub gender_policy: GenderPolicy,
}

#[derive(Debug, Deserialize)]
pub struct ToggleSeatRequest {
    pub seat: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoosePointsRequest {
    #[serde(default)]
    pub boarding_point_id: Option<String>,
    #[serde(default)]
    pub dropping_point_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FareQuery {
    #[serde(default)]
    pub insurance: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct SortQuery {
    #[serde(default)]
    pub order: SeatOrder,
    #[serde(default)]
    pub descending: bool,
}

#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub passengers: Vec<Passenger>,
    /// What the checkout widget returned; settled before the provider call.
    #[serde(default)]
    pub payment: Option<PaymentReport>,
    #[serde(default)]
    pub insurance: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/bus/sessions/{id}/book", post(book))
        .route("/bus/bookings/{id}/cancel", post(cancel_booking))
        .route_layer(middleware::from_fn_with_state(state, user_auth_middleware));

    Router::new()
        .route("/bus/search", post(search))
        .route("/bus/sessions", post(open_session))
        .route("/bus/sessions/{id}", get(get_session))
        .route("/bus/sessions/{id}/reload", post(reload_layout))
        .route("/bus/sessions/{id}/seats", get(list_seats))
        .route("/bus/sessions/{id}/seats/toggle", post(toggle_seat))
        .route("/bus/sessions/{id}/seats/clear", post(clear_selection))
        .route("/bus/sessions/{id}/points", put(choose_points))
        .route("/bus/sessions/{id}/fare", get(fare))
        .merge(protected)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /bus/search
async fn search(State(state): State<AppState>, Json(query): Json<BusSearchQuery>) -> Result<Json<Value>, AppError> {
    let results = state.inventory.search_buses(&query).await?;
    tracing::info!(
        origin = %query.origin_id,
        destination = %query.destination_id,
        date = %query.date,
        count = results.buses.len(),
        "Bus search"
    );
    Ok(Json(json!({
        "success": true,
        "searchToken": results.search_token,
        "count": results.buses.len(),
        "buses": results.buses,
    })))
}

/// POST /bus/sessions
/// Opens a booking session for one bus and loads its layout and stops.
async fn open_session(
    State(state): State<AppState>,
    Json(req): Json<OpenSessionRequest>,
) -> Result<Json<Value>, AppError> {
    let view = state.checkout.open_session(req.trip, req.gender_policy).await?;
    Ok(Json(json!({ "success": true, "session": view })))
}

/// GET /bus/sessions/{id}
async fn get_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Value>, AppError> {
    let view = state.checkout.view(id).await?;
    Ok(Json(json!({ "success": true, "session": view })))
}

/// POST /bus/sessions/{id}/reload
async fn reload_layout(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Value>, AppError> {
    let view = state.checkout.reload_layout(id).await?;
    Ok(Json(json!({ "success": true, "session": view })))
}

/// GET /bus/sessions/{id}/seats?availability=available&order=price
async fn list_seats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(filter): Query<SeatFilter>,
    Query(sort): Query<SortQuery>,
) -> Result<Json<Value>, AppError> {
    let seats = state.checkout.seats(id, &filter, sort.order, sort.descending).await?;
    Ok(Json(json!({ "success": true, "count": seats.len(), "seats": seats })))
}

/// POST /bus/sessions/{id}/seats/toggle
/// Stale targets (booked, aisle, unknown) come back as `ignored`.
async fn toggle_seat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ToggleSeatRequest>,
) -> Result<Json<Value>, AppError> {
    let (outcome, view) = state.checkout.toggle_seat(id, &req.seat).await?;
    Ok(Json(json!({ "success": true, "toggle": outcome, "session": view })))
}

/// POST /bus/sessions/{id}/seats/clear
async fn clear_selection(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Value>, AppError> {
    let view = state.checkout.clear_selection(id).await?;
    Ok(Json(json!({ "success": true, "session": view })))
}

/// PUT /bus/sessions/{id}/points
async fn choose_points(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChoosePointsRequest>,
) -> Result<Json<Value>, AppError> {
    let view = state
        .checkout
        .choose_points(id, req.boarding_point_id.as_deref(), req.dropping_point_id.as_deref())
        .await?;
    Ok(Json(json!({ "success": true, "session": view })))
}

/// GET /bus/sessions/{id}/fare?insurance=true
async fn fare(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<FareQuery>,
) -> Result<Json<Value>, AppError> {
    let fare = state.checkout.fare(id, query.insurance).await?;
    Ok(Json(json!({ "success": true, "fare": fare })))
}

/// POST /bus/sessions/{id}/book
async fn book(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(id): Path<Uuid>,
    Json(req): Json<BookRequest>,
) -> Result<Json<Value>, AppError> {
    let booking = state
        .checkout
        .submit_booking(id, &claims.booking_user(), req.passengers, req.payment, req.insurance)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Booking confirmed",
        "booking": booking,
    })))
}

/// POST /bus/bookings/{id}/cancel
async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(id): Path<Uuid>,
    body: Option<Json<CancelRequest>>,
) -> Result<Json<Value>, AppError> {
    let reason = body
        .and_then(|Json(req)| req.reason)
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_string());
    let booking = state.checkout.cancel_booking(claims.sub, id, &reason).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Booking cancelled",
        "booking": booking,
    })))
}
