use axum::{
    extract::{Path, State},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use sancharie_core::account::{Gender, ProfileUpdate, User};
use sancharie_core::booking::{Booking, BookingStatus, NewBooking, PassengerRecord, PaymentStatus};
use sancharie_seating::{Amount, StopPoint};

use crate::auth::MobileInput;
use crate::middleware::{issue_token, user_auth_middleware, UserClaims};
use crate::{error::AppError, state::AppState};

/// Bookings returned by the history listing.
const BOOKING_HISTORY_LIMIT: usize = 50;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginCompleteRequest {
    #[serde(alias = "mobile")]
    pub phone: Option<MobileInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub phone: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<u8>,
    pub gender: Option<Gender>,
    pub is_profile_complete: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            phone: user.phone.as_str().to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            age: user.age,
            gender: user.gender,
            is_profile_complete: user.is_profile_complete,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginCompleteResponse {
    success: bool,
    message: &'static str,
    is_new_user: bool,
    is_profile_complete: bool,
    token: String,
    user: UserResponse,
}

/// A booking record written by the client after a completed checkout.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub bus_name: String,
    #[serde(default)]
    pub bus_type: String,
    pub source: String,
    pub destination: String,
    pub journey_date: NaiveDate,
    #[serde(default)]
    pub departure_time: Option<String>,
    #[serde(default)]
    pub arrival_time: Option<String>,
    #[serde(default)]
    pub boarding_point: Option<StopPoint>,
    #[serde(default)]
    pub dropping_point: Option<StopPoint>,
    #[serde(default, alias = "selectedSeats")]
    pub seats: Vec<String>,
    #[serde(default)]
    pub passengers: Vec<PassengerRecord>,
    #[serde(default)]
    pub base_fare: Amount,
    #[serde(default)]
    pub service_tax: Amount,
    pub total_fare: Amount,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub search_token: Option<String>,
    #[serde(default)]
    pub external_booking_id: Option<String>,
    #[serde(default)]
    pub ticket_no: Option<String>,
    #[serde(default)]
    pub pnr: Option<String>,
}

impl CreateBookingRequest {
    fn into_new_booking(self, claims: &UserClaims) -> Result<NewBooking, AppError> {
        if self.seats.is_empty() {
            return Err(AppError::Validation("At least one seat is required".to_string()));
        }
        Ok(NewBooking {
            user_id: claims.sub,
            user_phone: claims.phone.clone(),
            bus_name: self.bus_name,
            bus_type: self.bus_type,
            source: self.source,
            destination: self.destination,
            journey_date: self.journey_date,
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            boarding_point: self.boarding_point,
            dropping_point: self.dropping_point,
            seats: self.seats,
            passengers: self.passengers,
            search_token: self.search_token,
            external_booking_id: self.external_booking_id,
            ticket_no: self.ticket_no,
            pnr: self.pnr,
            base_fare: self.base_fare,
            service_tax: self.service_tax,
            total_fare: self.total_fare,
            payment_id: self.payment_id,
            payment_status: self.payment_status.unwrap_or(PaymentStatus::Completed),
            payment_method: self.payment_method,
            status: BookingStatus::Confirmed,
        })
    }
}

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/user/profile", get(get_profile).put(update_profile))
        .route("/user/bookings", get(list_bookings).post(create_booking))
        .route("/user/bookings/{id}", get(get_booking))
        .route("/user/verify-token", post(verify_token))
        .route_layer(middleware::from_fn_with_state(state, user_auth_middleware));

    Router::new()
        .route("/user/login-complete", post(login_complete))
        .merge(protected)
}

async fn load_user(state: &AppState, claims: &UserClaims) -> Result<User, AppError> {
    state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /user/login-complete
/// Trades a fresh OTP verification for a session token.
async fn login_complete(
    State(state): State<AppState>,
    Json(req): Json<LoginCompleteRequest>,
) -> Result<Json<LoginCompleteResponse>, AppError> {
    let phone = MobileInput::parse(req.phone.as_ref())?;
    if !state.otp.consume_verified(&phone).await? {
        return Err(AppError::Authentication(
            "Phone number not verified. Please verify OTP first.".to_string(),
        ));
    }

    let (user, created) = state.users.record_login(&phone).await?;
    let token = issue_token(&state.auth, user.id, &user.phone)?;
    tracing::info!(user_id = %user.id, created, "User logged in");

    Ok(Json(LoginCompleteResponse {
        success: true,
        message: if created {
            "Account created successfully"
        } else {
            "Login successful"
        },
        is_new_user: created,
        is_profile_complete: user.is_profile_complete,
        token,
        user: UserResponse::from(&user),
    }))
}

/// GET /user/profile
async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
) -> Result<Json<Value>, AppError> {
    let user = load_user(&state, &claims).await?;
    Ok(Json(json!({ "success": true, "user": UserResponse::from(&user) })))
}

/// PUT /user/profile
async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Value>, AppError> {
    update.validate().map_err(AppError::Validation)?;
    let user = state.users.update_profile(claims.sub, &update).await?;
    tracing::info!(user_id = %user.id, complete = user.is_profile_complete, "Profile updated");
    Ok(Json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "user": UserResponse::from(&user),
    })))
}

/// GET /user/bookings
/// Newest first.
async fn list_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
) -> Result<Json<Value>, AppError> {
    let bookings: Vec<Booking> = state.bookings.list_for_user(claims.sub, BOOKING_HISTORY_LIMIT).await?;
    Ok(Json(json!({ "success": true, "bookings": bookings })))
}

/// POST /user/bookings
async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let booking = state.bookings.create(req.into_new_booking(&claims)?).await?;
    tracing::info!(reference = %booking.booking_reference, "Booking recorded");
    Ok(Json(json!({
        "success": true,
        "message": "Booking created successfully",
        "booking": {
            "id": booking.id,
            "bookingId": booking.booking_reference,
            "status": booking.status(),
        },
    })))
}

/// GET /user/bookings/{id}
async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking = state
        .bookings
        .get_for_user(claims.sub, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;
    Ok(Json(json!({ "success": true, "booking": booking })))
}

/// POST /user/verify-token
async fn verify_token(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
) -> Result<Json<Value>, AppError> {
    let user = load_user(&state, &claims).await?;
    Ok(Json(json!({ "success": true, "user": UserResponse::from(&user) })))
}
