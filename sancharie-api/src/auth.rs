use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use sancharie_core::otp;
use sancharie_shared::{PhoneError, PhoneNumber};

use crate::{error::AppError, extractors::ClientIp, state::AppState};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Phone input as clients send it: a string, or a bare JSON number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MobileInput {
    Text(String),
    Number(u64),
}

impl MobileInput {
    pub fn parse(input: Option<&MobileInput>) -> Result<PhoneNumber, PhoneError> {
        match input {
            Some(MobileInput::Text(text)) => PhoneNumber::parse(text),
            Some(MobileInput::Number(n)) => PhoneNumber::parse(&n.to_string()),
            None => Err(PhoneError::Missing),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OtpRequest {
    #[serde(alias = "phone")]
    pub mobile: Option<MobileInput>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(alias = "phone")]
    pub mobile: Option<MobileInput>,
    #[serde(default)]
    pub otp: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpSentResponse {
    success: bool,
    message: &'static str,
    /// Minutes until the code expires.
    expires_in: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedUser {
    mobile: String,
    is_authenticated: bool,
}

#[derive(Debug, Serialize)]
pub struct OtpVerifiedResponse {
    success: bool,
    message: String,
    user: VerifiedUser,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/send-otp", post(send_otp))
        .route("/auth/verify-otp", post(verify_otp))
        .route("/auth/resend-otp", post(resend_otp))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/send-otp
async fn send_otp(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(req): Json<OtpRequest>,
) -> Result<Json<OtpSentResponse>, AppError> {
    let phone = MobileInput::parse(req.mobile.as_ref())?;
    let issued = state.otp.send(&phone, &ip).await?;
    Ok(Json(OtpSentResponse {
        success: true,
        message: "OTP sent successfully",
        expires_in: issued.expires_in.as_secs().div_ceil(60),
    }))
}

/// POST /auth/verify-otp
async fn verify_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Json<OtpVerifiedResponse>, AppError> {
    let phone = MobileInput::parse(req.mobile.as_ref())?;
    let code = req.otp.as_deref().map(str::trim).unwrap_or_default();
    if !otp::is_well_formed(code) {
        return Err(AppError::Validation("Please enter a valid 6-digit OTP".to_string()));
    }

    let verification = state.otp.verify(&phone, code).await?;
    if !verification.valid {
        return Err(AppError::Validation(verification.reason));
    }
    Ok(Json(OtpVerifiedResponse {
        success: true,
        message: verification.reason,
        user: VerifiedUser {
            mobile: phone.as_str().to_string(),
            is_authenticated: true,
        },
    }))
}

/// POST /auth/resend-otp
async fn resend_otp(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(req): Json<OtpRequest>,
) -> Result<Json<OtpSentResponse>, AppError> {
    let phone = MobileInput::parse(req.mobile.as_ref())?;
    let issued = state.otp.resend(&phone, &ip).await?;
    Ok(Json(OtpSentResponse {
        success: true,
        message: "OTP resent successfully",
        expires_in: issued.expires_in.as_secs().div_ceil(60),
    }))
}
