use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sancharie_order::BookingUser;
use sancharie_shared::PhoneNumber;

use crate::error::AppError;
use crate::state::{AppState, AuthConfig};

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserClaims {
    pub sub: Uuid,
    pub phone: PhoneNumber,
    pub exp: usize,
}

impl UserClaims {
    pub fn booking_user(&self) -> BookingUser {
        BookingUser {
            id: self.sub,
            phone: self.phone.clone(),
        }
    }
}

pub fn issue_token(auth: &AuthConfig, user_id: Uuid, phone: &PhoneNumber) -> Result<String, AppError> {
    let expires = Utc::now() + Duration::seconds(i64::try_from(auth.expiration).unwrap_or(i64::MAX / 1000));
    let claims = UserClaims {
        sub: user_id,
        phone: phone.clone(),
        exp: usize::try_from(expires.timestamp()).unwrap_or(usize::MAX),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.secret.expose().as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Token encoding failed: {}", e)))
}

pub fn verify_token(auth: &AuthConfig, token: &str) -> Result<UserClaims, jsonwebtoken::errors::Error> {
    decode::<UserClaims>(
        token,
        &DecodingKey::from_secret(auth.secret.expose().as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

// ============================================================================
// User Authentication Middleware
// ============================================================================

/// Requires a bearer token: 401 when absent, 403 when it does not verify.
pub async fn user_auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.ok_or_else(|| AppError::Authentication("Access token required".to_string()))?;

    let claims = verify_token(&state.auth, bearer.token()).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        AppError::Authorization("Invalid or expired token".to_string())
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
