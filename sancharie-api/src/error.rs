use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use sancharie_core::otp::{retry_minutes, OtpError};
use sancharie_core::{ProviderError, RepositoryError, StoreError};
use sancharie_order::{CheckoutError, SessionError};
use sancharie_shared::PhoneError;

#[derive(Debug)]
pub enum AppError {
    Validation(String),
    Authentication(String),
    Authorization(String),
    NotFound(String),
    Conflict(String),
    /// The request is well formed but the booking is not ready for it.
    Unprocessable(String),
    RateLimited { message: String, retry_after_minutes: u64 },
    Unavailable(String),
    Upstream(String),
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut retry_after = None;
        let (status, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Authentication(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Authorization(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::RateLimited {
                message,
                retry_after_minutes,
            } => {
                retry_after = Some(retry_after_minutes);
                (StatusCode::TOO_MANY_REQUESTS, message)
            }
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(err) => {
                tracing::error!("Internal Server Error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
        };

        let body = match retry_after {
            Some(minutes) => json!({ "success": false, "message": message, "retryAfter": minutes }),
            None => json!({ "success": false, "message": message }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<PhoneError> for AppError {
    fn from(err: PhoneError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.into())
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => Self::NotFound(format!("{} not found", what)),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            RepositoryError::Backend(_) => Self::Internal(err.into()),
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured(what) => Self::Unavailable(format!("{} is not configured", what)),
            ProviderError::Rejected { ref message, .. } => {
                tracing::warn!(error = %err, "Provider rejected request");
                Self::Upstream(message.clone())
            }
            ProviderError::Transport(_) | ProviderError::Decode(_) => {
                tracing::error!(error = %err, "Provider call failed");
                Self::Upstream("Upstream service unavailable. Please try again.".to_string())
            }
        }
    }
}

impl From<OtpError> for AppError {
    fn from(err: OtpError) -> Self {
        match err {
            OtpError::RateLimited { retry_after } => Self::RateLimited {
                message: err.to_string(),
                retry_after_minutes: retry_minutes(&retry_after),
            },
            OtpError::Delivery(ref e) => {
                tracing::error!(error = %e, "OTP delivery failed");
                Self::Internal(anyhow::anyhow!("Failed to send OTP. Please try again."))
            }
            OtpError::Store(e) => e.into(),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) => Self::NotFound(err.to_string()),
            SessionError::StaleLayout { .. } => Self::Conflict(err.to_string()),
            SessionError::LayoutUnavailable(_) | SessionError::Selection(_) => Self::Unprocessable(err.to_string()),
            SessionError::UnknownPoint { .. } => Self::Validation(err.to_string()),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Session(e) => e.into(),
            CheckoutError::Selection(e) => Self::Unprocessable(e.to_string()),
            CheckoutError::PassengerMismatch(_)
            | CheckoutError::InvalidPayment(_)
            | CheckoutError::PaymentRejected(_) => Self::Validation(err.to_string()),
            CheckoutError::Provider(e) => e.into(),
            CheckoutError::Repository(e) => e.into(),
        }
    }
}
