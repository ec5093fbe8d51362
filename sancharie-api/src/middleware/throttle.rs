use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use sancharie_core::otp::retry_minutes;

use crate::error::AppError;
use crate::extractors::ClientIp;
use crate::state::AppState;

/// Fixed-window request budget per client address. Fails open when the
/// counter store is unreachable.
pub async fn throttle_middleware(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = format!("ratelimit:{}", ip);
    match state.counters.increment(&key, state.throttle.window).await {
        Ok(hits) if hits.count > state.throttle.max_requests => {
            tracing::warn!(client = %ip, count = hits.count, "Request throttled");
            let minutes = retry_minutes(&hits.resets_in);
            Err(AppError::RateLimited {
                message: format!("Too many requests. Please try again in {} minute(s).", minutes),
                retry_after_minutes: minutes,
            })
        }
        Ok(_) => Ok(next.run(req).await),
        Err(e) => {
            tracing::warn!(error = %e, "Throttle store unavailable");
            Ok(next.run(req).await)
        }
    }
}
