use axum::{
    extract::State,
    http::{HeaderValue, Method, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod bus;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod payment;
pub mod state;
pub mod unconfigured;
pub mod user;

pub use state::AppState;

/// CORS for the web client. An empty origin list allows any origin.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([axum::http::header::AUTHORIZATION, axum::http::header::CONTENT_TYPE])
}

pub fn app(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(auth::routes())
        .merge(user::routes(state.clone()))
        .merge(payment::routes(state.clone()))
        .merge(bus::routes(state.clone()))
        .fallback(not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::throttle_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health
/// 503 when a configured backend does not answer.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database = match &state.backends.db {
        Some(db) => Some(db.ping().await),
        None => None,
    };
    let redis = match &state.backends.redis {
        Some(redis) => Some(redis.ping().await),
        None => None,
    };
    let sessions = state.checkout.sessions().lock().await.len();

    let healthy = database.unwrap_or(true) && redis.unwrap_or(true);
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({
            "status": if healthy { "ok" } else { "degraded" },
            "message": if healthy { "Server is running" } else { "A backend is unreachable" },
            "database": database,
            "redis": redis,
            "activeSessions": sessions,
        })),
    )
}

async fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "Endpoint not found" })),
    )
}
