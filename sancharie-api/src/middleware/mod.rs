pub mod auth;
pub mod throttle;

pub use auth::{issue_token, user_auth_middleware, UserClaims};
pub use throttle::throttle_middleware;
