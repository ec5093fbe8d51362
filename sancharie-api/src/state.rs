use std::sync::Arc;
use std::time::Duration;

use sancharie_core::inventory::InventoryProvider;
use sancharie_core::otp::OtpService;
use sancharie_core::repository::{BookingRepository, UserRepository};
use sancharie_core::ExpiringStore;
use sancharie_order::CheckoutOrchestrator;
use sancharie_shared::Masked;
use sancharie_store::{DbClient, RedisExpiringStore};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: Masked<String>,
    pub expiration: u64,
}

/// Global per-client request budget.
#[derive(Clone, Copy)]
pub struct ThrottlePolicy {
    pub max_requests: u64,
    pub window: Duration,
}

/// Persistent backends probed by the health check. Empty in memory mode.
#[derive(Clone, Default)]
pub struct Backends {
    pub db: Option<DbClient>,
    pub redis: Option<RedisExpiringStore>,
}

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub inventory: Arc<dyn InventoryProvider>,
    pub otp: Arc<OtpService>,
    pub checkout: Arc<CheckoutOrchestrator>,
    /// Counters for the request throttle.
    pub counters: Arc<dyn ExpiringStore>,
    pub throttle: ThrottlePolicy,
    pub auth: AuthConfig,
    pub backends: Backends,
}
