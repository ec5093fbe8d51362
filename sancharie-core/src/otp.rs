//! One-time password issue and verification over an [`ExpiringStore`].
//!
//! Codes are single use and expire. Wrong guesses are counted per phone and
//! the code is invalidated once they run out. Issue requests are throttled
//! per phone and client. A successful verification leaves a short-lived
//! marker that the login step consumes.

use async_trait::async_trait;
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use sancharie_shared::PhoneNumber;

use crate::store::{ExpiringStore, StoreError};
use crate::ProviderError;

pub const OTP_LENGTH: usize = 6;

#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send_otp(&self, phone: &PhoneNumber, code: &str) -> Result<(), ProviderError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpConfig {
    pub expiry_secs: u64,
    pub max_attempts: u64,
    pub rate_limit_max: u64,
    pub rate_limit_window_secs: u64,
    pub verified_ttl_secs: u64,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            expiry_secs: 300,
            max_attempts: 3,
            rate_limit_max: 3,
            rate_limit_window_secs: 600,
            verified_ttl_secs: 600,
        }
    }
}

impl OtpConfig {
    pub fn expiry(&self) -> Duration {
        Duration::from_secs(self.expiry_secs)
    }

    pub fn expiry_minutes(&self) -> u64 {
        self.expiry_secs.div_ceil(60)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("Too many OTP requests. Please try again in {} minute(s).", retry_minutes(.retry_after))]
    RateLimited { retry_after: Duration },

    #[error("Failed to send OTP: {0}")]
    Delivery(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Whole minutes, rounded up, never zero.
pub fn retry_minutes(retry_after: &Duration) -> u64 {
    retry_after.as_secs().div_ceil(60).max(1)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtpVerification {
    pub valid: bool,
    pub reason: String,
}

impl OtpVerification {
    fn accepted() -> Self {
        Self {
            valid: true,
            reason: "OTP verified successfully".to_string(),
        }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: reason.into(),
        }
    }
}

/// A freshly issued code; the code itself only goes to the SMS gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpIssued {
    pub expires_in: Duration,
}

/// Six-digit, shape-only check. Run before touching the store.
pub fn is_well_formed(code: &str) -> bool {
    code.len() == OTP_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

fn code_key(phone: &PhoneNumber) -> String {
    format!("otp:code:{}", phone.as_str())
}

fn attempts_key(phone: &PhoneNumber) -> String {
    format!("otp:attempts:{}", phone.as_str())
}

fn verified_key(phone: &PhoneNumber) -> String {
    format!("otp:verified:{}", phone.as_str())
}

fn rate_key(phone: &PhoneNumber, client: &str) -> String {
    format!("otp:rate:{}:{}", client, phone.as_str())
}

pub struct OtpService {
    store: Arc<dyn ExpiringStore>,
    sms: Arc<dyn SmsGateway>,
    config: OtpConfig,
}

impl OtpService {
    pub fn new(store: Arc<dyn ExpiringStore>, sms: Arc<dyn SmsGateway>, config: OtpConfig) -> Self {
        Self { store, sms, config }
    }

    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    fn generate_code() -> String {
        format!("{:06}", OsRng.gen_range(100_000..1_000_000u32))
    }

    async fn throttle(&self, phone: &PhoneNumber, client: &str) -> Result<(), OtpError> {
        let window = Duration::from_secs(self.config.rate_limit_window_secs);
        let hits = self.store.increment(&rate_key(phone, client), window).await?;
        if hits.count > self.config.rate_limit_max {
            tracing::warn!(phone = %phone.masked().hint(), client, "OTP rate limit exceeded");
            return Err(OtpError::RateLimited {
                retry_after: hits.resets_in,
            });
        }
        Ok(())
    }

    async fn issue(&self, phone: &PhoneNumber) -> Result<OtpIssued, OtpError> {
        let code = Self::generate_code();
        let expiry = self.config.expiry();

        self.store.put(&code_key(phone), &code, expiry).await?;
        self.store.remove(&attempts_key(phone)).await?;

        if let Err(e) = self.sms.send_otp(phone, &code).await {
            tracing::error!(phone = %phone.masked().hint(), error = %e, "OTP delivery failed");
            self.store.remove(&code_key(phone)).await?;
            return Err(OtpError::Delivery(e));
        }

        tracing::info!(phone = %phone.masked().hint(), "OTP issued");
        Ok(OtpIssued { expires_in: expiry })
    }

    pub async fn send(&self, phone: &PhoneNumber, client: &str) -> Result<OtpIssued, OtpError> {
        self.throttle(phone, client).await?;
        self.issue(phone).await
    }

    /// Like [`send`](Self::send) but drops any outstanding code first.
    pub async fn resend(&self, phone: &PhoneNumber, client: &str) -> Result<OtpIssued, OtpError> {
        self.throttle(phone, client).await?;
        self.invalidate(phone).await?;
        self.issue(phone).await
    }

    pub async fn invalidate(&self, phone: &PhoneNumber) -> Result<(), OtpError> {
        self.store.remove(&code_key(phone)).await?;
        self.store.remove(&attempts_key(phone)).await?;
        Ok(())
    }

    pub async fn verify(&self, phone: &PhoneNumber, code: &str) -> Result<OtpVerification, OtpError> {
        let Some(stored) = self.store.get(&code_key(phone)).await? else {
            return Ok(OtpVerification::rejected(
                "OTP not found or expired. Please request a new OTP.",
            ));
        };

        // Count the attempt before comparing so concurrent guesses cannot
        // all observe the same budget. The counter outlives the code and is
        // only reset when a new code is issued.
        let attempt = self
            .store
            .increment(&attempts_key(phone), self.config.expiry())
            .await?
            .count;
        if attempt > self.config.max_attempts {
            self.store.remove(&code_key(phone)).await?;
            return Ok(OtpVerification::rejected(
                "Too many incorrect attempts. Please request a new OTP.",
            ));
        }

        if constant_time_eq::constant_time_eq(stored.as_bytes(), code.as_bytes()) {
            self.store.remove(&code_key(phone)).await?;
            self.store
                .put(
                    &verified_key(phone),
                    "1",
                    Duration::from_secs(self.config.verified_ttl_secs),
                )
                .await?;
            tracing::info!(phone = %phone.masked().hint(), "OTP verified");
            return Ok(OtpVerification::accepted());
        }

        let remaining = self.config.max_attempts.saturating_sub(attempt);
        tracing::warn!(phone = %phone.masked().hint(), remaining, "OTP mismatch");

        if remaining == 0 {
            self.store.remove(&code_key(phone)).await?;
            return Ok(OtpVerification::rejected(
                "Too many incorrect attempts. Please request a new OTP.",
            ));
        }
        Ok(OtpVerification::rejected(format!(
            "Invalid OTP. {} attempts remaining.",
            remaining
        )))
    }

    /// Take the marker left by a successful [`verify`](Self::verify).
    /// `false` when the phone was never verified or the marker expired.
    pub async fn consume_verified(&self, phone: &PhoneNumber) -> Result<bool, OtpError> {
        let key = verified_key(phone);
        let present = self.store.get(&key).await?.is_some();
        if present {
            self.store.remove(&key).await?;
        }
        Ok(present)
    }
}
