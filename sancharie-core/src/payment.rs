use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use sancharie_seating::Amount;

use crate::ProviderError;

pub const CURRENCY_INR: &str = "INR";

/// Largest order the checkout accepts, in rupees.
pub const MAX_ORDER_AMOUNT: i64 = 5_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOrder {
    pub id: String,
    pub amount: Amount,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: String,
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub id: String,
    pub order_id: Option<String>,
    pub amount: Amount,
    pub currency: String,
    pub status: String,
    pub method: Option<String>,
    pub captured: bool,
    pub created_at: Option<i64>,
}

/// Public checkout parameters. Never includes the key secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicPaymentConfig {
    pub key_id: String,
    pub currency: String,
    pub name: String,
    pub description: String,
}

/// Result of settling a client-reported payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum PaymentOutcome {
    Verified {
        order_id: String,
        payment_id: String,
        status: String,
        method: Option<String>,
    },
    Failed {
        reason: String,
    },
    Cancelled,
}

impl PaymentOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, PaymentOutcome::Verified { .. })
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create an order with the provider. `notes` are attached verbatim.
    async fn create_order(
        &self,
        amount: Amount,
        currency: &str,
        receipt: &str,
        notes: &BTreeMap<String, String>,
    ) -> Result<PaymentOrder, ProviderError>;

    async fn fetch_order(&self, order_id: &str) -> Result<PaymentOrder, ProviderError>;

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentDetails, ProviderError>;

    /// Check the checkout signature for `order_id|payment_id`.
    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;

    fn public_config(&self) -> PublicPaymentConfig;
}
