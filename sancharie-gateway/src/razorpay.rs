//! Razorpay orders and payments over its REST API.

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use std::collections::BTreeMap;
use std::time::Duration;

use sancharie_core::payment::{PaymentDetails, PaymentGateway, PaymentOrder, PublicPaymentConfig, CURRENCY_INR};
use sancharie_core::ProviderError;
use sancharie_seating::Amount;
use sancharie_shared::Masked;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: Masked<String>,
    pub merchant_name: String,
    pub description: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for RazorpayConfig {
    fn default() -> Self {
        Self {
            key_id: String::new(),
            key_secret: Masked::new(String::new()),
            merchant_name: "Sancharie Travels".to_string(),
            description: "Bus Booking Payment".to_string(),
            api_base: "https://api.razorpay.com/v1".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Hex HMAC-SHA256 of `order_id|payment_id`, as the checkout widget signs it.
pub fn checkout_signature(secret: &str, order_id: &str, payment_id: &str) -> String {
    // HMAC accepts keys of any length, so this never fails.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawOrder {
    id: String,
    amount: i64,
    currency: String,
    #[serde(default)]
    receipt: Option<String>,
    status: String,
    #[serde(default)]
    created_at: Option<i64>,
}

impl From<RawOrder> for PaymentOrder {
    fn from(raw: RawOrder) -> Self {
        PaymentOrder {
            id: raw.id,
            amount: Amount::from_minor(raw.amount),
            currency: raw.currency,
            receipt: raw.receipt,
            status: raw.status,
            created_at: raw.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPayment {
    id: String,
    #[serde(default)]
    order_id: Option<String>,
    amount: i64,
    currency: String,
    status: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    captured: bool,
    #[serde(default)]
    created_at: Option<i64>,
}

impl From<RawPayment> for PaymentDetails {
    fn from(raw: RawPayment) -> Self {
        PaymentDetails {
            id: raw.id,
            order_id: raw.order_id,
            amount: Amount::from_minor(raw.amount),
            currency: raw.currency,
            status: raw.status,
            method: raw.method,
            captured: raw.captured,
            created_at: raw.created_at,
        }
    }
}

pub struct RazorpayGateway {
    config: RazorpayConfig,
    client: Client,
}

impl RazorpayGateway {
    pub fn new(config: RazorpayConfig) -> Result<Self, ProviderError> {
        if config.key_id.is_empty() || config.key_secret.expose().is_empty() {
            return Err(ProviderError::NotConfigured("Razorpay"));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ProviderError> {
        let response = request
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.expose()))
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .map(|e| {
                    let detail = e.error.description.unwrap_or_default();
                    match e.error.code {
                        Some(code) => format!("{}: {}", code, detail),
                        None => detail,
                    }
                })
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(ProviderError::Rejected {
                code: i64::from(status.as_u16()),
                message,
            });
        }
        serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(
        &self,
        amount: Amount,
        currency: &str,
        receipt: &str,
        notes: &BTreeMap<String, String>,
    ) -> Result<PaymentOrder, ProviderError> {
        let mut notes = notes.clone();
        notes.insert("created_at".to_string(), Utc::now().to_rfc3339());
        let body = json!({
            "amount": amount.minor(),
            "currency": currency,
            "receipt": receipt,
            "notes": notes,
        });
        let order: RawOrder = self.send(self.client.post(self.url("orders")).json(&body)).await?;
        tracing::info!(order_id = %order.id, amount = order.amount, "Razorpay order created");
        Ok(order.into())
    }

    async fn fetch_order(&self, order_id: &str) -> Result<PaymentOrder, ProviderError> {
        let order: RawOrder = self
            .send(self.client.get(self.url(&format!("orders/{}", order_id))))
            .await?;
        Ok(order.into())
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentDetails, ProviderError> {
        let payment: RawPayment = self
            .send(self.client.get(self.url(&format!("payments/{}", payment_id))))
            .await?;
        Ok(payment.into())
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        if order_id.is_empty() || payment_id.is_empty() || signature.is_empty() {
            return false;
        }
        let expected = checkout_signature(self.config.key_secret.expose(), order_id, payment_id);
        let valid = constant_time_eq::constant_time_eq(expected.as_bytes(), signature.as_bytes());
        if !valid {
            tracing::warn!(order_id, payment_id, "Razorpay signature verification failed");
        }
        valid
    }

    fn public_config(&self) -> PublicPaymentConfig {
        PublicPaymentConfig {
            key_id: self.config.key_id.clone(),
            currency: CURRENCY_INR.to_string(),
            name: self.config.merchant_name.clone(),
            description: self.config.description.clone(),
        }
    }
}
