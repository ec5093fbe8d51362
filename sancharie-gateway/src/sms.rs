use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use sancharie_core::otp::SmsGateway;
use sancharie_core::ProviderError;
use sancharie_shared::{Masked, PhoneNumber};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmsConfig {
    pub api_url: String,
    pub api_key: Masked<String>,
    pub sender_id: String,
    /// DLT principal entity id.
    pub entity_id: Option<String>,
    /// DLT template id; the message text must match the registered template.
    pub template_id: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: Masked::new(String::new()),
            sender_id: String::new(),
            entity_id: None,
            template_id: None,
            timeout_secs: 30,
        }
    }
}

impl SmsConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_url.is_empty() && !self.api_key.expose().is_empty() && !self.sender_id.is_empty()
    }
}

pub fn otp_message(code: &str) -> String {
    format!(
        "Welcome to Sancharie! Use {} to complete your Sancharie account login. Never share your OTP with anyone for security reasons. - Team Sancharie",
        code
    )
}

/// MetaReach HTTP SMS gateway. Sends with a GET carrying everything as
/// query parameters.
pub struct MetaReachSms {
    config: SmsConfig,
    client: Client,
}

impl MetaReachSms {
    pub fn new(config: SmsConfig) -> Result<Self, ProviderError> {
        if !config.is_configured() {
            return Err(ProviderError::NotConfigured("SMS gateway"));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn query(&self, phone: &PhoneNumber, code: &str) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("apikey", self.config.api_key.expose().clone()),
            ("senderid", self.config.sender_id.clone()),
            ("number", phone.with_country_code()),
            ("message", otp_message(code)),
        ];
        if let Some(peid) = &self.config.entity_id {
            query.push(("peid", peid.clone()));
        }
        if let Some(template) = &self.config.template_id {
            query.push(("templateid", template.clone()));
        }
        query
    }
}

#[async_trait]
impl SmsGateway for MetaReachSms {
    async fn send_otp(&self, phone: &PhoneNumber, code: &str) -> Result<(), ProviderError> {
        let response = self
            .client
            .get(&self.config.api_url)
            .header("Accept", "application/json")
            .query(&self.query(phone, code))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Transport("SMS service timeout".to_string())
                } else {
                    ProviderError::Transport(format!("SMS service unavailable: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(phone = %phone.masked().hint(), %status, body = %body, "SMS gateway rejected the message");
            return Err(ProviderError::Rejected {
                code: i64::from(status.as_u16()),
                message: "SMS API error".to_string(),
            });
        }
        tracing::debug!(phone = %phone.masked().hint(), "SMS accepted by gateway");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SmsConfig {
        SmsConfig {
            api_url: "https://sms.example.test/send".into(),
            api_key: Masked::new("key".into()),
            sender_id: "SNCHRI".into(),
            entity_id: Some("1101".into()),
            template_id: None,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_message_matches_template() {
        let message = otp_message("482913");
        assert!(message.starts_with("Welcome to Sancharie! Use 482913 to complete"));
        assert!(message.ends_with("- Team Sancharie"));
    }

    #[test]
    fn test_query_uses_country_code() {
        let sms = MetaReachSms::new(config()).unwrap();
        let phone = PhoneNumber::parse("9876543210").unwrap();
        let query = sms.query(&phone, "123456");
        assert!(query.contains(&("number", "919876543210".to_string())));
        assert!(query.contains(&("peid", "1101".to_string())));
        assert!(!query.iter().any(|(k, _)| *k == "templateid"));
    }

    #[test]
    fn test_unconfigured_gateway() {
        let err = MetaReachSms::new(SmsConfig::default()).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
