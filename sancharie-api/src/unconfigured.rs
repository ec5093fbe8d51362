//! Stand-in for a third-party collaborator whose credentials are missing.
//! Every call fails with [`ProviderError::NotConfigured`], so the rest of
//! the API keeps serving.

use async_trait::async_trait;
use std::collections::BTreeMap;

use sancharie_core::inventory::{
    BookingConfirmation, BookingSubmission, BusSearchQuery, CancellationReceipt, CancellationRequest,
    InventoryProvider, PointLists, SearchResults,
};
use sancharie_core::otp::SmsGateway;
use sancharie_core::payment::{PaymentDetails, PaymentGateway, PaymentOrder, PublicPaymentConfig, CURRENCY_INR};
use sancharie_core::ProviderError;
use sancharie_seating::{Amount, RawSeatLayout};
use sancharie_shared::PhoneNumber;

#[derive(Debug, Clone, Copy)]
pub struct Unconfigured(pub &'static str);

impl Unconfigured {
    fn fail<T>(&self) -> Result<T, ProviderError> {
        Err(ProviderError::NotConfigured(self.0))
    }
}

#[async_trait]
impl InventoryProvider for Unconfigured {
    async fn search_buses(&self, _query: &BusSearchQuery) -> Result<SearchResults, ProviderError> {
        self.fail()
    }

    async fn fetch_seat_layout(&self, _token: &str, _index: i64) -> Result<RawSeatLayout, ProviderError> {
        self.fail()
    }

    async fn fetch_boarding_dropping_points(&self, _token: &str, _index: i64) -> Result<PointLists, ProviderError> {
        self.fail()
    }

    async fn submit_booking(&self, _submission: &BookingSubmission) -> Result<BookingConfirmation, ProviderError> {
        self.fail()
    }

    async fn cancel_booking(&self, _request: &CancellationRequest) -> Result<CancellationReceipt, ProviderError> {
        self.fail()
    }
}

#[async_trait]
impl SmsGateway for Unconfigured {
    async fn send_otp(&self, _phone: &PhoneNumber, _code: &str) -> Result<(), ProviderError> {
        self.fail()
    }
}

#[async_trait]
impl PaymentGateway for Unconfigured {
    async fn create_order(
        &self,
        _amount: Amount,
        _currency: &str,
        _receipt: &str,
        _notes: &BTreeMap<String, String>,
    ) -> Result<PaymentOrder, ProviderError> {
        self.fail()
    }

    async fn fetch_order(&self, _order_id: &str) -> Result<PaymentOrder, ProviderError> {
        self.fail()
    }

    async fn fetch_payment(&self, _payment_id: &str) -> Result<PaymentDetails, ProviderError> {
        self.fail()
    }

    fn verify_signature(&self, _order_id: &str, _payment_id: &str, _signature: &str) -> bool {
        false
    }

    /// Empty key id; the config endpoint reports the service as unavailable.
    fn public_config(&self) -> PublicPaymentConfig {
        PublicPaymentConfig {
            key_id: String::new(),
            currency: CURRENCY_INR.to_string(),
            name: String::new(),
            description: String::new(),
        }
    }
}
