//! Test doubles for the third-party collaborators.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use sancharie_seating::{Amount, RawSeatLayout, StopPoint};
use sancharie_shared::PhoneNumber;

use crate::inventory::{
    BookingConfirmation, BookingSubmission, BusSearchQuery, BusSummary, CancellationReceipt,
    CancellationRequest, InventoryProvider, PointLists, SearchResults,
};
use crate::otp::SmsGateway;
use crate::payment::{PaymentDetails, PaymentGateway, PaymentOrder, PublicPaymentConfig, CURRENCY_INR};
use crate::ProviderError;

fn stop(id: &str, name: &str) -> StopPoint {
    StopPoint {
        id: id.to_string(),
        name: name.to_string(),
        time: None,
        location: None,
        address: None,
        landmark: None,
        contact_number: None,
    }
}

/// Inventory provider serving a fixed layout. Layout fetches and booking
/// submissions can be made to fail.
#[derive(Debug, Default)]
pub struct StaticInventory {
    layout: Mutex<RawSeatLayout>,
    points: PointLists,
    fail_layout: AtomicBool,
    fail_booking: AtomicBool,
    submissions: Mutex<Vec<BookingSubmission>>,
    cancellations: AtomicUsize,
}

impl StaticInventory {
    pub fn new(layout: RawSeatLayout) -> Self {
        Self {
            layout: Mutex::new(layout),
            points: PointLists {
                boarding: vec![stop("b1", "Majestic"), stop("b2", "Silk Board")],
                dropping: vec![stop("d1", "Ameerpet"), stop("d2", "Kukatpally")],
            },
            ..Self::default()
        }
    }

    pub fn set_layout(&self, layout: RawSeatLayout) {
        if let Ok(mut current) = self.layout.lock() {
            *current = layout;
        }
    }

    pub fn fail_layout(&self, fail: bool) {
        self.fail_layout.store(fail, Ordering::SeqCst);
    }

    pub fn fail_booking(&self, fail: bool) {
        self.fail_booking.store(fail, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> Vec<BookingSubmission> {
        self.submissions.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn cancellation_count(&self) -> usize {
        self.cancellations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventoryProvider for StaticInventory {
    async fn search_buses(&self, _query: &BusSearchQuery) -> Result<SearchResults, ProviderError> {
        Ok(SearchResults {
            search_token: "search-token".to_string(),
            buses: vec![BusSummary {
                result_index: 1,
                travel_name: "Sancharie Express".to_string(),
                bus_type: "A/C Sleeper (2+1)".to_string(),
                departure_time: Some("2026-11-02T21:30:00".to_string()),
                arrival_time: Some("2026-11-03T06:15:00".to_string()),
                available_seats: Some(30),
                price: Amount::from_major(800),
                boarding_points: self.points.boarding.clone(),
                dropping_points: self.points.dropping.clone(),
            }],
        })
    }

    async fn fetch_seat_layout(&self, _token: &str, _index: i64) -> Result<RawSeatLayout, ProviderError> {
        if self.fail_layout.load(Ordering::SeqCst) {
            return Err(ProviderError::Transport("layout service unavailable".to_string()));
        }
        self.layout
            .lock()
            .map(|l| l.clone())
            .map_err(|_| ProviderError::Transport("layout lock poisoned".to_string()))
    }

    async fn fetch_boarding_dropping_points(&self, _token: &str, _index: i64) -> Result<PointLists, ProviderError> {
        Ok(self.points.clone())
    }

    async fn submit_booking(&self, submission: &BookingSubmission) -> Result<BookingConfirmation, ProviderError> {
        if self.fail_booking.load(Ordering::SeqCst) {
            return Err(ProviderError::Rejected {
                code: 2,
                message: "Seat already booked".to_string(),
            });
        }
        let mut submissions = self
            .submissions
            .lock()
            .map_err(|_| ProviderError::Transport("submission lock poisoned".to_string()))?;
        submissions.push(submission.clone());
        let n = submissions.len();
        Ok(BookingConfirmation {
            booking_id: format!("BK{}", 1000 + n),
            ticket_no: Some(format!("TKT{}", 5000 + n)),
            pnr: Some(format!("PNR{}", 9000 + n)),
            status: Some("Confirmed".to_string()),
            invoice_number: None,
            invoice_amount: None,
        })
    }

    async fn cancel_booking(&self, request: &CancellationRequest) -> Result<CancellationReceipt, ProviderError> {
        self.cancellations.fetch_add(1, Ordering::SeqCst);
        Ok(CancellationReceipt {
            status: Some(1),
            trace_id: Some(format!("trace-{}", request.booking_id)),
        })
    }
}

/// Captures issued codes instead of sending them.
#[derive(Debug, Default)]
pub struct RecordingSmsGateway {
    sent: Mutex<HashMap<String, Vec<String>>>,
    fail_next: AtomicBool,
}

impl RecordingSmsGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_code(&self, phone: &PhoneNumber) -> Option<String> {
        let sent = self.sent.lock().ok()?;
        sent.get(phone.as_str()).and_then(|codes| codes.last().cloned())
    }

    pub fn sent_count(&self) -> usize {
        self.sent
            .lock()
            .map(|s| s.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SmsGateway for RecordingSmsGateway {
    async fn send_otp(&self, phone: &PhoneNumber, code: &str) -> Result<(), ProviderError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ProviderError::Transport("SMS gateway timeout".to_string()));
        }
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| ProviderError::Transport("sms lock poisoned".to_string()))?;
        sent.entry(phone.as_str().to_string())
            .or_default()
            .push(code.to_string());
        Ok(())
    }
}

/// Payment gateway that keeps orders in memory and accepts signatures
/// produced by [`FakePaymentGateway::sign`].
#[derive(Debug)]
pub struct FakePaymentGateway {
    secret: String,
    orders: Mutex<BTreeMap<String, PaymentOrder>>,
    next_id: AtomicUsize,
}

impl FakePaymentGateway {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            orders: Mutex::new(BTreeMap::new()),
            next_id: AtomicUsize::new(1),
        }
    }

    pub fn sign(&self, order_id: &str, payment_id: &str) -> String {
        format!("{}:{}|{}", self.secret, order_id, payment_id)
    }
}

#[async_trait]
impl PaymentGateway for FakePaymentGateway {
    async fn create_order(
        &self,
        amount: Amount,
        currency: &str,
        receipt: &str,
        _notes: &BTreeMap<String, String>,
    ) -> Result<PaymentOrder, ProviderError> {
        let id = format!("order_{:06}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let order = PaymentOrder {
            id: id.clone(),
            amount,
            currency: currency.to_string(),
            receipt: Some(receipt.to_string()),
            status: "created".to_string(),
            created_at: None,
        };
        self.orders
            .lock()
            .map_err(|_| ProviderError::Transport("order lock poisoned".to_string()))?
            .insert(id, order.clone());
        Ok(order)
    }

    async fn fetch_order(&self, order_id: &str) -> Result<PaymentOrder, ProviderError> {
        self.orders
            .lock()
            .map_err(|_| ProviderError::Transport("order lock poisoned".to_string()))?
            .get(order_id)
            .cloned()
            .ok_or_else(|| ProviderError::Rejected {
                code: 404,
                message: "The id provided does not exist".to_string(),
            })
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentDetails, ProviderError> {
        Ok(PaymentDetails {
            id: payment_id.to_string(),
            order_id: None,
            amount: Amount::ZERO,
            currency: CURRENCY_INR.to_string(),
            status: "captured".to_string(),
            method: Some("upi".to_string()),
            captured: true,
            created_at: None,
        })
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let expected = self.sign(order_id, payment_id);
        constant_time_eq::constant_time_eq(expected.as_bytes(), signature.as_bytes())
    }

    fn public_config(&self) -> PublicPaymentConfig {
        PublicPaymentConfig {
            key_id: "rzp_test_fake".to_string(),
            currency: CURRENCY_INR.to_string(),
            name: "Sancharie Travels".to_string(),
            description: "Bus Booking Payment".to_string(),
        }
    }
}

/// Provider-shaped layout used across tests: one lower row of four seats
/// with an aisle gap, one booked seat and an upper sleeper.
pub fn sample_layout() -> RawSeatLayout {
    let rows = serde_json::json!([
        [
            { "SeatName": "L1", "SeatType": 1, "SeatStatus": true, "SeatFare": 800 },
            { "SeatName": "L2", "SeatType": 1, "SeatStatus": true, "SeatFare": 800, "IsLadiesSeat": true },
            { "SeatName": "", "SeatType": 1, "SeatStatus": false, "SeatFare": 0 },
            { "SeatName": "L3", "SeatType": 1, "SeatStatus": true, "SeatFare": 900 },
            { "SeatName": "L4", "SeatType": 1, "SeatStatus": false, "SeatFare": 900 }
        ],
        [
            { "SeatName": "U1", "SeatType": 2, "SeatStatus": true, "IsUpper": true, "SeatFare": 1200 }
        ]
    ]);
    serde_json::from_value(serde_json::json!({ "SeatDetails": rows })).unwrap_or_default()
}

impl StaticInventory {
    pub fn with_sample_layout() -> Arc<Self> {
        Arc::new(Self::new(sample_layout()))
    }
}
