use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use sancharie_core::account::Gender;
use sancharie_core::booking::{Booking, BookingStatus, NewBooking, PassengerRecord, PaymentStatus};
use sancharie_core::inventory::{BookingSubmission, CancellationRequest, InventoryProvider, Passenger};
use sancharie_core::payment::{PaymentGateway, PaymentOrder, PaymentOutcome, CURRENCY_INR, MAX_ORDER_AMOUNT};
use sancharie_core::repository::{BookingRepository, RepositoryError};
use sancharie_core::ProviderError;
use sancharie_seating::{
    normalize, Amount, FareBreakdown, FareConfig, GenderPolicy, GenderRestriction, NormalizerOptions, Seat,
    SeatFilter, SeatOrder, SelectionError, ToggleOutcome,
};

use crate::manager::SessionManager;
use crate::models::{BookingUser, PaymentReport, SessionView, TripContext};
use crate::session::{BookingSession, SessionError};

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("Passenger details do not match the selected seats: {0}")]
    PassengerMismatch(String),

    #[error("Invalid payment request: {0}")]
    InvalidPayment(String),

    #[error("Payment verification failed. {0}")]
    PaymentRejected(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Drives a booking from seat layout to stored ticket: session state lives
/// in the [`SessionManager`], everything else goes through the collaborators.
pub struct CheckoutOrchestrator {
    inventory: Arc<dyn InventoryProvider>,
    payments: Arc<dyn PaymentGateway>,
    bookings: Arc<dyn BookingRepository>,
    sessions: Arc<Mutex<SessionManager>>,
    normalizer: NormalizerOptions,
    fare: FareConfig,
}

impl CheckoutOrchestrator {
    pub fn new(
        inventory: Arc<dyn InventoryProvider>,
        payments: Arc<dyn PaymentGateway>,
        bookings: Arc<dyn BookingRepository>,
        sessions: Arc<Mutex<SessionManager>>,
    ) -> Self {
        Self {
            inventory,
            payments,
            bookings,
            sessions,
            normalizer: NormalizerOptions::default(),
            fare: FareConfig::default(),
        }
    }

    pub fn with_fare(mut self, fare: FareConfig) -> Self {
        self.fare = fare;
        self
    }

    pub fn with_normalizer(mut self, normalizer: NormalizerOptions) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn sessions(&self) -> &Arc<Mutex<SessionManager>> {
        &self.sessions
    }

    pub fn payments(&self) -> &Arc<dyn PaymentGateway> {
        &self.payments
    }

    /// Open a session for a bus: fetch its stops, then its layout.
    pub async fn open_session(&self, trip: TripContext, policy: GenderPolicy) -> Result<SessionView, CheckoutError> {
        let points = self
            .inventory
            .fetch_boarding_dropping_points(&trip.search_token, trip.result_index)
            .await?;
        let session = BookingSession::new(trip, points, policy);
        let id = self.sessions.lock().await.insert(session);
        tracing::info!(session_id = %id, "Booking session opened");
        self.reload_layout(id).await
    }

    /// Refetch the layout. The selection is cleared before the fetch starts;
    /// if another reload overtakes this one its result is dropped.
    pub async fn reload_layout(&self, id: Uuid) -> Result<SessionView, CheckoutError> {
        let (ticket, token, index) = {
            let mut sessions = self.sessions.lock().await;
            let session = sessions.get_mut(&id)?;
            let ticket = session.begin_reload();
            (ticket, session.trip().search_token.clone(), session.trip().result_index)
        };

        let outcome = match self.inventory.fetch_seat_layout(&token, index).await {
            Ok(raw) => normalize(&raw, &self.normalizer).map_err(|e| {
                tracing::warn!(session_id = %id, error = %e, "Seat layout rejected");
                e.to_string()
            }),
            Err(e) => {
                tracing::error!(session_id = %id, error = %e, "Seat layout fetch failed");
                Err(e.to_string())
            }
        };

        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&id)?;
        match session.install_layout(ticket, outcome) {
            Err(SessionError::StaleLayout { got, current }) => {
                tracing::debug!(session_id = %id, got, current, "Discarding stale seat layout");
            }
            other => other?,
        }
        Ok(session.view(&self.fare))
    }

    pub async fn view(&self, id: Uuid) -> Result<SessionView, CheckoutError> {
        let sessions = self.sessions.lock().await;
        Ok(sessions.get(&id)?.view(&self.fare))
    }

    /// Seats of the loaded layout matching `filter`, in `order`.
    pub async fn seats(
        &self,
        id: Uuid,
        filter: &SeatFilter,
        order: SeatOrder,
        descending: bool,
    ) -> Result<Vec<Seat>, CheckoutError> {
        let sessions = self.sessions.lock().await;
        let layout = sessions.get(&id)?.layout()?;
        Ok(layout.sorted(filter, order, descending).into_iter().cloned().collect())
    }

    pub async fn toggle_seat(&self, id: Uuid, seat: &str) -> Result<(ToggleOutcome, SessionView), CheckoutError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&id)?;
        let outcome = session.toggle_seat(seat);
        if outcome == ToggleOutcome::Ignored {
            tracing::debug!(session_id = %id, seat, "Ignored seat toggle");
        }
        Ok((outcome, session.view(&self.fare)))
    }

    pub async fn clear_selection(&self, id: Uuid) -> Result<SessionView, CheckoutError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&id)?;
        session.clear_selection();
        Ok(session.view(&self.fare))
    }

    pub async fn choose_points(
        &self,
        id: Uuid,
        boarding: Option<&str>,
        dropping: Option<&str>,
    ) -> Result<SessionView, CheckoutError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&id)?;
        session.choose_points(boarding, dropping)?;
        Ok(session.view(&self.fare))
    }

    pub async fn fare(&self, id: Uuid, insurance: bool) -> Result<FareBreakdown, CheckoutError> {
        let sessions = self.sessions.lock().await;
        Ok(sessions.get(&id)?.fare(&self.fare.with_insurance(insurance)))
    }

    /// Create a provider order for `amount`, which must be positive and
    /// within the single-order ceiling.
    pub async fn create_payment_order(
        &self,
        amount: Amount,
        receipt: Option<String>,
        mut notes: BTreeMap<String, String>,
    ) -> Result<PaymentOrder, CheckoutError> {
        if amount.minor() <= 0 {
            return Err(CheckoutError::InvalidPayment("amount must be positive".to_string()));
        }
        if amount > Amount::from_major(MAX_ORDER_AMOUNT) {
            return Err(CheckoutError::InvalidPayment(format!(
                "amount exceeds the {} limit",
                Amount::from_major(MAX_ORDER_AMOUNT)
            )));
        }
        let receipt = receipt.unwrap_or_else(|| format!("rcpt_{}", Utc::now().timestamp_millis()));
        notes
            .entry("booking_source".to_string())
            .or_insert_with(|| "sancharie_web".to_string());

        let order = self.payments.create_order(amount, CURRENCY_INR, &receipt, &notes).await?;
        tracing::info!(order_id = %order.id, %amount, "Payment order created");
        Ok(order)
    }

    /// Turn what the checkout widget reported into a single outcome.
    pub async fn settle_payment(&self, report: &PaymentReport) -> PaymentOutcome {
        let (order_id, payment_id, signature) =
            match (&report.order_id, &report.payment_id, &report.signature) {
                (_, None, None) => return PaymentOutcome::Cancelled,
                (Some(o), Some(p), Some(s)) => (o.as_str(), p.as_str(), s.as_str()),
                _ => {
                    return PaymentOutcome::Failed {
                        reason: "Missing required payment verification fields".to_string(),
                    }
                }
            };

        if !self.payments.verify_signature(order_id, payment_id, signature) {
            tracing::warn!(order_id, payment_id, "Payment signature mismatch");
            return PaymentOutcome::Failed {
                reason: "Invalid payment signature".to_string(),
            };
        }

        let (status, method) = match self.payments.fetch_payment(payment_id).await {
            Ok(details) => (details.status, details.method),
            Err(e) => {
                tracing::warn!(payment_id, error = %e, "Could not fetch payment details");
                ("captured".to_string(), None)
            }
        };
        tracing::info!(order_id, payment_id, %status, "Payment verified");
        PaymentOutcome::Verified {
            order_id: order_id.to_string(),
            payment_id: payment_id.to_string(),
            status,
            method,
        }
    }

    /// Validation gate, payment settlement, provider booking, then the
    /// stored record. Only a verified payment marks the booking paid; a
    /// dismissed or absent one leaves it pending and a failed one rejects
    /// the booking. The selection is only cleared once the booking is stored.
    pub async fn submit_booking(
        &self,
        id: Uuid,
        user: &BookingUser,
        passengers: Vec<Passenger>,
        payment: Option<PaymentReport>,
        insurance: bool,
    ) -> Result<Booking, CheckoutError> {
        let (submission, mut record) = {
            let sessions = self.sessions.lock().await;
            let session = sessions.get(&id)?;
            session.validate()?;
            check_passengers(session, &passengers)?;
            warn_gender_mismatch(session, &passengers);

            let fare = session.fare(&self.fare.with_insurance(insurance));
            let trip = session.trip();
            let (boarding, dropping) = match (session.boarding_point(), session.dropping_point()) {
                (Some(b), Some(d)) => (b.clone(), d.clone()),
                (None, _) => return Err(SelectionError::MissingBoardingPoint.into()),
                (_, None) => return Err(SelectionError::MissingDroppingPoint.into()),
            };

            let submission = BookingSubmission {
                search_token: trip.search_token.clone(),
                result_index: trip.result_index,
                boarding_point_id: boarding.id.clone(),
                dropping_point_id: dropping.id.clone(),
                passengers: passengers.clone(),
            };
            let record = NewBooking {
                user_id: user.id,
                user_phone: user.phone.clone(),
                bus_name: trip.bus_name.clone(),
                bus_type: trip.bus_type.clone(),
                source: trip.source.clone(),
                destination: trip.destination.clone(),
                journey_date: trip.journey_date,
                departure_time: trip.departure_time.clone(),
                arrival_time: trip.arrival_time.clone(),
                boarding_point: Some(boarding),
                dropping_point: Some(dropping),
                seats: session.selection().ids().map(|s| s.as_str().to_string()).collect(),
                passengers: passengers
                    .iter()
                    .map(|p| PassengerRecord {
                        name: p.name.clone(),
                        age: p.age,
                        gender: p.gender,
                        seat_number: p.seat_name.clone(),
                    })
                    .collect(),
                search_token: Some(trip.search_token.clone()),
                external_booking_id: None,
                ticket_no: None,
                pnr: None,
                base_fare: fare.base_fare,
                service_tax: fare.gst,
                total_fare: fare.total,
                payment_status: PaymentStatus::Pending,
                payment_id: None,
                payment_method: None,
                status: BookingStatus::Pending,
            };
            (submission, record)
        };

        let settled = match &payment {
            Some(report) => self.settle_payment(report).await,
            None => PaymentOutcome::Cancelled,
        };
        match settled {
            PaymentOutcome::Verified {
                payment_id, method, ..
            } => {
                record.payment_status = PaymentStatus::Completed;
                record.payment_id = Some(payment_id);
                record.payment_method = method;
            }
            PaymentOutcome::Failed { reason } => {
                tracing::warn!(session_id = %id, %reason, "Booking refused, payment not verified");
                return Err(CheckoutError::PaymentRejected(reason));
            }
            PaymentOutcome::Cancelled => {}
        }

        let confirmation = self.inventory.submit_booking(&submission).await.map_err(|e| {
            tracing::error!(session_id = %id, error = %e, "Provider booking failed");
            e
        })?;

        record.external_booking_id = Some(confirmation.booking_id.clone());
        record.ticket_no = confirmation.ticket_no.clone();
        record.pnr = confirmation.pnr.clone();
        record.status = BookingStatus::Confirmed;
        let booking = self.bookings.create(record).await?;

        if let Ok(session) = self.sessions.lock().await.get_mut(&id) {
            session.complete_booking();
        }
        tracing::info!(
            booking_id = %booking.id,
            reference = %booking.booking_reference,
            provider_booking = %confirmation.booking_id,
            "Booking confirmed"
        );
        Ok(booking)
    }

    /// Cancel with the provider when the booking reached it, then mark the
    /// stored record.
    pub async fn cancel_booking(&self, user_id: Uuid, booking_id: Uuid, reason: &str) -> Result<Booking, CheckoutError> {
        let booking = self
            .bookings
            .get_for_user(user_id, booking_id)
            .await?
            .ok_or(RepositoryError::NotFound("Booking"))?;
        if !booking.is_cancellable() {
            return Err(RepositoryError::Conflict(format!(
                "booking is already {}",
                booking.status().as_str()
            ))
            .into());
        }

        let details = &booking.details;
        if let (Some(external), Some(token)) = (&details.external_booking_id, &details.search_token) {
            let request = CancellationRequest {
                search_token: token.clone(),
                booking_id: external.clone(),
                seat_id: details.seats.first().cloned().unwrap_or_default(),
                remarks: reason.to_string(),
            };
            let receipt = self.inventory.cancel_booking(&request).await?;
            tracing::info!(booking_id = %booking.id, trace_id = ?receipt.trace_id, "Provider cancellation accepted");
        }

        Ok(self.bookings.mark_cancelled(booking.id, reason).await?)
    }
}

/// Exactly one passenger per selected seat.
fn check_passengers(session: &BookingSession, passengers: &[Passenger]) -> Result<(), CheckoutError> {
    let selection = session.selection();
    if passengers.len() != selection.len() {
        return Err(CheckoutError::PassengerMismatch(format!(
            "{} passengers for {} seats",
            passengers.len(),
            selection.len()
        )));
    }
    let mut seen = BTreeSet::new();
    for passenger in passengers {
        if passenger.name.trim().is_empty() || passenger.age == 0 {
            return Err(CheckoutError::PassengerMismatch(format!(
                "incomplete details for seat {}",
                passenger.seat_name
            )));
        }
        if !selection.contains(&passenger.seat_name) {
            return Err(CheckoutError::PassengerMismatch(format!(
                "seat {} is not selected",
                passenger.seat_name
            )));
        }
        if !seen.insert(passenger.seat_name.as_str()) {
            return Err(CheckoutError::PassengerMismatch(format!(
                "seat {} assigned twice",
                passenger.seat_name
            )));
        }
    }
    Ok(())
}

fn warn_gender_mismatch(session: &BookingSession, passengers: &[Passenger]) {
    let Ok(layout) = session.layout() else {
        return;
    };
    for passenger in passengers {
        let Some(seat) = layout.seat(&passenger.seat_name) else {
            continue;
        };
        let mismatch = matches!(
            (seat.gender, passenger.gender),
            (GenderRestriction::FemaleOnly, Gender::Male | Gender::Other)
                | (GenderRestriction::MaleOnly, Gender::Female)
        );
        if mismatch {
            tracing::warn!(seat = %passenger.seat_name, restriction = ?seat.gender, "Passenger gender differs from seat restriction");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sancharie_core::memory::MemoryBookingRepository;
    use sancharie_core::mocks::{FakePaymentGateway, StaticInventory};
    use sancharie_shared::PhoneNumber;
    use std::time::Duration;

    struct Fixture {
        inventory: Arc<StaticInventory>,
        bookings: Arc<MemoryBookingRepository>,
        payments: Arc<FakePaymentGateway>,
        checkout: CheckoutOrchestrator,
    }

    fn fixture() -> Fixture {
        let inventory = StaticInventory::with_sample_layout();
        let bookings = Arc::new(MemoryBookingRepository::new());
        let payments = Arc::new(FakePaymentGateway::new("secret"));
        let sessions = Arc::new(Mutex::new(SessionManager::new(Duration::from_secs(1800))));
        let checkout = CheckoutOrchestrator::new(inventory.clone(), payments.clone(), bookings.clone(), sessions);
        Fixture {
            inventory,
            bookings,
            payments,
            checkout,
        }
    }

    fn trip() -> TripContext {
        TripContext {
            search_token: "search-token".into(),
            result_index: 1,
            bus_name: "Sancharie Express".into(),
            bus_type: "A/C Sleeper (2+1)".into(),
            source: "Bengaluru".into(),
            destination: "Hyderabad".into(),
            journey_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            departure_time: None,
            arrival_time: None,
        }
    }

    fn user() -> BookingUser {
        BookingUser {
            id: Uuid::new_v4(),
            phone: PhoneNumber::parse("9876543210").unwrap(),
        }
    }

    fn passenger(seat: &str, gender: Gender) -> Passenger {
        Passenger {
            name: "Asha Rao".into(),
            age: 29,
            gender,
            seat_name: seat.into(),
            email: None,
            phone: None,
        }
    }

    async fn ready_session(f: &Fixture) -> Uuid {
        let view = f.checkout.open_session(trip(), GenderPolicy::Advisory).await.unwrap();
        f.checkout.toggle_seat(view.id, "L1").await.unwrap();
        f.checkout.toggle_seat(view.id, "L3").await.unwrap();
        f.checkout.choose_points(view.id, Some("b1"), Some("d1")).await.unwrap();
        view.id
    }

    #[tokio::test]
    async fn test_open_session_loads_layout() {
        let f = fixture();
        let view = f.checkout.open_session(trip(), GenderPolicy::Advisory).await.unwrap();
        assert_eq!(view.generation, 1);
        assert!(view.layout.is_some());
        assert_eq!(view.boarding_points.len(), 2);
        assert_eq!(view.fare, FareBreakdown::default());
    }

    #[tokio::test]
    async fn test_failed_layout_fetch_reports_no_seats() {
        let f = fixture();
        f.inventory.fail_layout(true);
        let view = f.checkout.open_session(trip(), GenderPolicy::Advisory).await.unwrap();
        assert!(view.layout.is_none());
        assert_eq!(view.layout_message.as_deref(), Some(crate::session::NO_SEATS_AVAILABLE));

        f.inventory.fail_layout(false);
        let view = f.checkout.reload_layout(view.id).await.unwrap();
        assert!(view.layout.is_some());
        assert_eq!(view.generation, 2);
    }

    #[tokio::test]
    async fn test_seat_listing_filters_and_sorts() {
        let f = fixture();
        let view = f.checkout.open_session(trip(), GenderPolicy::Advisory).await.unwrap();
        let filter = SeatFilter {
            availability: Some(sancharie_seating::Availability::Available),
            ..SeatFilter::default()
        };
        let seats = f.checkout.seats(view.id, &filter, SeatOrder::Price, true).await.unwrap();
        let names: Vec<&str> = seats.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(names.len(), 4);
        assert_eq!(names[0], "U1");
        assert!(!names.contains(&"L4"));
    }

    #[tokio::test]
    async fn test_reload_clears_selection() {
        let f = fixture();
        let id = ready_session(&f).await;
        let view = f.checkout.reload_layout(id).await.unwrap();
        assert!(view.selected_seats.is_empty());
        assert_eq!(view.fare.seat_count, 0);
    }

    #[tokio::test]
    async fn test_selection_gate_runs_first() {
        let f = fixture();
        let view = f.checkout.open_session(trip(), GenderPolicy::Advisory).await.unwrap();
        let err = f
            .checkout
            .submit_booking(view.id, &user(), vec![], None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Selection(SelectionError::IncompleteSelection)));

        f.checkout.toggle_seat(view.id, "L1").await.unwrap();
        f.checkout.toggle_seat(view.id, "L3").await.unwrap();
        let err = f
            .checkout
            .submit_booking(view.id, &user(), vec![], None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Selection(SelectionError::MissingBoardingPoint)));
        assert!(f.inventory.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_passengers_must_match_seats() {
        let f = fixture();
        let id = ready_session(&f).await;
        let err = f
            .checkout
            .submit_booking(id, &user(), vec![passenger("L1", Gender::Female)], None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::PassengerMismatch(_)));

        let err = f
            .checkout
            .submit_booking(
                id,
                &user(),
                vec![passenger("L1", Gender::Female), passenger("L2", Gender::Female)],
                None,
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::PassengerMismatch(_)));
    }

    #[tokio::test]
    async fn test_provider_error_keeps_selection() {
        let f = fixture();
        let id = ready_session(&f).await;
        f.inventory.fail_booking(true);

        let err = f
            .checkout
            .submit_booking(
                id,
                &user(),
                vec![passenger("L1", Gender::Female), passenger("L3", Gender::Male)],
                None,
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Provider(ProviderError::Rejected { .. })));

        let view = f.checkout.view(id).await.unwrap();
        assert_eq!(view.selected_seats.len(), 2);
    }

    #[tokio::test]
    async fn test_successful_booking_is_stored() {
        let f = fixture();
        let id = ready_session(&f).await;
        let user = user();
        let payment = PaymentReport {
            order_id: Some("order_000001".into()),
            payment_id: Some("pay_123".into()),
            signature: Some(f.payments.sign("order_000001", "pay_123")),
        };

        let booking = f
            .checkout
            .submit_booking(
                id,
                &user,
                vec![passenger("L1", Gender::Female), passenger("L3", Gender::Male)],
                Some(payment),
                false,
            )
            .await
            .unwrap();

        assert_eq!(booking.status(), BookingStatus::Confirmed);
        assert_eq!(booking.details.payment_status, PaymentStatus::Completed);
        assert_eq!(booking.details.payment_id.as_deref(), Some("pay_123"));
        assert_eq!(booking.details.payment_method.as_deref(), Some("upi"));
        assert_eq!(booking.details.total_fare, Amount::from_major(1700 + 85 + 60));
        assert_eq!(booking.details.seats, vec!["L1".to_string(), "L3".to_string()]);
        assert!(booking.details.external_booking_id.is_some());

        let stored = f.bookings.list_for_user(user.id, 10).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(f.checkout.view(id).await.unwrap().selected_seats.is_empty());
    }

    #[tokio::test]
    async fn test_unverified_payment_is_not_recorded_as_paid() {
        let f = fixture();
        let id = ready_session(&f).await;
        let passengers = || vec![passenger("L1", Gender::Female), passenger("L3", Gender::Male)];

        let forged = PaymentReport {
            order_id: Some("order_000001".into()),
            payment_id: Some("pay_fake".into()),
            signature: Some("not-a-signature".into()),
        };
        let err = f
            .checkout
            .submit_booking(id, &user(), passengers(), Some(forged), false)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::PaymentRejected(_)));
        assert!(f.inventory.submissions().is_empty());
        assert_eq!(f.checkout.view(id).await.unwrap().selected_seats.len(), 2);

        let bare_id = PaymentReport {
            payment_id: Some("pay_fake".into()),
            ..PaymentReport::default()
        };
        let err = f
            .checkout
            .submit_booking(id, &user(), passengers(), Some(bare_id), false)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::PaymentRejected(_)));

        let booking = f
            .checkout
            .submit_booking(id, &user(), passengers(), Some(PaymentReport::default()), false)
            .await
            .unwrap();
        assert_eq!(booking.details.payment_status, PaymentStatus::Pending);
        assert!(booking.details.payment_id.is_none());
    }

    #[tokio::test]
    async fn test_cancel_booking() {
        let f = fixture();
        let id = ready_session(&f).await;
        let user = user();
        let booking = f
            .checkout
            .submit_booking(
                id,
                &user,
                vec![passenger("L1", Gender::Female), passenger("L3", Gender::Male)],
                None,
                false,
            )
            .await
            .unwrap();

        let cancelled = f
            .checkout
            .cancel_booking(user.id, booking.id, "Plans changed")
            .await
            .unwrap();
        assert_eq!(cancelled.status(), BookingStatus::Cancelled);
        assert_eq!(f.inventory.cancellation_count(), 1);

        let err = f
            .checkout
            .cancel_booking(user.id, booking.id, "again")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Repository(RepositoryError::Conflict(_))));

        let err = f
            .checkout
            .cancel_booking(Uuid::new_v4(), booking.id, "not mine")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Repository(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_payment_order_limits() {
        let f = fixture();
        let err = f
            .checkout
            .create_payment_order(Amount::ZERO, None, BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidPayment(_)));

        let err = f
            .checkout
            .create_payment_order(Amount::from_major(MAX_ORDER_AMOUNT + 1), None, BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidPayment(_)));

        let order = f
            .checkout
            .create_payment_order(Amount::from_major(1845), None, BTreeMap::new())
            .await
            .unwrap();
        assert!(order.receipt.unwrap().starts_with("rcpt_"));
    }

    #[tokio::test]
    async fn test_settle_payment_outcomes() {
        let f = fixture();
        assert_eq!(
            f.checkout.settle_payment(&PaymentReport::default()).await,
            PaymentOutcome::Cancelled
        );

        let mut report = PaymentReport {
            order_id: Some("order_000001".into()),
            payment_id: Some("pay_abc".into()),
            signature: Some(f.payments.sign("order_000001", "pay_abc")),
        };
        assert!(f.checkout.settle_payment(&report).await.is_verified());

        report.signature = Some("tampered".into());
        assert!(matches!(
            f.checkout.settle_payment(&report).await,
            PaymentOutcome::Failed { .. }
        ));
    }
}
