use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sancharie_core::inventory::BusSummary;
use sancharie_seating::{FareBreakdown, SeatId, SeatLayout, SeatStatistics, StopPoint};
use sancharie_shared::PhoneNumber;

/// The bus a booking session is for, as chosen from search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripContext {
    pub search_token: String,
    pub result_index: i64,
    pub bus_name: String,
    pub bus_type: String,
    pub source: String,
    pub destination: String,
    pub journey_date: NaiveDate,
    #[serde(default)]
    pub departure_time: Option<String>,
    #[serde(default)]
    pub arrival_time: Option<String>,
}

impl TripContext {
    pub fn from_search(
        search_token: &str,
        bus: &BusSummary,
        source: &str,
        destination: &str,
        journey_date: NaiveDate,
    ) -> Self {
        Self {
            search_token: search_token.to_string(),
            result_index: bus.result_index,
            bus_name: bus.travel_name.clone(),
            bus_type: bus.bus_type.clone(),
            source: source.to_string(),
            destination: destination.to_string(),
            journey_date,
            departure_time: bus.departure_time.clone(),
            arrival_time: bus.arrival_time.clone(),
        }
    }
}

/// Snapshot of a booking session for rendering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: Uuid,
    pub generation: u64,
    pub trip: TripContext,
    pub layout: Option<SeatLayout>,
    /// Set when no layout could be shown.
    pub layout_message: Option<String>,
    pub statistics: Option<SeatStatistics>,
    pub selected_seats: Vec<SeatId>,
    pub boarding_points: Vec<StopPoint>,
    pub dropping_points: Vec<StopPoint>,
    pub boarding_point: Option<StopPoint>,
    pub dropping_point: Option<StopPoint>,
    pub fare: FareBreakdown,
}

/// The authenticated account a booking is made for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingUser {
    pub id: Uuid,
    pub phone: PhoneNumber,
}

/// What the checkout widget reported back. Both ids and the signature are
/// absent when the user dismissed it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PaymentReport {
    #[serde(rename = "razorpay_order_id", default)]
    pub order_id: Option<String>,
    #[serde(rename = "razorpay_payment_id", default)]
    pub payment_id: Option<String>,
    #[serde(rename = "razorpay_signature", default)]
    pub signature: Option<String>,
}
