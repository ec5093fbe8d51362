use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use sancharie_seating::{Amount, RawSeatLayout, StopPoint};

use crate::account::Gender;
use crate::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusSearchQuery {
    pub origin_id: String,
    pub destination_id: String,
    pub date: NaiveDate,
}

/// One bus offered for a route and date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusSummary {
    pub result_index: i64,
    pub travel_name: String,
    pub bus_type: String,
    pub departure_time: Option<String>,
    pub arrival_time: Option<String>,
    pub available_seats: Option<u32>,
    pub price: Amount,
    pub boarding_points: Vec<StopPoint>,
    pub dropping_points: Vec<StopPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    /// Opaque token the provider requires on every follow-up call.
    pub search_token: String,
    pub buses: Vec<BusSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointLists {
    pub boarding: Vec<StopPoint>,
    pub dropping: Vec<StopPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passenger {
    pub name: String,
    pub age: u8,
    pub gender: Gender,
    pub seat_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Passenger {
    /// Split into provider first/last name. A single word is used for both.
    pub fn split_name(&self) -> (String, String) {
        let mut words = self.name.split_whitespace();
        let first = words.next().unwrap_or_default().to_string();
        let rest = words.collect::<Vec<_>>().join(" ");
        let last = if rest.is_empty() { first.clone() } else { rest };
        (first, last)
    }

    pub fn title(&self) -> &'static str {
        match self.gender {
            Gender::Female => "Ms",
            Gender::Male | Gender::Other => "Mr",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSubmission {
    pub search_token: String,
    pub result_index: i64,
    pub boarding_point_id: String,
    pub dropping_point_id: String,
    /// First passenger is the lead passenger.
    pub passengers: Vec<Passenger>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub booking_id: String,
    pub ticket_no: Option<String>,
    pub pnr: Option<String>,
    pub status: Option<String>,
    pub invoice_number: Option<String>,
    pub invoice_amount: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationRequest {
    pub search_token: String,
    pub booking_id: String,
    pub seat_id: String,
    pub remarks: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationReceipt {
    pub status: Option<i64>,
    pub trace_id: Option<String>,
}

/// The third-party bus inventory API.
#[async_trait]
pub trait InventoryProvider: Send + Sync {
    /// A provider "no results" answer is an empty list, not an error.
    async fn search_buses(&self, query: &BusSearchQuery) -> Result<SearchResults, ProviderError>;

    async fn fetch_seat_layout(
        &self,
        search_token: &str,
        result_index: i64,
    ) -> Result<RawSeatLayout, ProviderError>;

    async fn fetch_boarding_dropping_points(
        &self,
        search_token: &str,
        result_index: i64,
    ) -> Result<PointLists, ProviderError>;

    async fn submit_booking(
        &self,
        submission: &BookingSubmission,
    ) -> Result<BookingConfirmation, ProviderError>;

    async fn cancel_booking(
        &self,
        request: &CancellationRequest,
    ) -> Result<CancellationReceipt, ProviderError>;
}
