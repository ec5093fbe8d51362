//! Client for the bus inventory REST API.
//!
//! Every call is a JSON POST under `/busservice/rest/` authenticated with
//! `Username`/`Password` headers. Responses carry an `Error` object whose
//! non-zero `ErrorCode` means the call failed.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use sancharie_core::account::Gender;
use sancharie_core::inventory::{
    BookingConfirmation, BookingSubmission, BusSearchQuery, BusSummary, CancellationReceipt,
    CancellationRequest, InventoryProvider, Passenger, PointLists, SearchResults,
};
use sancharie_core::ProviderError;
use sancharie_seating::{Amount, RawSeatLayout, StopPoint};
use sancharie_shared::Masked;

/// Search answers with this code when a route has no buses.
const NO_RESULTS: i64 = 1;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    pub base_url: String,
    pub username: String,
    pub password: Masked<String>,
    /// Sent as `UserIp` on every request.
    pub user_ip: String,
    pub timeout_secs: u64,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            password: Masked::new(String::new()),
            user_ip: "127.0.0.1".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Envelope<T> {
    #[serde(default)]
    error: Option<ErrorBody>,
    #[serde(default = "Option::default")]
    result: Option<T>,
    #[serde(default, alias = "TokenId", alias = "Token")]
    search_token_id: Option<String>,
}

impl<T> Envelope<T> {
    /// Non-zero error codes become `Rejected`, except those in `tolerated`.
    fn check(&self, tolerated: &[i64]) -> Result<(), ProviderError> {
        match &self.error {
            Some(e) if e.error_code != 0 && !tolerated.contains(&e.error_code) => Err(ProviderError::Rejected {
                code: e.error_code,
                message: e.error_message.clone().unwrap_or_else(|| "request failed".to_string()),
            }),
            _ => Ok(()),
        }
    }

    fn into_result(self, what: &str) -> Result<T, ProviderError> {
        self.check(&[])?;
        self.result
            .ok_or_else(|| ProviderError::Decode(format!("{} response has no Result", what)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPoint {
    city_point_index: Value,
    #[serde(default)]
    city_point_name: String,
    #[serde(default)]
    city_point_time: Option<String>,
    #[serde(default)]
    city_point_location: Option<String>,
    #[serde(default)]
    city_point_address: Option<String>,
    #[serde(default)]
    city_point_landmark: Option<String>,
    #[serde(default)]
    city_point_contact_number: Option<String>,
}

impl RawPoint {
    fn into_stop(self) -> StopPoint {
        StopPoint {
            id: value_to_string(&self.city_point_index),
            name: self.city_point_name,
            time: self.city_point_time,
            location: self.city_point_location,
            address: self.city_point_address,
            landmark: self.city_point_landmark,
            contact_number: self.city_point_contact_number,
        }
    }
}

fn stops(points: Vec<RawPoint>) -> Vec<StopPoint> {
    points.into_iter().map(RawPoint::into_stop).collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawBusPrice {
    #[serde(default)]
    published_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawBus {
    result_index: i64,
    #[serde(default)]
    travel_name: String,
    #[serde(default)]
    bus_type: String,
    #[serde(default)]
    departure_time: Option<String>,
    #[serde(default)]
    arrival_time: Option<String>,
    #[serde(default)]
    available_seats: Option<u32>,
    #[serde(default)]
    bus_price: RawBusPrice,
    #[serde(default)]
    boarding_points_details: Vec<RawPoint>,
    #[serde(default)]
    dropping_points_details: Vec<RawPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawLayoutResult {
    #[serde(default)]
    seat_layout: RawSeatLayout,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPointsResult {
    #[serde(default)]
    boarding_points_details: Vec<RawPoint>,
    #[serde(default)]
    dropping_points_details: Vec<RawPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawBookResult {
    #[serde(rename = "BookingID", alias = "BookingId")]
    booking_id: Value,
    #[serde(default)]
    ticket_no: Option<String>,
    #[serde(default, rename = "TravelOperatorPNR")]
    travel_operator_pnr: Option<String>,
    #[serde(default)]
    booking_status: Option<String>,
    #[serde(default)]
    invoice_number: Option<String>,
    #[serde(default)]
    invoice_amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawCancelResult {
    #[serde(default)]
    error: Option<ErrorBody>,
    #[serde(default)]
    response_status: Option<i64>,
    #[serde(default)]
    trace_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CancelEnvelope {
    send_change_request_result: Option<RawCancelResult>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PassengerBody {
    lead_passenger: bool,
    title: &'static str,
    first_name: String,
    last_name: String,
    email: String,
    phoneno: String,
    /// "1" male, "2" otherwise.
    gender: &'static str,
    id_type: Option<String>,
    id_number: Option<String>,
    address: String,
    age: String,
    seat_name: String,
}

impl PassengerBody {
    fn new(index: usize, passenger: &Passenger) -> Self {
        let (first_name, last_name) = passenger.split_name();
        Self {
            lead_passenger: index == 0,
            title: passenger.title(),
            first_name,
            last_name,
            email: passenger.email.clone().unwrap_or_default(),
            phoneno: passenger.phone.clone().unwrap_or_default(),
            gender: if passenger.gender == Gender::Male { "1" } else { "2" },
            id_type: None,
            id_number: None,
            address: String::new(),
            age: passenger.age.to_string(),
            seat_name: passenger.seat_name.clone(),
        }
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn decode<T: DeserializeOwned>(body: &str, what: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::Decode(format!("{}: {}", what, e)))
}

pub fn parse_search(body: &str) -> Result<SearchResults, ProviderError> {
    let envelope: Envelope<Vec<RawBus>> = decode(body, "search")?;
    envelope.check(&[NO_RESULTS])?;
    let buses = envelope
        .result
        .unwrap_or_default()
        .into_iter()
        .map(|bus| BusSummary {
            result_index: bus.result_index,
            travel_name: bus.travel_name,
            bus_type: bus.bus_type,
            departure_time: bus.departure_time,
            arrival_time: bus.arrival_time,
            available_seats: bus.available_seats,
            price: bus
                .bus_price
                .published_price
                .and_then(Amount::from_decimal)
                .unwrap_or(Amount::ZERO),
            boarding_points: stops(bus.boarding_points_details),
            dropping_points: stops(bus.dropping_points_details),
        })
        .collect();
    Ok(SearchResults {
        search_token: envelope.search_token_id.unwrap_or_default(),
        buses,
    })
}

pub fn parse_seat_layout(body: &str) -> Result<RawSeatLayout, ProviderError> {
    let envelope: Envelope<RawLayoutResult> = decode(body, "seat layout")?;
    Ok(envelope.into_result("seat layout")?.seat_layout)
}

pub fn parse_points(body: &str) -> Result<PointLists, ProviderError> {
    let envelope: Envelope<RawPointsResult> = decode(body, "boarding points")?;
    let result = envelope.into_result("boarding points")?;
    Ok(PointLists {
        boarding: stops(result.boarding_points_details),
        dropping: stops(result.dropping_points_details),
    })
}

pub fn parse_booking(body: &str) -> Result<BookingConfirmation, ProviderError> {
    let envelope: Envelope<RawBookResult> = decode(body, "book")?;
    let result = envelope.into_result("book")?;
    let booking_id = value_to_string(&result.booking_id);
    if booking_id.is_empty() {
        return Err(ProviderError::Decode("book response has no BookingID".to_string()));
    }
    Ok(BookingConfirmation {
        booking_id,
        ticket_no: result.ticket_no,
        pnr: result.travel_operator_pnr,
        status: result.booking_status,
        invoice_number: result.invoice_number,
        invoice_amount: result.invoice_amount.and_then(Amount::from_decimal),
    })
}

pub fn parse_cancellation(body: &str) -> Result<CancellationReceipt, ProviderError> {
    let envelope: CancelEnvelope = decode(body, "cancel")?;
    let result = envelope
        .send_change_request_result
        .ok_or_else(|| ProviderError::Decode("cancel response has no SendChangeRequestResult".to_string()))?;
    match result.error {
        Some(e) if e.error_code == 0 => {}
        Some(e) => {
            return Err(ProviderError::Rejected {
                code: e.error_code,
                message: e.error_message.unwrap_or_else(|| "Cancellation failed".to_string()),
            })
        }
        None => {
            return Err(ProviderError::Rejected {
                code: -1,
                message: "Cancellation failed".to_string(),
            })
        }
    }
    Ok(CancellationReceipt {
        status: result.response_status,
        trace_id: result.trace_id,
    })
}

pub struct HttpInventoryProvider {
    config: InventoryConfig,
    client: Client,
}

impl HttpInventoryProvider {
    pub fn new(config: InventoryConfig) -> Result<Self, ProviderError> {
        if config.base_url.is_empty() {
            return Err(ProviderError::NotConfigured("Inventory API"));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self { config, client })
    }

    async fn post(&self, operation: &str, mut body: Value) -> Result<String, ProviderError> {
        body["UserIp"] = Value::String(self.config.user_ip.clone());
        let url = format!("{}/busservice/rest/{}", self.config.base_url.trim_end_matches('/'), operation);
        tracing::debug!(operation, "Calling inventory API");

        let response = self
            .client
            .post(&url)
            .header("Username", &self.config.username)
            .header("Password", self.config.password.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(operation, %status, "Inventory API returned an HTTP error");
            return Err(ProviderError::Transport(format!("HTTP {}", status)));
        }
        response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))
    }
}

#[async_trait]
impl InventoryProvider for HttpInventoryProvider {
    async fn search_buses(&self, query: &BusSearchQuery) -> Result<SearchResults, ProviderError> {
        let body = self
            .post(
                "search",
                json!({
                    "DateOfJourney": query.date.format("%Y-%m-%d").to_string(),
                    "OriginId": query.origin_id,
                    "DestinationId": query.destination_id,
                }),
            )
            .await?;
        let results = parse_search(&body)?;
        tracing::info!(count = results.buses.len(), "Bus search completed");
        Ok(results)
    }

    async fn fetch_seat_layout(&self, search_token: &str, result_index: i64) -> Result<RawSeatLayout, ProviderError> {
        let body = self
            .post(
                "seatlayout",
                json!({ "SearchTokenId": search_token, "ResultIndex": result_index }),
            )
            .await?;
        parse_seat_layout(&body)
    }

    async fn fetch_boarding_dropping_points(&self, search_token: &str, result_index: i64) -> Result<PointLists, ProviderError> {
        let body = self
            .post(
                "boardingpoint",
                json!({ "SearchTokenId": search_token, "ResultIndex": result_index }),
            )
            .await?;
        parse_points(&body)
    }

    async fn submit_booking(&self, submission: &BookingSubmission) -> Result<BookingConfirmation, ProviderError> {
        let passengers: Vec<PassengerBody> = submission
            .passengers
            .iter()
            .enumerate()
            .map(|(i, p)| PassengerBody::new(i, p))
            .collect();
        let body = self
            .post(
                "book",
                json!({
                    "SearchTokenId": submission.search_token,
                    "ResultIndex": submission.result_index,
                    "BoardingPointId": submission.boarding_point_id,
                    "DroppingPointId": submission.dropping_point_id,
                    "Passenger": passengers,
                }),
            )
            .await?;
        let confirmation = parse_booking(&body)?;
        tracing::info!(booking_id = %confirmation.booking_id, "Provider booking confirmed");
        Ok(confirmation)
    }

    async fn cancel_booking(&self, request: &CancellationRequest) -> Result<CancellationReceipt, ProviderError> {
        let body = self
            .post(
                "cancelrequest",
                json!({
                    "SearchTokenId": request.search_token,
                    "BookingId": request.booking_id,
                    "SeatId": request.seat_id,
                    "Remarks": request.remarks,
                }),
            )
            .await?;
        parse_cancellation(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_no_results_is_empty() {
        let body = r#"{ "Error": { "ErrorCode": 1, "ErrorMessage": "No result found" }, "SearchTokenId": "abc" }"#;
        let results = parse_search(body).unwrap();
        assert!(results.buses.is_empty());
        assert_eq!(results.search_token, "abc");
    }

    #[test]
    fn test_search_error_is_rejected() {
        let body = r#"{ "Error": { "ErrorCode": 3, "ErrorMessage": "Invalid origin" } }"#;
        let err = parse_search(body).unwrap_err();
        assert!(matches!(err, ProviderError::Rejected { code: 3, .. }));
    }

    #[test]
    fn test_search_maps_buses() {
        let body = r#"{
            "Error": { "ErrorCode": 0 },
            "TokenId": "tok-1",
            "Result": [{
                "ResultIndex": 4,
                "TravelName": "Orange Travels",
                "BusType": "A/C Sleeper (2+1)",
                "DepartureTime": "2026-11-02T21:30:00",
                "AvailableSeats": 18,
                "BusPrice": { "PublishedPrice": 1049.5 },
                "BoardingPointsDetails": [{ "CityPointIndex": 11, "CityPointName": "Majestic", "CityPointTime": "21:30" }],
                "DroppingPointsDetails": [{ "CityPointIndex": "d7", "CityPointName": "Ameerpet" }]
            }]
        }"#;
        let results = parse_search(body).unwrap();
        assert_eq!(results.search_token, "tok-1");
        let bus = &results.buses[0];
        assert_eq!(bus.result_index, 4);
        assert_eq!(bus.price, Amount::from_minor(104_950));
        assert_eq!(bus.boarding_points[0].id, "11");
        assert_eq!(bus.dropping_points[0].id, "d7");
    }

    #[test]
    fn test_seat_layout_extracts_raw_rows() {
        let body = r#"{
            "Error": { "ErrorCode": 0 },
            "Result": { "AvailableSeats": 1, "SeatLayout": { "SeatDetails": [[
                { "SeatName": "1", "SeatType": 1, "SeatStatus": true, "SeatFare": 500 }
            ]] } }
        }"#;
        let layout = parse_seat_layout(body).unwrap();
        assert_eq!(layout.record_count(), 1);
    }

    #[test]
    fn test_booking_requires_id() {
        let ok = r#"{ "Error": { "ErrorCode": 0 }, "Result": {
            "BookingID": 778812, "TicketNo": "TK1", "TravelOperatorPNR": "P9", "BookingStatus": "Confirmed"
        } }"#;
        let confirmation = parse_booking(ok).unwrap();
        assert_eq!(confirmation.booking_id, "778812");
        assert_eq!(confirmation.pnr.as_deref(), Some("P9"));

        let missing = r#"{ "Error": { "ErrorCode": 0 }, "Result": { "BookingID": null } }"#;
        assert!(matches!(parse_booking(missing), Err(ProviderError::Decode(_))));
    }

    #[test]
    fn test_cancellation_error_code() {
        let ok = r#"{ "SendChangeRequestResult": { "Error": { "ErrorCode": 0 }, "ResponseStatus": 1, "TraceId": "t-1" } }"#;
        let receipt = parse_cancellation(ok).unwrap();
        assert_eq!(receipt.trace_id.as_deref(), Some("t-1"));

        let rejected = r#"{ "SendChangeRequestResult": { "Error": { "ErrorCode": 5, "ErrorMessage": "Already cancelled" } } }"#;
        assert!(matches!(
            parse_cancellation(rejected),
            Err(ProviderError::Rejected { code: 5, .. })
        ));
    }

    #[test]
    fn test_passenger_body_shape() {
        let passenger = Passenger {
            name: "Ravi Kumar".into(),
            age: 40,
            gender: Gender::Male,
            seat_name: "U1".into(),
            email: None,
            phone: Some("9876543210".into()),
        };
        let body = serde_json::to_value(PassengerBody::new(0, &passenger)).unwrap();
        assert_eq!(body["LeadPassenger"], true);
        assert_eq!(body["Title"], "Mr");
        assert_eq!(body["LastName"], "Kumar");
        assert_eq!(body["Gender"], "1");
        assert_eq!(body["Age"], "40");
    }
}
