use chrono::{DateTime, NaiveDate, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sancharie_seating::{Amount, StopPoint};
use sancharie_shared::PhoneNumber;

use crate::account::Gender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

macro_rules! string_enum {
    ($ty:ty { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

string_enum!(PaymentStatus {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
    Refunded => "refunded",
});

string_enum!(BookingStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Cancelled => "cancelled",
    Completed => "completed",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerRecord {
    pub name: String,
    pub age: u8,
    pub gender: Gender,
    pub seat_number: String,
}

/// Everything needed to persist a booking. Identity, reference and
/// timestamps are assigned on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub user_id: Uuid,
    pub user_phone: PhoneNumber,
    pub bus_name: String,
    pub bus_type: String,
    pub source: String,
    pub destination: String,
    pub journey_date: NaiveDate,
    #[serde(default)]
    pub departure_time: Option<String>,
    #[serde(default)]
    pub arrival_time: Option<String>,
    #[serde(default)]
    pub boarding_point: Option<StopPoint>,
    #[serde(default)]
    pub dropping_point: Option<StopPoint>,
    pub seats: Vec<String>,
    pub passengers: Vec<PassengerRecord>,
    /// Provider search token, needed again to cancel.
    #[serde(default)]
    pub search_token: Option<String>,
    #[serde(default)]
    pub external_booking_id: Option<String>,
    #[serde(default)]
    pub ticket_no: Option<String>,
    #[serde(default)]
    pub pnr: Option<String>,
    pub base_fare: Amount,
    pub service_tax: Amount,
    pub total_fare: Amount,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub status: BookingStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub booking_reference: String,
    #[serde(flatten)]
    pub details: NewBooking,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn from_new(details: NewBooking) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            booking_reference: generate_reference(now),
            details,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> BookingStatus {
        self.details.status
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(self.details.status, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

/// `SAN` + epoch milliseconds + four uppercase alphanumerics.
pub fn generate_reference(at: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(4)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect();
    format!("SAN{}{}", at.timestamp_millis(), suffix)
}
