//! Parse boundary between the inventory provider's loosely typed seat
//! payload and the strict [`SeatRecord`] the normalizer works with.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::amount::Amount;
use crate::LayoutError;

/// Highest per-seat fare accepted from a provider, in rupees.
pub const MAX_SEAT_PRICE_MAJOR: i64 = 1_000_000;

/// `Result.SeatLayout` as returned by the inventory provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawSeatLayout {
    #[serde(default)]
    pub seat_details: Option<Vec<Vec<RawSeat>>>,
}

impl RawSeatLayout {
    pub fn from_rows(rows: Vec<Vec<RawSeat>>) -> Self {
        Self {
            seat_details: Some(rows),
        }
    }

    pub fn rows(&self) -> &[Vec<RawSeat>] {
        self.seat_details.as_deref().unwrap_or(&[])
    }

    pub fn record_count(&self) -> usize {
        self.rows().iter().map(Vec::len).sum()
    }
}

/// One provider seat record. Every field is optional and loosely typed on
/// the wire; validation happens in [`SeatRecord::parse`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawSeat {
    #[serde(default)]
    pub seat_name: Option<Value>,
    #[serde(default)]
    pub seat_type: Option<Value>,
    #[serde(default)]
    pub seat_status: Option<Value>,
    #[serde(default)]
    pub is_upper: Option<Value>,
    #[serde(default)]
    pub is_ladies_seat: Option<Value>,
    #[serde(default)]
    pub is_males_seat: Option<Value>,
    #[serde(default)]
    pub seat_fare: Option<Value>,
    #[serde(default)]
    pub price: Option<RawSeatPrice>,
    #[serde(default)]
    pub row_no: Option<Value>,
    #[serde(default)]
    pub column_no: Option<Value>,
    #[serde(default)]
    pub seat_index: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawSeatPrice {
    #[serde(default)]
    pub published_price: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deck {
    Lower,
    Upper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatClass {
    Seater,
    Sleeper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenderRestriction {
    None,
    FemaleOnly,
    MaleOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Booked,
}

/// A validated seat record, still in provider row order.
#[derive(Debug, Clone, PartialEq)]
pub struct SeatRecord {
    pub name: String,
    pub deck: Deck,
    pub class: SeatClass,
    pub gender: GenderRestriction,
    pub availability: Availability,
    pub price: Amount,
    pub row: Option<usize>,
    pub column: Option<usize>,
}

impl SeatRecord {
    /// Validate one raw record. `row`/`position` locate it in the provider
    /// payload for error messages only.
    pub fn parse(raw: &RawSeat, row: usize, position: usize) -> Result<Self, LayoutError> {
        let at = |what: &str| {
            LayoutError::MalformedLayout(format!("{} (row {}, record {})", what, row, position))
        };

        let name = match &raw.seat_name {
            None => String::new(),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(_) => return Err(at("SeatName is not a string")),
        };

        let class = match raw.seat_type.as_ref().and_then(Value::as_u64) {
            Some(1) => SeatClass::Seater,
            Some(2) => SeatClass::Sleeper,
            _ => return Err(at("SeatType must be 1 (seater) or 2 (sleeper)")),
        };

        let availability = match &raw.seat_status {
            Some(Value::Bool(true)) => Availability::Available,
            Some(Value::Bool(false)) => Availability::Booked,
            _ => return Err(at("SeatStatus must be a boolean")),
        };

        let deck = match optional_flag(&raw.is_upper).ok_or_else(|| at("IsUpper must be a boolean"))? {
            true => Deck::Upper,
            false => Deck::Lower,
        };

        let ladies = optional_flag(&raw.is_ladies_seat)
            .ok_or_else(|| at("IsLadiesSeat must be a boolean"))?;
        let males = optional_flag(&raw.is_males_seat)
            .ok_or_else(|| at("IsMalesSeat must be a boolean"))?;
        let gender = match (ladies, males) {
            (false, false) => GenderRestriction::None,
            (true, false) => GenderRestriction::FemaleOnly,
            (false, true) => GenderRestriction::MaleOnly,
            (true, true) => return Err(at("seat is flagged both ladies-only and male-only")),
        };

        let fare = price_value(&raw.seat_fare).ok_or_else(|| at("SeatFare is not a non-negative number"))?;
        let published = price_value(&raw.price.as_ref().and_then(|p| p.published_price.clone()))
            .ok_or_else(|| at("Price.PublishedPrice is not a non-negative number"))?;
        let price = if fare.is_zero() { published } else { fare };
        if price > Amount::from_major(MAX_SEAT_PRICE_MAJOR) {
            return Err(at("seat price exceeds the accepted maximum"));
        }

        let row_index = grid_index(&raw.row_no).ok_or_else(|| at("RowNo is not a grid index"))?;
        let column_index = grid_index(&raw.column_no).ok_or_else(|| at("ColumnNo is not a grid index"))?;

        Ok(Self {
            name,
            deck,
            class,
            gender,
            availability,
            price,
            row: row_index,
            column: column_index,
        })
    }

    pub fn has_coordinates(&self) -> bool {
        self.row.is_some() && self.column.is_some()
    }

    pub fn is_available(&self) -> bool {
        self.availability == Availability::Available
    }
}

/// Missing or null reads as `false`; anything but a boolean is rejected.
fn optional_flag(value: &Option<Value>) -> Option<bool> {
    match value {
        None | Some(Value::Null) => Some(false),
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => None,
    }
}

fn price_value(value: &Option<Value>) -> Option<Amount> {
    match value {
        None | Some(Value::Null) => Some(Amount::ZERO),
        Some(Value::Number(n)) => n.as_f64().and_then(Amount::from_decimal),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().and_then(Amount::from_decimal),
        Some(_) => None,
    }
}

/// `Some(None)` when absent, `Some(Some(i))` for an integer or a digit
/// string such as `"002"`, `None` when present but unusable.
fn grid_index(value: &Option<Value>) -> Option<Option<usize>> {
    match value {
        None | Some(Value::Null) => Some(None),
        Some(Value::Number(n)) => n.as_u64().and_then(|i| usize::try_from(i).ok()).map(Some),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            s.parse::<usize>().ok().map(Some)
        }
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawSeat {
        serde_json::from_value(value).expect("raw seat")
    }

    #[test]
    fn test_parse_full_record() {
        let seat = raw(json!({
            "SeatName": "L1",
            "SeatType": 2,
            "SeatStatus": true,
            "IsUpper": false,
            "IsLadiesSeat": true,
            "IsMalesSeat": null,
            "SeatFare": 1250.5,
            "RowNo": "000",
            "ColumnNo": "002"
        }));
        let record = SeatRecord::parse(&seat, 0, 0).unwrap();
        assert_eq!(record.name, "L1");
        assert_eq!(record.class, SeatClass::Sleeper);
        assert_eq!(record.deck, Deck::Lower);
        assert_eq!(record.gender, GenderRestriction::FemaleOnly);
        assert_eq!(record.availability, Availability::Available);
        assert_eq!(record.price, Amount::from_minor(125_050));
        assert_eq!((record.row, record.column), (Some(0), Some(2)));
    }

    #[test]
    fn test_published_price_fallback() {
        let seat = raw(json!({
            "SeatName": "U4", "SeatType": 1, "SeatStatus": false, "IsUpper": true,
            "SeatFare": 0, "Price": { "PublishedPrice": 900 }
        }));
        let record = SeatRecord::parse(&seat, 1, 3).unwrap();
        assert_eq!(record.price, Amount::from_major(900));
        assert_eq!(record.deck, Deck::Upper);
        assert!(!record.has_coordinates());
    }

    #[test]
    fn test_rejects_bad_type_and_status() {
        let bad_type = raw(json!({ "SeatName": "A", "SeatType": 3, "SeatStatus": true }));
        assert!(SeatRecord::parse(&bad_type, 0, 0).is_err());

        let bad_status = raw(json!({ "SeatName": "A", "SeatType": 1, "SeatStatus": "yes" }));
        assert!(SeatRecord::parse(&bad_status, 0, 0).is_err());

        let missing_status = raw(json!({ "SeatName": "A", "SeatType": 1 }));
        assert!(SeatRecord::parse(&missing_status, 0, 0).is_err());
    }

    #[test]
    fn test_rejects_bad_deck_price_and_coordinates() {
        let bad_deck = raw(json!({ "SeatName": "A", "SeatType": 1, "SeatStatus": true, "IsUpper": "U" }));
        assert!(SeatRecord::parse(&bad_deck, 0, 0).is_err());

        let negative = raw(json!({ "SeatName": "A", "SeatType": 1, "SeatStatus": true, "SeatFare": -5 }));
        assert!(SeatRecord::parse(&negative, 0, 0).is_err());

        let bad_row = raw(json!({ "SeatName": "A", "SeatType": 1, "SeatStatus": true, "RowNo": "1a", "ColumnNo": 0 }));
        assert!(SeatRecord::parse(&bad_row, 0, 0).is_err());

        let overflow = raw(json!({
            "SeatName": "A", "SeatType": 1, "SeatStatus": true,
            "RowNo": "99999999999999999999999", "ColumnNo": 0
        }));
        assert!(SeatRecord::parse(&overflow, 0, 0).is_err());

        let fractional = raw(json!({ "SeatName": "A", "SeatType": 1, "SeatStatus": true, "RowNo": 1.5, "ColumnNo": 0 }));
        assert!(SeatRecord::parse(&fractional, 0, 0).is_err());
    }

    #[test]
    fn test_rejects_absurd_price() {
        let huge = raw(json!({ "SeatName": "A", "SeatType": 1, "SeatStatus": true, "SeatFare": 1.0e14 }));
        let err = SeatRecord::parse(&huge, 0, 0).unwrap_err();
        assert!(err.to_string().contains("maximum"));

        let published = raw(json!({
            "SeatName": "A", "SeatType": 1, "SeatStatus": true,
            "SeatFare": 0, "Price": { "PublishedPrice": "1e14" }
        }));
        assert!(SeatRecord::parse(&published, 0, 0).is_err());

        let ceiling = raw(json!({ "SeatName": "A", "SeatType": 1, "SeatStatus": true, "SeatFare": 1_000_000 }));
        assert!(SeatRecord::parse(&ceiling, 0, 0).is_ok());
    }

    #[test]
    fn test_rejects_conflicting_gender_flags() {
        let both = raw(json!({
            "SeatName": "A", "SeatType": 1, "SeatStatus": true,
            "IsLadiesSeat": true, "IsMalesSeat": true
        }));
        let err = SeatRecord::parse(&both, 2, 1).unwrap_err();
        assert!(err.to_string().contains("row 2, record 1"));
    }

    #[test]
    fn test_missing_seat_details_is_empty() {
        let layout: RawSeatLayout = serde_json::from_value(json!({ "SeatDetails": null })).unwrap();
        assert!(layout.rows().is_empty());
        assert_eq!(layout.record_count(), 0);
    }
}
