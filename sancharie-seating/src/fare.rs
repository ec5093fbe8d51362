use serde::{Deserialize, Serialize};

use crate::amount::{Amount, Rate, MINOR_PER_MAJOR};
use crate::grid::Seat;

/// Fare rules applied to a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FareConfig {
    /// Applied to the base fare before tax.
    pub discount_rate: Rate,

    /// GST on the discounted base, rounded to whole rupees.
    pub gst_rate: Rate,

    pub service_charge_per_seat: Amount,

    pub insurance_per_seat: Amount,

    /// Travel insurance is opt-in per booking.
    pub include_insurance: bool,
}

impl Default for FareConfig {
    fn default() -> Self {
        Self {
            discount_rate: Rate::ZERO,
            gst_rate: Rate::from_basis_points(500),
            service_charge_per_seat: Amount::from_major(30),
            insurance_per_seat: Amount::from_major(24),
            include_insurance: false,
        }
    }
}

impl FareConfig {
    pub fn with_insurance(mut self, include: bool) -> Self {
        self.include_insurance = include;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FareBreakdown {
    pub base_fare: Amount,
    pub discount: Amount,
    pub gst: Amount,
    pub service_charge: Amount,
    pub insurance: Amount,
    pub total: Amount,
    pub seat_count: usize,
    pub per_seat_average: Amount,
}

/// Price a set of seats. Pure: same seats and config, same breakdown.
pub fn compute_fare<'a, I>(seats: I, config: &FareConfig) -> FareBreakdown
where
    I: IntoIterator<Item = &'a Seat>,
{
    let (seat_count, base_fare) = seats
        .into_iter()
        .fold((0usize, Amount::ZERO), |(n, sum), seat| (n + 1, sum + seat.price));

    if seat_count == 0 {
        return FareBreakdown::default();
    }

    let discount = config.discount_rate.apply(base_fare, 1);
    let taxable = base_fare - discount;
    let gst = config.gst_rate.apply(taxable, MINOR_PER_MAJOR);
    let service_charge = config.service_charge_per_seat * seat_count;
    let insurance = if config.include_insurance {
        config.insurance_per_seat * seat_count
    } else {
        Amount::ZERO
    };
    let total = taxable + gst + service_charge + insurance;

    FareBreakdown {
        base_fare,
        discount,
        gst,
        service_charge,
        insurance,
        total,
        seat_count,
        per_seat_average: total.div_round(seat_count),
    }
}
