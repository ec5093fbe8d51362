use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::grid::{Seat, SeatLayout};
use crate::record::{Availability, Deck, GenderRestriction, SeatClass};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    pub min: Amount,
    pub max: Amount,
    pub average: Amount,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatStatistics {
    pub total: usize,
    pub available: usize,
    pub booked: usize,
    pub seater: usize,
    pub sleeper: usize,
    pub ladies: usize,
    pub gents: usize,
    pub upper: usize,
    pub lower: usize,
    pub price_range: PriceRange,
}

/// Criteria for narrowing the seat list. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SeatFilter {
    pub availability: Option<Availability>,
    pub class: Option<SeatClass>,
    pub deck: Option<Deck>,
    pub gender: Option<GenderRestriction>,
    pub min_price: Option<Amount>,
    pub max_price: Option<Amount>,
}

impl SeatFilter {
    pub fn matches(&self, seat: &Seat) -> bool {
        self.availability.map_or(true, |a| seat.availability == a)
            && self.class.map_or(true, |c| seat.class == c)
            && self.deck.map_or(true, |d| seat.deck == d)
            && self.gender.map_or(true, |g| seat.gender == g)
            && self.min_price.map_or(true, |p| seat.price >= p)
            && self.max_price.map_or(true, |p| seat.price <= p)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatOrder {
    #[default]
    Price,
    Name,
    Position,
}

impl SeatLayout {
    pub fn statistics(&self) -> SeatStatistics {
        let mut stats = SeatStatistics::default();
        let mut sum = Amount::ZERO;
        let mut min: Option<Amount> = None;
        let mut max = Amount::ZERO;

        for seat in self.seats() {
            stats.total += 1;
            match seat.availability {
                Availability::Available => stats.available += 1,
                Availability::Booked => stats.booked += 1,
            }
            match seat.class {
                SeatClass::Seater => stats.seater += 1,
                SeatClass::Sleeper => stats.sleeper += 1,
            }
            match seat.gender {
                GenderRestriction::FemaleOnly => stats.ladies += 1,
                GenderRestriction::MaleOnly => stats.gents += 1,
                GenderRestriction::None => {}
            }
            match seat.deck {
                Deck::Upper => stats.upper += 1,
                Deck::Lower => stats.lower += 1,
            }
            sum = sum + seat.price;
            min = Some(min.map_or(seat.price, |m| m.min(seat.price)));
            max = max.max(seat.price);
        }

        stats.price_range = PriceRange {
            min: min.unwrap_or(Amount::ZERO),
            max,
            average: sum.div_round(stats.total),
        };
        stats
    }

    pub fn filter(&self, filter: &SeatFilter) -> Vec<&Seat> {
        self.seats().filter(|s| filter.matches(s)).collect()
    }

    /// Filtered seats in the requested order; `descending` reverses it.
    pub fn sorted(&self, filter: &SeatFilter, order: SeatOrder, descending: bool) -> Vec<&Seat> {
        let mut seats = self.filter(filter);
        seats.sort_by(|a, b| {
            let ordering = match order {
                SeatOrder::Price => a.price.cmp(&b.price),
                SeatOrder::Name => a.id.cmp(&b.id),
                SeatOrder::Position => (a.deck, a.row, a.column).cmp(&(b.deck, b.row, b.column)),
            };
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
        seats
    }
}
