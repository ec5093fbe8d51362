use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::grid::{Seat, SeatId, SeatLayout};
use crate::record::GenderRestriction;

/// Passenger gender used by [`GenderPolicy::Restricted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// Whether ladies/gents-only seats gate selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "mode", content = "gender")]
pub enum GenderPolicy {
    /// Anyone may pick any seat; the restriction is echoed back.
    #[default]
    Advisory,
    Restricted(Gender),
}

impl GenderPolicy {
    fn permits(self, restriction: GenderRestriction) -> bool {
        match (self, restriction) {
            (GenderPolicy::Advisory, _) | (_, GenderRestriction::None) => true,
            (GenderPolicy::Restricted(Gender::Female), GenderRestriction::FemaleOnly) => true,
            (GenderPolicy::Restricted(Gender::Male), GenderRestriction::MaleOnly) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ToggleOutcome {
    Selected { restriction: GenderRestriction },
    Deselected,
    /// Booked, aisle, empty or unknown target. Nothing changed.
    Ignored,
}

/// Seats picked for one in-progress booking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionSet {
    seats: BTreeSet<SeatId>,
    #[serde(skip)]
    policy: GenderPolicy,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: GenderPolicy) -> Self {
        Self {
            seats: BTreeSet::new(),
            policy,
        }
    }

    pub fn policy(&self) -> GenderPolicy {
        self.policy
    }

    pub fn toggle(&mut self, layout: &SeatLayout, id: &str) -> ToggleOutcome {
        let Some(seat) = layout.seat(id) else {
            tracing::debug!(seat = id, "Ignoring toggle of unknown seat");
            return ToggleOutcome::Ignored;
        };

        if self.seats.remove(id) {
            return ToggleOutcome::Deselected;
        }

        if !seat.is_available() || !self.policy.permits(seat.gender) {
            tracing::debug!(seat = id, availability = ?seat.availability, "Ignoring toggle");
            return ToggleOutcome::Ignored;
        }

        self.seats.insert(seat.id.clone());
        ToggleOutcome::Selected {
            restriction: seat.gender,
        }
    }

    pub fn clear(&mut self) {
        self.seats.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seats.contains(id)
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &SeatId> {
        self.seats.iter()
    }

    /// Selected seats resolved against `layout`, in name order.
    pub fn seats<'a>(&'a self, layout: &'a SeatLayout) -> Vec<&'a Seat> {
        self.seats.iter().filter_map(|id| layout.seat(id.as_str())).collect()
    }
}
