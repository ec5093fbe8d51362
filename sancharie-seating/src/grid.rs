use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

use crate::amount::Amount;
use crate::record::{Availability, Deck, GenderRestriction, SeatClass};

/// Seat identifier as printed on the bus (`"L1"`, `"U12"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatId(String);

impl SeatId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SeatId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Borrow<str> for SeatId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Seat {
    pub id: SeatId,
    pub deck: Deck,
    pub class: SeatClass,
    pub gender: GenderRestriction,
    pub availability: Availability,
    pub price: Amount,
    pub row: usize,
    pub column: usize,
}

impl Seat {
    pub fn is_available(&self) -> bool {
        self.availability == Availability::Available
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Cell {
    Seat(Seat),
    Aisle,
    Empty,
}

impl Cell {
    pub fn as_seat(&self) -> Option<&Seat> {
        match self {
            Cell::Seat(seat) => Some(seat),
            _ => None,
        }
    }
}

/// Dense rows x columns matrix for one deck. Row 0 is nearest the front.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeatGrid {
    deck: Deck,
    columns: usize,
    rows: Vec<Vec<Cell>>,
}

impl SeatGrid {
    pub fn empty(deck: Deck) -> Self {
        Self {
            deck,
            columns: 0,
            rows: Vec::new(),
        }
    }

    /// Pads every row with `Empty` to the widest row.
    pub(crate) fn from_rows(deck: Deck, mut rows: Vec<Vec<Cell>>) -> Self {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(columns, Cell::Empty);
        }
        Self { deck, columns, rows }
    }

    pub fn deck(&self) -> Deck {
        self.deck
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn seats(&self) -> impl Iterator<Item = &Seat> {
        self.rows.iter().flatten().filter_map(Cell::as_seat)
    }

    pub fn aisle_count(&self) -> usize {
        self.rows
            .iter()
            .flatten()
            .filter(|c| matches!(c, Cell::Aisle))
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutStyle {
    RowPreserving,
    Coordinate,
}

/// Both deck grids of one bus plus a seat-name index. Built only by
/// [`crate::normalize`], immutable afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct SeatLayout {
    style: LayoutStyle,
    lower: SeatGrid,
    upper: SeatGrid,
    #[serde(skip)]
    index: HashMap<SeatId, (Deck, usize, usize)>,
}

impl SeatLayout {
    pub(crate) fn new(style: LayoutStyle, lower: SeatGrid, upper: SeatGrid) -> Self {
        let index = lower
            .seats()
            .chain(upper.seats())
            .map(|s| (s.id.clone(), (s.deck, s.row, s.column)))
            .collect();
        Self {
            style,
            lower,
            upper,
            index,
        }
    }

    pub fn style(&self) -> LayoutStyle {
        self.style
    }

    pub fn grid(&self, deck: Deck) -> &SeatGrid {
        match deck {
            Deck::Lower => &self.lower,
            Deck::Upper => &self.upper,
        }
    }

    pub fn lower(&self) -> &SeatGrid {
        &self.lower
    }

    pub fn upper(&self) -> &SeatGrid {
        &self.upper
    }

    pub fn has_upper_deck(&self) -> bool {
        !self.upper.is_empty()
    }

    pub fn seat(&self, id: &str) -> Option<&Seat> {
        let (deck, row, column) = *self.index.get(id)?;
        self.grid(deck).cell(row, column).and_then(Cell::as_seat)
    }

    pub fn seats(&self) -> impl Iterator<Item = &Seat> {
        self.lower.seats().chain(self.upper.seats())
    }

    pub fn seat_count(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
