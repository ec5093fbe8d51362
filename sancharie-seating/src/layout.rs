use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::amount::Amount;
use crate::grid::{Cell, LayoutStyle, Seat, SeatGrid, SeatId, SeatLayout};
use crate::record::{Availability, Deck, GenderRestriction, RawSeatLayout, SeatRecord};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("Malformed seat layout: {0}")]
    MalformedLayout(String),
}

/// Largest row or column count a coordinate-style deck may span.
pub const MAX_GRID_DIMENSION: usize = 64;

/// Tuning for the aisle heuristic and the coordinate grid bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerOptions {
    /// Unavailable, unflagged records priced below this are aisle gaps.
    pub aisle_price_ceiling: Amount,
    #[serde(default = "default_max_grid_dimension")]
    pub max_grid_dimension: usize,
}

fn default_max_grid_dimension() -> usize {
    MAX_GRID_DIMENSION
}

impl Default for NormalizerOptions {
    fn default() -> Self {
        Self {
            aisle_price_ceiling: Amount::from_major(1),
            max_grid_dimension: MAX_GRID_DIMENSION,
        }
    }
}

/// One provider row after validation.
pub type ParsedRow = Vec<SeatRecord>;

/// Validate every raw record. The first bad record fails the whole layout.
pub fn parse_layout(raw: &RawSeatLayout) -> Result<Vec<ParsedRow>, LayoutError> {
    raw.rows()
        .iter()
        .enumerate()
        .map(|(r, row)| {
            row.iter()
                .enumerate()
                .map(|(i, seat)| SeatRecord::parse(seat, r, i))
                .collect()
        })
        .collect()
}

/// Decide once per layout how records are positioned.
pub fn detect_style(rows: &[ParsedRow]) -> Result<LayoutStyle, LayoutError> {
    let mut positioned = 0usize;
    let mut sequential = 0usize;

    for record in rows.iter().flatten() {
        match (record.row, record.column) {
            (Some(_), Some(_)) => positioned += 1,
            (None, None) => sequential += 1,
            _ => {
                return Err(LayoutError::MalformedLayout(format!(
                    "seat '{}' carries only one of RowNo/ColumnNo",
                    record.name
                )))
            }
        }
    }

    match (positioned, sequential) {
        (0, _) => Ok(LayoutStyle::RowPreserving),
        (_, 0) => Ok(LayoutStyle::Coordinate),
        _ => Err(LayoutError::MalformedLayout(
            "layout mixes positioned and row-ordered seats".to_string(),
        )),
    }
}

pub fn is_aisle(record: &SeatRecord, options: &NormalizerOptions) -> bool {
    if record.availability != Availability::Booked {
        return false;
    }
    if record.name.to_ascii_lowercase().contains("aisle") {
        return true;
    }
    record.price < options.aisle_price_ceiling && record.gender == GenderRestriction::None
}

trait LayoutStrategy {
    fn build(
        &self,
        rows: &[ParsedRow],
        options: &NormalizerOptions,
    ) -> Result<(SeatGrid, SeatGrid), LayoutError>;
}

struct RowPreserving;

struct Coordinate;

fn strategy_for(style: LayoutStyle) -> &'static dyn LayoutStrategy {
    match style {
        LayoutStyle::RowPreserving => &RowPreserving,
        LayoutStyle::Coordinate => &Coordinate,
    }
}

fn to_cell(record: &SeatRecord, row: usize, column: usize, options: &NormalizerOptions) -> Cell {
    if is_aisle(record, options) {
        return Cell::Aisle;
    }
    Cell::Seat(Seat {
        id: SeatId::new(record.name.clone()),
        deck: record.deck,
        class: record.class,
        gender: record.gender,
        availability: record.availability,
        price: record.price,
        row,
        column,
    })
}

impl LayoutStrategy for RowPreserving {
    fn build(
        &self,
        rows: &[ParsedRow],
        options: &NormalizerOptions,
    ) -> Result<(SeatGrid, SeatGrid), LayoutError> {
        let mut lower: Vec<Vec<Cell>> = Vec::new();
        let mut upper: Vec<Vec<Cell>> = Vec::new();

        for row in rows {
            for (deck, target) in [(Deck::Lower, &mut lower), (Deck::Upper, &mut upper)] {
                let display_row = target.len();
                let cells: Vec<Cell> = row
                    .iter()
                    .filter(|r| r.deck == deck)
                    .enumerate()
                    .map(|(column, record)| to_cell(record, display_row, column, options))
                    .collect();
                if !cells.is_empty() {
                    target.push(cells);
                }
            }
        }

        Ok((
            SeatGrid::from_rows(Deck::Lower, lower),
            SeatGrid::from_rows(Deck::Upper, upper),
        ))
    }
}

impl Coordinate {
    fn build_deck(
        deck: Deck,
        records: &[&SeatRecord],
        options: &NormalizerOptions,
    ) -> Result<SeatGrid, LayoutError> {
        let positions: Vec<(usize, usize)> = records
            .iter()
            .map(|r| (r.row.unwrap_or(0), r.column.unwrap_or(0)))
            .collect();
        let Some(rows) = positions.iter().map(|p| p.0).max().map(|m| m.saturating_add(1)) else {
            return Ok(SeatGrid::empty(deck));
        };
        let columns = positions.iter().map(|p| p.1).max().map_or(0, |m| m.saturating_add(1));
        if rows > options.max_grid_dimension || columns > options.max_grid_dimension {
            return Err(LayoutError::MalformedLayout(format!(
                "{:?} deck spans {} rows and {} columns, limit is {}",
                deck, rows, columns, options.max_grid_dimension
            )));
        }

        let mut cells = vec![vec![Cell::Empty; columns]; rows];
        let mut taken = HashSet::new();
        for (record, &(row, column)) in records.iter().zip(&positions) {
            if !taken.insert((row, column)) {
                return Err(LayoutError::MalformedLayout(format!(
                    "two records share {:?} deck row {} column {}",
                    deck, row, column
                )));
            }
            cells[row][column] = to_cell(record, row, column, options);
        }

        let occupied: BTreeSet<usize> = positions.iter().map(|p| p.1).collect();
        if let (Some(&first), Some(&last)) = (occupied.first(), occupied.last()) {
            for column in (first + 1)..last {
                if occupied.contains(&column) {
                    continue;
                }
                for row in cells.iter_mut() {
                    row[column] = Cell::Aisle;
                }
            }
        }

        Ok(SeatGrid::from_rows(deck, cells))
    }
}

impl LayoutStrategy for Coordinate {
    fn build(
        &self,
        rows: &[ParsedRow],
        options: &NormalizerOptions,
    ) -> Result<(SeatGrid, SeatGrid), LayoutError> {
        let (upper, lower): (Vec<&SeatRecord>, Vec<&SeatRecord>) =
            rows.iter().flatten().partition(|r| r.deck == Deck::Upper);
        Ok((
            Self::build_deck(Deck::Lower, &lower, options)?,
            Self::build_deck(Deck::Upper, &upper, options)?,
        ))
    }
}

fn check_seat_names(lower: &SeatGrid, upper: &SeatGrid) -> Result<(), LayoutError> {
    let mut seen = HashSet::new();
    for seat in lower.seats().chain(upper.seats()) {
        if seat.id.as_str().is_empty() {
            return Err(LayoutError::MalformedLayout(format!(
                "{:?} deck seat at row {} column {} has no name",
                seat.deck, seat.row, seat.column
            )));
        }
        if !seen.insert(seat.id.as_str()) {
            return Err(LayoutError::MalformedLayout(format!(
                "duplicate seat name '{}'",
                seat.id
            )));
        }
    }
    Ok(())
}

/// Turn a provider layout into per-deck grids.
///
/// Fails closed: any invalid record, duplicate name, position collision or
/// inconsistent positioning rejects the whole layout. A layout with no
/// records yields empty grids.
pub fn normalize(raw: &RawSeatLayout, options: &NormalizerOptions) -> Result<SeatLayout, LayoutError> {
    let rows = parse_layout(raw)?;
    let style = detect_style(&rows)?;
    let (lower, upper) = strategy_for(style).build(&rows, options)?;
    check_seat_names(&lower, &upper)?;

    let layout = SeatLayout::new(style, lower, upper);
    tracing::debug!(
        style = ?style,
        records = raw.record_count(),
        seats = layout.seat_count(),
        "Normalized seat layout"
    );
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawSeat;
    use serde_json::{json, Value};

    fn raw_layout(rows: Value) -> RawSeatLayout {
        let rows: Vec<Vec<RawSeat>> = serde_json::from_value(rows).unwrap();
        RawSeatLayout::from_rows(rows)
    }

    fn seat(name: &str, upper: bool, available: bool, fare: f64) -> Value {
        json!({
            "SeatName": name, "SeatType": 1, "SeatStatus": available,
            "IsUpper": upper, "SeatFare": fare
        })
    }

    fn placed(name: &str, row: u32, column: u32) -> Value {
        json!({
            "SeatName": name, "SeatType": 2, "SeatStatus": true,
            "SeatFare": 1200, "RowNo": format!("{:03}", row), "ColumnNo": column
        })
    }

    fn cell_count(layout: &SeatLayout) -> usize {
        [Deck::Lower, Deck::Upper]
            .iter()
            .map(|d| layout.grid(*d))
            .map(|g| g.rows().flatten().filter(|c| !matches!(c, Cell::Empty)).count())
            .sum()
    }

    #[test]
    fn test_row_preserving_splits_decks() {
        let raw = raw_layout(json!([
            [seat("L1", false, true, 800.0), seat("L2", false, false, 800.0), seat("U1", true, true, 900.0)],
            [seat("L3", false, true, 800.0)]
        ]));
        let layout = normalize(&raw, &NormalizerOptions::default()).unwrap();

        assert_eq!(layout.style(), LayoutStyle::RowPreserving);
        assert_eq!(layout.lower().row_count(), 2);
        assert_eq!(layout.lower().column_count(), 2);
        assert_eq!(layout.upper().row_count(), 1);
        assert_eq!(layout.lower().cell(1, 1), Some(&Cell::Empty));
        assert_eq!(layout.seat("L3").unwrap().row, 1);
        assert!(!layout.seat("L2").unwrap().is_available());
        assert_eq!(layout.seat_count(), 4);
    }

    #[test]
    fn test_every_record_lands_in_one_cell() {
        let raw = raw_layout(json!([
            [seat("A1", false, true, 500.0), seat("", false, false, 0.0), seat("A2", false, true, 500.0)],
            [seat("B1", false, true, 500.0), seat("", false, false, 0.0), seat("B2", false, false, 500.0)],
            [seat("C1", true, true, 700.0)]
        ]));
        let layout = normalize(&raw, &NormalizerOptions::default()).unwrap();

        assert_eq!(cell_count(&layout), raw.record_count());
        for deck in [Deck::Lower, Deck::Upper] {
            let grid = layout.grid(deck);
            let records = raw
                .rows()
                .iter()
                .flatten()
                .filter(|s| (s.is_upper == Some(json!(true))) == (deck == Deck::Upper))
                .count();
            assert!(grid.row_count() * grid.column_count() >= records);
        }
        assert_eq!(layout.lower().aisle_count(), 2);
    }

    #[test]
    fn test_cheap_booked_flagged_seat_is_not_aisle() {
        let raw = raw_layout(json!([[
            { "SeatName": "L1", "SeatType": 1, "SeatStatus": false, "SeatFare": 0, "IsLadiesSeat": true },
            { "SeatName": "aisle-1", "SeatType": 1, "SeatStatus": false, "SeatFare": 500 }
        ]]));
        let layout = normalize(&raw, &NormalizerOptions::default()).unwrap();
        assert!(layout.seat("L1").is_some());
        assert_eq!(layout.lower().cell(0, 1), Some(&Cell::Aisle));
    }

    #[test]
    fn test_coordinate_vacant_interior_column_is_aisle() {
        let raw = raw_layout(json!([
            [placed("1", 0, 0), placed("2", 0, 1), placed("3", 0, 3)],
            [placed("4", 1, 0), placed("5", 1, 3)]
        ]));
        let layout = normalize(&raw, &NormalizerOptions::default()).unwrap();

        assert_eq!(layout.style(), LayoutStyle::Coordinate);
        let grid = layout.lower();
        assert_eq!((grid.row_count(), grid.column_count()), (2, 4));
        assert_eq!(grid.cell(0, 2), Some(&Cell::Aisle));
        assert_eq!(grid.cell(1, 2), Some(&Cell::Aisle));
        assert_eq!(grid.cell(1, 1), Some(&Cell::Empty));
        assert_eq!(layout.seat("5").unwrap().column, 3);
    }

    #[test]
    fn test_mixed_positioning_is_malformed() {
        let raw = raw_layout(json!([[placed("1", 0, 0), seat("2", false, true, 100.0)]]));
        assert!(matches!(
            normalize(&raw, &NormalizerOptions::default()),
            Err(LayoutError::MalformedLayout(_))
        ));

        let half = raw_layout(json!([[
            { "SeatName": "1", "SeatType": 1, "SeatStatus": true, "RowNo": 0 }
        ]]));
        assert!(normalize(&half, &NormalizerOptions::default()).is_err());
    }

    #[test]
    fn test_duplicates_are_malformed() {
        let names = raw_layout(json!([[seat("A", false, true, 1.0), seat("A", false, true, 1.0)]]));
        assert!(normalize(&names, &NormalizerOptions::default()).is_err());

        let positions = raw_layout(json!([[placed("1", 0, 0), placed("2", 0, 0)]]));
        assert!(normalize(&positions, &NormalizerOptions::default()).is_err());
    }

    #[test]
    fn test_out_of_range_coordinates_are_malformed() {
        let far = raw_layout(json!([[
            { "SeatName": "1", "SeatType": 1, "SeatStatus": true, "RowNo": "4000000000", "ColumnNo": "4000000000" }
        ]]));
        let err = normalize(&far, &NormalizerOptions::default()).unwrap_err();
        assert!(err.to_string().contains("limit"));

        let wide = raw_layout(json!([[placed("1", 0, 0), placed("2", 0, 64)]]));
        assert!(normalize(&wide, &NormalizerOptions::default()).is_err());

        let edge = raw_layout(json!([[placed("1", 63, 0), placed("2", 0, 63)]]));
        let layout = normalize(&edge, &NormalizerOptions::default()).unwrap();
        assert_eq!((layout.lower().row_count(), layout.lower().column_count()), (64, 64));
    }

    #[test]
    fn test_unnamed_seat_is_malformed() {
        let raw = raw_layout(json!([[seat("", false, true, 900.0)]]));
        assert!(normalize(&raw, &NormalizerOptions::default()).is_err());
    }

    #[test]
    fn test_empty_input_yields_empty_grids() {
        let layout = normalize(&RawSeatLayout::default(), &NormalizerOptions::default()).unwrap();
        assert!(layout.lower().is_empty());
        assert!(layout.upper().is_empty());
        assert!(layout.is_empty());

        let rows = normalize(&raw_layout(json!([[], []])), &NormalizerOptions::default()).unwrap();
        assert_eq!(rows.lower().row_count(), 0);
    }

    #[test]
    fn test_invalid_record_fails_whole_layout() {
        let raw = raw_layout(json!([[seat("A", false, true, 1.0), { "SeatName": "B", "SeatType": 9, "SeatStatus": true }]]));
        let err = normalize(&raw, &NormalizerOptions::default()).unwrap_err();
        assert!(err.to_string().contains("SeatType"));
    }
}
