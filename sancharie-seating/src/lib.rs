//! Seat-layout normalization, seat selection and fare computation.
//!
//! Everything here is synchronous and free of I/O so the booking session can
//! drive it under a lock.

pub mod amount;
pub mod fare;
pub mod grid;
pub mod layout;
pub mod points;
pub mod record;
pub mod selection;
pub mod stats;

pub use amount::{Amount, Rate};
pub use fare::{compute_fare, FareBreakdown, FareConfig};
pub use grid::{Cell, LayoutStyle, Seat, SeatGrid, SeatId, SeatLayout};
pub use layout::{detect_style, normalize, parse_layout, LayoutError, NormalizerOptions};
pub use points::{validate_selection, BoardingPoint, DroppingPoint, SelectionError, StopPoint};
pub use record::{
    Availability, Deck, GenderRestriction, RawSeat, RawSeatLayout, RawSeatPrice, SeatClass,
    SeatRecord,
};
pub use selection::{Gender, GenderPolicy, SelectionSet, ToggleOutcome};
pub use stats::{PriceRange, SeatFilter, SeatOrder, SeatStatistics};
