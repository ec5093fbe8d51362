use chrono::{DateTime, Utc};
use uuid::Uuid;

use sancharie_core::inventory::PointLists;
use sancharie_seating::{
    compute_fare, validate_selection, FareBreakdown, FareConfig, GenderPolicy, Seat, SeatLayout,
    SelectionError, SelectionSet, StopPoint, ToggleOutcome,
};

use crate::models::{SessionView, TripContext};

pub const NO_SEATS_AVAILABLE: &str = "No seats available";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Booking session not found: {0}")]
    NotFound(Uuid),

    #[error("Seat layout for generation {got} is stale (current {current})")]
    StaleLayout { got: u64, current: u64 },

    #[error("No seats available: {0}")]
    LayoutUnavailable(String),

    #[error("Unknown {kind} point: {id}")]
    UnknownPoint { kind: &'static str, id: String },

    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// Handed out by [`BookingSession::begin_reload`]; only the ticket of the
/// latest reload can install a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadTicket {
    pub session_id: Uuid,
    pub generation: u64,
}

#[derive(Debug, Clone)]
enum LayoutState {
    Loading,
    Ready(SeatLayout),
    Unavailable(String),
}

/// One in-progress booking: the current layout, the seats picked on it and
/// the chosen stops.
#[derive(Debug, Clone)]
pub struct BookingSession {
    pub id: Uuid,
    trip: TripContext,
    generation: u64,
    layout: LayoutState,
    selection: SelectionSet,
    points: PointLists,
    boarding: Option<StopPoint>,
    dropping: Option<StopPoint>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl BookingSession {
    pub fn new(trip: TripContext, points: PointLists, policy: GenderPolicy) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            trip,
            generation: 0,
            layout: LayoutState::Loading,
            selection: SelectionSet::with_policy(policy),
            points,
            boarding: None,
            dropping: None,
            created_at: now,
            last_active: now,
        }
    }

    pub fn trip(&self) -> &TripContext {
        &self.trip
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    /// Start a new layout fetch. Drops the current layout and selection;
    /// results of earlier fetches are rejected from now on.
    pub fn begin_reload(&mut self) -> ReloadTicket {
        self.generation += 1;
        self.layout = LayoutState::Loading;
        self.selection.clear();
        ReloadTicket {
            session_id: self.id,
            generation: self.generation,
        }
    }

    /// Apply the outcome of the fetch started with `ticket`. A failed fetch
    /// or a malformed layout leaves the session without seats.
    pub fn install_layout(
        &mut self,
        ticket: ReloadTicket,
        outcome: Result<SeatLayout, String>,
    ) -> Result<(), SessionError> {
        if ticket.session_id != self.id || ticket.generation != self.generation {
            return Err(SessionError::StaleLayout {
                got: ticket.generation,
                current: self.generation,
            });
        }
        self.layout = match outcome {
            Ok(layout) => LayoutState::Ready(layout),
            Err(reason) => LayoutState::Unavailable(reason),
        };
        Ok(())
    }

    pub fn layout(&self) -> Result<&SeatLayout, SessionError> {
        match &self.layout {
            LayoutState::Ready(layout) => Ok(layout),
            LayoutState::Loading => Err(SessionError::LayoutUnavailable(
                "seat layout is still loading".to_string(),
            )),
            LayoutState::Unavailable(reason) => Err(SessionError::LayoutUnavailable(reason.clone())),
        }
    }

    /// Without a layout every target is unknown and so ignored.
    pub fn toggle_seat(&mut self, seat: &str) -> ToggleOutcome {
        match &self.layout {
            LayoutState::Ready(layout) => self.selection.toggle(layout, seat),
            _ => ToggleOutcome::Ignored,
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn selected_seats(&self) -> Vec<&Seat> {
        match &self.layout {
            LayoutState::Ready(layout) => self.selection.seats(layout),
            _ => Vec::new(),
        }
    }

    fn find_point<'a>(points: &'a [StopPoint], kind: &'static str, id: &str) -> Result<&'a StopPoint, SessionError> {
        points.iter().find(|p| p.id == id).ok_or_else(|| SessionError::UnknownPoint {
            kind,
            id: id.to_string(),
        })
    }

    /// Choose stops. Switching to a different boarding point clears the
    /// selection since seat prices can differ by stop.
    pub fn choose_points(&mut self, boarding: Option<&str>, dropping: Option<&str>) -> Result<(), SessionError> {
        let boarding = boarding
            .map(|id| Self::find_point(&self.points.boarding, "boarding", id).cloned())
            .transpose()?;
        let dropping = dropping
            .map(|id| Self::find_point(&self.points.dropping, "dropping", id).cloned())
            .transpose()?;

        if let Some(next) = boarding {
            let changed = self.boarding.as_ref().is_some_and(|current| current.id != next.id);
            if changed {
                self.selection.clear();
            }
            self.boarding = Some(next);
        }
        if let Some(next) = dropping {
            self.dropping = Some(next);
        }
        Ok(())
    }

    pub fn boarding_point(&self) -> Option<&StopPoint> {
        self.boarding.as_ref()
    }

    pub fn dropping_point(&self) -> Option<&StopPoint> {
        self.dropping.as_ref()
    }

    pub fn validate(&self) -> Result<(), SelectionError> {
        validate_selection(&self.selection, self.boarding.as_ref(), self.dropping.as_ref())
    }

    pub fn fare(&self, config: &FareConfig) -> FareBreakdown {
        compute_fare(self.selected_seats(), config)
    }

    /// Called once the booking is confirmed and stored.
    pub fn complete_booking(&mut self) {
        self.selection.clear();
    }

    pub fn view(&self, config: &FareConfig) -> SessionView {
        let (layout, layout_message) = match &self.layout {
            LayoutState::Ready(layout) if !layout.is_empty() => (Some(layout.clone()), None),
            LayoutState::Ready(_) | LayoutState::Unavailable(_) => {
                (None, Some(NO_SEATS_AVAILABLE.to_string()))
            }
            LayoutState::Loading => (None, Some("Loading seat layout".to_string())),
        };
        SessionView {
            id: self.id,
            generation: self.generation,
            trip: self.trip.clone(),
            statistics: layout.as_ref().map(SeatLayout::statistics),
            layout,
            layout_message,
            selected_seats: self.selection.ids().cloned().collect(),
            boarding_points: self.points.boarding.clone(),
            dropping_points: self.points.dropping.clone(),
            boarding_point: self.boarding.clone(),
            dropping_point: self.dropping.clone(),
            fare: self.fare(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sancharie_core::mocks::sample_layout;
    use sancharie_seating::{normalize, NormalizerOptions};

    fn trip() -> TripContext {
        TripContext {
            search_token: "tok".into(),
            result_index: 1,
            bus_name: "Sancharie Express".into(),
            bus_type: "A/C Seater".into(),
            source: "Bengaluru".into(),
            destination: "Hyderabad".into(),
            journey_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            departure_time: None,
            arrival_time: None,
        }
    }

    fn points() -> PointLists {
        let stop = |id: &str| StopPoint {
            id: id.into(),
            name: id.to_uppercase(),
            time: None,
            location: None,
            address: None,
            landmark: None,
            contact_number: None,
        };
        PointLists {
            boarding: vec![stop("b1"), stop("b2")],
            dropping: vec![stop("d1")],
        }
    }

    fn layout() -> SeatLayout {
        normalize(&sample_layout(), &NormalizerOptions::default()).unwrap()
    }

    fn loaded() -> BookingSession {
        let mut session = BookingSession::new(trip(), points(), GenderPolicy::Advisory);
        let ticket = session.begin_reload();
        session.install_layout(ticket, Ok(layout())).unwrap();
        session
    }

    #[test]
    fn test_stale_layout_is_discarded() {
        let mut session = BookingSession::new(trip(), points(), GenderPolicy::Advisory);
        let first = session.begin_reload();
        let second = session.begin_reload();

        session.install_layout(second, Ok(layout())).unwrap();
        let err = session.install_layout(first, Err("timeout".into())).unwrap_err();
        assert!(matches!(err, SessionError::StaleLayout { got: 1, current: 2 }));
        assert!(session.layout().is_ok());
    }

    #[test]
    fn test_reload_clears_selection() {
        let mut session = loaded();
        assert!(matches!(session.toggle_seat("L1"), ToggleOutcome::Selected { .. }));
        assert_eq!(session.selection().len(), 1);

        let ticket = session.begin_reload();
        assert!(session.selection().is_empty());
        assert_eq!(session.toggle_seat("L1"), ToggleOutcome::Ignored);

        session.install_layout(ticket, Ok(layout())).unwrap();
        assert!(session.selection().is_empty());
    }

    #[test]
    fn test_malformed_layout_reports_no_seats() {
        let mut session = BookingSession::new(trip(), points(), GenderPolicy::Advisory);
        let ticket = session.begin_reload();
        session.install_layout(ticket, Err("duplicate seat name 'L1'".into())).unwrap();

        let view = session.view(&FareConfig::default());
        assert!(view.layout.is_none());
        assert_eq!(view.layout_message.as_deref(), Some(NO_SEATS_AVAILABLE));
        assert!(matches!(session.layout(), Err(SessionError::LayoutUnavailable(_))));
    }

    #[test]
    fn test_boarding_change_clears_selection() {
        let mut session = loaded();
        session.choose_points(Some("b1"), Some("d1")).unwrap();
        session.toggle_seat("L1");

        session.choose_points(Some("b1"), None).unwrap();
        assert_eq!(session.selection().len(), 1);

        session.choose_points(Some("b2"), None).unwrap();
        assert!(session.selection().is_empty());
        assert_eq!(session.dropping_point().map(|p| p.id.as_str()), Some("d1"));
    }

    #[test]
    fn test_unknown_point_rejected() {
        let mut session = loaded();
        let err = session.choose_points(Some("nowhere"), None).unwrap_err();
        assert!(matches!(err, SessionError::UnknownPoint { kind: "boarding", .. }));
        assert!(session.boarding_point().is_none());
    }

    #[test]
    fn test_validate_and_fare() {
        let mut session = loaded();
        session.toggle_seat("L1");
        session.toggle_seat("L3");
        assert_eq!(session.validate(), Err(SelectionError::MissingBoardingPoint));

        session.choose_points(Some("b1"), Some("d1")).unwrap();
        assert!(session.validate().is_ok());

        let fare = session.fare(&FareConfig::default());
        assert_eq!(fare.seat_count, 2);
        assert_eq!(fare.base_fare, sancharie_seating::Amount::from_major(1700));
    }
}
