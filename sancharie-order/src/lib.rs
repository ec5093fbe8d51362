pub mod manager;
pub mod models;
pub mod orchestrator;
pub mod session;

pub use manager::{spawn_sweeper, SessionManager};
pub use models::{BookingUser, PaymentReport, SessionView, TripContext};
pub use orchestrator::{CheckoutError, CheckoutOrchestrator};
pub use session::{BookingSession, ReloadTicket, SessionError, NO_SEATS_AVAILABLE};
