use async_trait::async_trait;
use uuid::Uuid;

use sancharie_shared::PhoneNumber;

use crate::account::{ProfileUpdate, User};
use crate::booking::{Booking, NewBooking};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Repository backend error: {0}")]
    Backend(String),
}

/// Repository trait for user accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;

    async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<User>, RepositoryError>;

    /// Find-or-create by phone and stamp the login time. The flag is true
    /// when the account was created by this call.
    async fn record_login(&self, phone: &PhoneNumber) -> Result<(User, bool), RepositoryError>;

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<User, RepositoryError>;
}

/// Repository trait for booking records
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create(&self, booking: NewBooking) -> Result<Booking, RepositoryError>;

    /// Newest first, at most `limit`.
    async fn list_for_user(&self, user_id: Uuid, limit: usize) -> Result<Vec<Booking>, RepositoryError>;

    async fn get_for_user(&self, user_id: Uuid, id: Uuid) -> Result<Option<Booking>, RepositoryError>;

    async fn mark_cancelled(&self, id: Uuid, reason: &str) -> Result<Booking, RepositoryError>;
}
