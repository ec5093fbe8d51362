//! In-process implementations of the store and repository traits, used by
//! standalone mode and by tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use uuid::Uuid;

use sancharie_shared::PhoneNumber;

use crate::account::{ProfileUpdate, User};
use crate::booking::{Booking, BookingStatus, NewBooking};
use crate::repository::{BookingRepository, RepositoryError, UserRepository};
use crate::store::{ExpiringStore, StoreError, WindowCount};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, String> {
    mutex.lock().map_err(|_| "mutex poisoned".to_string())
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Expiring key/value map. Expired keys are dropped lazily on access and
/// by [`purge_expired`](Self::purge_expired).
#[derive(Debug, Clone, Default)]
pub struct MemoryExpiringStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryExpiringStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn purge_expired(&self) -> usize {
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ExpiringStore for MemoryExpiringStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut entries = lock(&self.entries).map_err(StoreError::Backend)?;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = lock(&self.entries).map_err(StoreError::Backend)?;
        match entries.get(key) {
            Some(e) if e.expires_at > Instant::now() => Ok(Some(e.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = lock(&self.entries).map_err(StoreError::Backend)?;
        entries.remove(key);
        Ok(())
    }

    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, StoreError> {
        let mut entries = lock(&self.entries).map_err(StoreError::Backend)?;
        let now = Instant::now();

        let live = entries.get(key).filter(|e| e.expires_at > now);
        let (count, expires_at) = match live {
            Some(e) => {
                let current: u64 = e
                    .value
                    .parse()
                    .map_err(|_| StoreError::Corrupt(format!("counter '{}'", key)))?;
                (current + 1, e.expires_at)
            }
            None => (1, now + window),
        };

        entries.insert(
            key.to_string(),
            Entry {
                value: count.to_string(),
                expires_at,
            },
        );
        Ok(WindowCount {
            count,
            resets_in: expires_at.saturating_duration_since(now),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryUserRepository {
    users: Arc<Mutex<HashMap<Uuid, User>>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let users = lock(&self.users).map_err(RepositoryError::Backend)?;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<User>, RepositoryError> {
        let users = lock(&self.users).map_err(RepositoryError::Backend)?;
        Ok(users.values().find(|u| &u.phone == phone).cloned())
    }

    async fn record_login(&self, phone: &PhoneNumber) -> Result<(User, bool), RepositoryError> {
        let mut users = lock(&self.users).map_err(RepositoryError::Backend)?;
        if let Some(user) = users.values_mut().find(|u| &u.phone == phone) {
            user.last_login = Utc::now();
            return Ok((user.clone(), false));
        }
        let user = User::new(phone.clone());
        users.insert(user.id, user.clone());
        Ok((user, true))
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<User, RepositoryError> {
        let mut users = lock(&self.users).map_err(RepositoryError::Backend)?;
        let user = users.get_mut(&id).ok_or(RepositoryError::NotFound("User"))?;
        user.apply(update);
        Ok(user.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBookingRepository {
    bookings: Arc<Mutex<Vec<Booking>>>,
}

impl MemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingRepository for MemoryBookingRepository {
    async fn create(&self, booking: NewBooking) -> Result<Booking, RepositoryError> {
        let mut bookings = lock(&self.bookings).map_err(RepositoryError::Backend)?;
        let booking = Booking::from_new(booking);
        if bookings.iter().any(|b| b.booking_reference == booking.booking_reference) {
            return Err(RepositoryError::Conflict(format!(
                "booking reference {} already exists",
                booking.booking_reference
            )));
        }
        bookings.push(booking.clone());
        Ok(booking)
    }

    async fn list_for_user(&self, user_id: Uuid, limit: usize) -> Result<Vec<Booking>, RepositoryError> {
        let bookings = lock(&self.bookings).map_err(RepositoryError::Backend)?;
        let mut mine: Vec<Booking> = bookings
            .iter()
            .filter(|b| b.details.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        mine.truncate(limit);
        Ok(mine)
    }

    async fn get_for_user(&self, user_id: Uuid, id: Uuid) -> Result<Option<Booking>, RepositoryError> {
        let bookings = lock(&self.bookings).map_err(RepositoryError::Backend)?;
        Ok(bookings
            .iter()
            .find(|b| b.id == id && b.details.user_id == user_id)
            .cloned())
    }

    async fn mark_cancelled(&self, id: Uuid, reason: &str) -> Result<Booking, RepositoryError> {
        let mut bookings = lock(&self.bookings).map_err(RepositoryError::Backend)?;
        let booking = bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(RepositoryError::NotFound("Booking"))?;
        if !booking.is_cancellable() {
            return Err(RepositoryError::Conflict(format!(
                "booking is already {}",
                booking.status().as_str()
            )));
        }
        booking.details.status = BookingStatus::Cancelled;
        booking.cancellation_reason = Some(reason.to_string());
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }
}
