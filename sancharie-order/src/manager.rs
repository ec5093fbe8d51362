use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::session::{BookingSession, SessionError};

/// Holds the live booking sessions and drops the ones left idle.
pub struct SessionManager {
    sessions: HashMap<Uuid, BookingSession>,
    idle_ttl: chrono::Duration,
}

impl SessionManager {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            idle_ttl: chrono::Duration::from_std(idle_ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    pub fn insert(&mut self, session: BookingSession) -> Uuid {
        let id = session.id;
        self.sessions.insert(id, session);
        id
    }

    pub fn get(&self, id: &Uuid) -> Result<&BookingSession, SessionError> {
        self.sessions.get(id).ok_or(SessionError::NotFound(*id))
    }

    /// Mutable access counts as activity.
    pub fn get_mut(&mut self, id: &Uuid) -> Result<&mut BookingSession, SessionError> {
        let session = self.sessions.get_mut(id).ok_or(SessionError::NotFound(*id))?;
        session.touch();
        Ok(session)
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<BookingSession> {
        self.sessions.remove(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions idle since before `now - idle_ttl`. Returns how many went.
    pub fn cleanup_expired_at(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        let ttl = self.idle_ttl;
        self.sessions.retain(|_, s| now.signed_duration_since(s.last_active) < ttl);
        before - self.sessions.len()
    }

    pub fn cleanup_expired(&mut self) -> usize {
        self.cleanup_expired_at(Utc::now())
    }
}

/// Periodically sweep idle sessions until the task is aborted.
pub fn spawn_sweeper(manager: Arc<Mutex<SessionManager>>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let removed = manager.lock().await.cleanup_expired();
            if removed > 0 {
                tracing::info!(removed, "Swept idle booking sessions");
            }
        }
    })
}
