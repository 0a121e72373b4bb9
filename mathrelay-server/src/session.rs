// Copyright 2025 Mathrelay Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! In-memory session table.
//!
//! Sessions live for the process lifetime only; a restart discards them
//! all, which is a documented limitation rather than a defect. The table is
//! shared mutable state, so every operation takes the mutex and is atomic
//! with respect to concurrent callers holding the same token.
//!
//! Time is read through the [`Clock`] trait so tests can drive expiry and
//! last-access semantics deterministically.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

/// Source of monotonic time for the session table.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Production clock backed by `Instant::now`.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A single client session.
#[derive(Debug, Clone, Copy)]
pub struct Session {
    pub created_at: Instant,
    pub last_accessed: Instant,
}

/// Process-wide table of active sessions keyed by opaque token.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Mint a fresh session and return its token. Never fails; UUIDv4
    /// tokens are collision-resistant across the process lifetime.
    pub fn create(&self) -> String {
        let token = Uuid::new_v4().to_string();
        let now = self.clock.now();
        let session = Session {
            created_at: now,
            last_accessed: now,
        };
        self.sessions.lock().insert(token.clone(), session);
        debug!(token = %token, "Session created");
        token
    }

    /// Update last-accessed time if the session exists. Returns false with
    /// no side effect for an unknown token.
    pub fn touch(&self, token: &str) -> bool {
        let mut sessions = self.sessions.lock();
        match sessions.get_mut(token) {
            Some(session) => {
                session.last_accessed = self.clock.now();
                true
            }
            None => false,
        }
    }

    /// Pure lookup.
    pub fn exists(&self, token: &str) -> bool {
        self.sessions.lock().contains_key(token)
    }

    /// Remove the session if present, reporting whether it existed. A
    /// deleted token is never reusable.
    pub fn delete(&self, token: &str) -> bool {
        let removed = self.sessions.lock().remove(token).is_some();
        if removed {
            debug!(token = %token, "Session deleted");
        }
        removed
    }

    /// Remove sessions idle longer than `max_idle`, returning how many
    /// were swept.
    pub fn sweep_expired(&self, max_idle: Duration) -> usize {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, session| now.duration_since(session.last_accessed) <= max_idle);
        let swept = before - sessions.len();
        if swept > 0 {
            debug!(swept, "Swept expired sessions");
        }
        swept
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Last-accessed instant for a session, if it exists.
    pub fn last_accessed(&self, token: &str) -> Option<Instant> {
        self.sessions.lock().get(token).map(|s| s.last_accessed)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
