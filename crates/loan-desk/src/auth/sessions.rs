use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Name of the cookie carrying the session token for browser clients.
pub const SESSION_COOKIE: &str = "loan_desk_session";

/// Authenticated login, identified by an opaque token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub issued_at: DateTime<Utc>,
}

/// Identity attached to requests that passed the session check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub username: String,
}

/// In-memory session table. Sessions do not survive a restart.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    fn guard(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn issue(&self, username: &str) -> Session {
        let session = Session {
            token: Uuid::new_v4().simple().to_string(),
            username: username.to_string(),
            issued_at: Utc::now(),
        };
        self.guard().insert(session.token.clone(), session.clone());
        session
    }

    pub fn resolve(&self, token: &str) -> Option<Session> {
        self.guard().get(token).cloned()
    }

    /// Drop a session, returning whether it existed.
    pub fn revoke(&self, token: &str) -> bool {
        self.guard().remove(token).is_some()
    }
}
