use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::accounts::{Account, AccountStore, AccountStoreError};
use super::password::{hash_password, verify_password};
use super::sessions::{AuthenticatedUser, Session, SessionStore};

/// Username/password pair submitted to register or log in.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Public view of a registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountView {
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Registration, login, and session lookup over an [`AccountStore`].
///
/// `register` and `login` hash with Argon2 and touch the account store; async callers run them
/// on the blocking pool.
pub struct AuthService<S> {
    accounts: Arc<S>,
    sessions: SessionStore,
}

impl<S> AuthService<S>
where
    S: AccountStore + 'static,
{
    pub fn new(accounts: Arc<S>) -> Self {
        Self {
            accounts,
            sessions: SessionStore::default(),
        }
    }

    pub fn register(&self, credentials: Credentials) -> Result<AccountView, AuthError> {
        let username = credentials.username.trim();
        if username.is_empty() || credentials.password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        if self.accounts.fetch(username)?.is_some() {
            return Err(AuthError::UsernameTaken);
        }

        let account = self.accounts.insert(Account {
            username: username.to_string(),
            password_hash: hash_password(&credentials.password)?,
            created_at: Utc::now(),
        })?;

        info!(username = %account.username, "account registered");

        Ok(AccountView {
            username: account.username,
            created_at: account.created_at,
        })
    }

    pub fn login(&self, credentials: Credentials) -> Result<Session, AuthError> {
        let username = credentials.username.trim();
        let account = self
            .accounts
            .fetch(username)?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&credentials.password, &account.password_hash)? {
            warn!(username = %username, "rejected login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(self.sessions.issue(&account.username))
    }

    /// End a session. Unknown tokens are ignored.
    pub fn logout(&self, token: &str) -> bool {
        self.sessions.revoke(token)
    }

    pub fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        self.sessions
            .resolve(token)
            .map(|session| AuthenticatedUser {
                username: session.username,
            })
            .ok_or(AuthError::Unauthenticated)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("username and password are required")]
    MissingCredentials,
    #[error("username already exists")]
    UsernameTaken,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("authentication required")]
    Unauthenticated,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Store(AccountStoreError),
    #[error("authentication task failed: {0}")]
    Worker(String),
}

impl From<AccountStoreError> for AuthError {
    fn from(value: AccountStoreError) -> Self {
        match value {
            AccountStoreError::Conflict => Self::UsernameTaken,
            other => Self::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::accounts::InMemoryAccountStore;

    fn credentials(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn service() -> AuthService<InMemoryAccountStore> {
        AuthService::new(Arc::new(InMemoryAccountStore::default()))
    }

    #[test]
    fn register_then_login_issues_a_resolvable_session() {
        let auth = service();
        let view = auth
            .register(credentials("  ada ", "s3cret"))
            .expect("registers");
        assert_eq!(view.username, "ada");

        let session = auth.login(credentials("ada", "s3cret")).expect("logs in");
        let user = auth.authenticate(&session.token).expect("session resolves");
        assert_eq!(user.username, "ada");

        assert!(auth.logout(&session.token));
        assert!(matches!(
            auth.authenticate(&session.token),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let auth = service();
        auth.register(credentials("ada", "one")).expect("registers");

        assert!(matches!(
            auth.register(credentials("ada", "two")),
            Err(AuthError::UsernameTaken)
        ));
    }

    #[test]
    fn blank_credentials_are_rejected_before_hashing() {
        let auth = service();

        assert!(matches!(
            auth.register(credentials("   ", "pw")),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            auth.register(credentials("ada", "")),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn login_rejects_unknown_users_and_wrong_passwords() {
        let auth = service();
        auth.register(credentials("ada", "right")).expect("registers");

        assert!(matches!(
            auth.login(credentials("grace", "right")),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login(credentials("ada", "wrong")),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
