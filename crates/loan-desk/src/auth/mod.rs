//! Username/password accounts and the session check guarding the decision routes.

pub mod accounts;
mod password;
pub mod router;
pub mod service;
pub mod sessions;

pub use accounts::{
    Account, AccountStore, AccountStoreError, InMemoryAccountStore, JsonFileAccountStore,
};
pub use router::{auth_router, require_session, session_token};
pub use service::{AccountView, AuthError, AuthService, Credentials};
pub use sessions::{AuthenticatedUser, Session, SessionStore, SESSION_COOKIE};
