//! Session identity and auth feed events

use serde::{Deserialize, Serialize};

/// Identity that scopes every remote row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An authenticated session: opaque token plus owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub owner_id: OwnerId,
}

impl Session {
    pub fn new(access_token: impl Into<String>, owner_id: OwnerId) -> Self {
        Self {
            access_token: access_token.into(),
            owner_id,
        }
    }
}

/// Kind of change reported by the auth feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEventKind {
    /// Startup probe result
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    /// User followed a password reset link
    PasswordRecovery,
}

/// One message from the auth feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEvent {
    pub session: Option<Session>,
    pub kind: AuthEventKind,
}

impl AuthEvent {
    pub fn new(kind: AuthEventKind, session: Option<Session>) -> Self {
        Self { session, kind }
    }

    pub fn initial(session: Option<Session>) -> Self {
        Self::new(AuthEventKind::InitialSession, session)
    }

    pub fn signed_in(session: Session) -> Self {
        Self::new(AuthEventKind::SignedIn, Some(session))
    }

    pub fn signed_out() -> Self {
        Self::new(AuthEventKind::SignedOut, None)
    }
}
