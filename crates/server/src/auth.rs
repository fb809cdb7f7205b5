//! Authentication and authorization.
//!
//! The [`authorize`] middleware resolves the caller once per request: it
//! reads the session token, checks the route's required capability and
//! stores the resulting [`Principal`] as a request extension. Write handlers
//! run their store calls inside [`Principal::span`], so the store's audit
//! logs carry the caller.

pub mod capability;
pub mod middleware;
pub mod session;

use chrono::{DateTime, Utc};
use tracing::{info_span, Span};
use uuid::Uuid;

pub use capability::{Access, Capability, Role};
pub use middleware::authorize;
pub use session::{SessionClaims, SessionKey};

/// Cookie carrying the session token for browser clients.
pub const SESSION_COOKIE: &str = "fd_session";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("authentication required")]
    Missing,

    #[error("session token is malformed")]
    Malformed,

    #[error("session token is invalid")]
    Tampered,

    #[error("session has expired")]
    Expired,

    #[error("failed to seal session: {0}")]
    Seal(String),
}

/// The authenticated caller of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl From<SessionClaims> for Principal {
    fn from(claims: SessionClaims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
            expires_at: claims.exp,
        }
    }
}

impl Principal {
    /// Span attributing the work inside it to this caller.
    pub fn span(&self) -> Span {
        info_span!("caller", user_id = %self.user_id, role = %self.role)
    }
}
