//! Authenticated session entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use casahub_core::types::UserId;

/// A credential bundle proving an authenticated identity.
///
/// Exclusively owned by the session store. A session is replaced
/// wholesale, never partially mutated, and at most one is current.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token presented to the backend on every request.
    pub access_token: String,
    /// Token exchanged for a new session when the access token expires.
    pub refresh_token: String,
    /// Instant at which the access token stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// The identity this session authenticates.
    pub user_id: UserId,
}

impl Session {
    /// Whether the access token has expired at the given instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
