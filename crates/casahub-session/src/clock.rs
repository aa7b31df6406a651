//! Pure expiry math for sessions.
//!
//! Kept free of any state or clock source so the liveness monitor's
//! decisions stay trivially testable: the caller supplies `now`.

use chrono::{DateTime, Utc};

use casahub_entity::session::Session;

/// Remaining seconds until the session's access token expires.
///
/// Negative when the token is already expired.
pub fn seconds_to_expiry(session: &Session, now: DateTime<Utc>) -> i64 {
    (session.expires_at - now).num_seconds()
}

#[cfg(test)]
mod tests {
    use super::*;
    use casahub_core::types::UserId;
    use chrono::Duration;

    fn session_expiring_in(secs: i64, now: DateTime<Utc>) -> Session {
        Session {
            access_token: "access".into(),
            refresh_token: "refresh".into(),
            expires_at: now + Duration::seconds(secs),
            user_id: UserId::new(),
        }
    }

    #[test]
    fn test_remaining_seconds() {
        let now = Utc::now();
        assert_eq!(seconds_to_expiry(&session_expiring_in(90, now), now), 90);
        assert_eq!(seconds_to_expiry(&session_expiring_in(0, now), now), 0);
        assert_eq!(seconds_to_expiry(&session_expiring_in(-30, now), now), -30);
    }
}
