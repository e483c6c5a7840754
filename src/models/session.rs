//! Session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Session entity for user authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (token)
    pub id: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Start a session for `user_id` that lives for `ttl`
    pub fn new(id: String, user_id: i64, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            expires_at: now + ttl,
            created_at: now,
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_expiry() {
        let live = Session::new("live".to_string(), 1, Duration::days(7));
        assert!(!live.is_expired());

        let stale = Session::new("stale".to_string(), 1, Duration::seconds(-1));
        assert!(stale.is_expired());
    }
}
