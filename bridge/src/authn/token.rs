//! OAuth token model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A user's OAuth credential for the assistant's event gateway.
///
/// One live token per user; refresh rotates both tokens in place under the
/// same key. Created on account linking, never deleted by the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthToken {
    pub user_id: String,

    pub access_token: String,

    pub refresh_token: String,

    pub token_type: String,

    /// Lifetime in seconds, counted from `created_at`
    pub expires_in: i64,

    pub created_at: DateTime<Utc>,

    /// Authorization code the credential was linked with
    #[serde(default)]
    pub code: Option<String>,
}

impl OAuthToken {
    /// Expiry instant
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::seconds(self.expires_in)
    }

    /// Whether the token is still usable at `now`.
    ///
    /// No clock-skew margin is applied: a token is valid up to the exact
    /// second the authorization server granted. Callers wanting slack
    /// should pass a shifted `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_in: i64, created_secs_ago: i64) -> OAuthToken {
        OAuthToken {
            user_id: "user-1".to_string(),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            token_type: "bearer".to_string(),
            expires_in,
            created_at: Utc::now() - Duration::seconds(created_secs_ago),
            code: None,
        }
    }

    #[test]
    fn test_expired_token_is_invalid() {
        assert!(!token(5, 10).is_valid_at(Utc::now()));
    }

    #[test]
    fn test_fresh_token_is_valid() {
        assert!(token(3600, 10).is_valid_at(Utc::now()));
    }

    #[test]
    fn test_validity_boundary_is_exclusive() {
        let now = Utc::now();
        let at_boundary = OAuthToken {
            created_at: now - Duration::seconds(60),
            expires_in: 60,
            ..token(0, 0)
        };
        assert!(!at_boundary.is_valid_at(now));
        assert!(at_boundary.is_valid_at(now - Duration::seconds(1)));
    }
}
