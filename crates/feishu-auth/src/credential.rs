use chrono::{DateTime, Duration, Utc};

/// Token lifetime assumed when the provider omits `expire`.
pub const DEFAULT_TTL_SECS: u64 = 7200;

/// A token as handed out by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,

    /// Lifetime in seconds, relative to the moment of issue
    pub ttl_seconds: u64,
}

/// Cached tenant access token with its absolute expiry
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Anchor an issued token's TTL at `now`.
    pub fn issued_at(issued: IssuedToken, now: DateTime<Utc>) -> Self {
        let expires_at = i64::try_from(issued.ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            token: issued.token,
            expires_at,
        }
    }

    /// True once `now` is within `margin` of expiry
    pub fn needs_refresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at
            .checked_sub_signed(margin)
            .map_or(true, |refresh_at| now >= refresh_at)
    }
}
