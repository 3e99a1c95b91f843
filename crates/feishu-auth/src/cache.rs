//! Refresh-ahead cache for the tenant access token.

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use feishu_core::{AuthConfig, FeishuConfig};

use crate::credential::Credential;
use crate::error::AuthError;
use crate::exchange::{TenantTokenEndpoint, TokenExchange};

/// Refresh tokens this many seconds before they expire.
pub const DEFAULT_REFRESH_MARGIN_SECS: i64 = 300;

/// Holds one [`Credential`] and refreshes it through `E` when it is missing
/// or within the refresh margin of expiry.
///
/// The lock is held across the exchange, so concurrent callers wait for a
/// single refresh instead of each starting their own.
pub struct TokenCache<E = TenantTokenEndpoint> {
    exchange: E,
    margin: Duration,
    credential: Mutex<Option<Credential>>,
}

impl TokenCache<TenantTokenEndpoint> {
    pub fn from_config(feishu: &FeishuConfig, auth: &AuthConfig) -> Result<Self, AuthError> {
        let endpoint = TenantTokenEndpoint::from_config(feishu, auth)?;
        let margin_secs = i64::try_from(auth.refresh_margin_secs).unwrap_or(i64::MAX);
        Ok(Self::new(endpoint).with_refresh_margin(
            Duration::try_seconds(margin_secs).unwrap_or(Duration::MAX),
        ))
    }
}

impl<E: TokenExchange> TokenCache<E> {
    pub fn new(exchange: E) -> Self {
        Self {
            exchange,
            margin: Duration::seconds(DEFAULT_REFRESH_MARGIN_SECS),
            credential: Mutex::new(None),
        }
    }

    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.margin = margin;
        self
    }

    /// Return the cached token, refreshing it first if needed.
    ///
    /// # Errors
    /// Returns the exchange's [`AuthError`] unchanged; no retry is attempted.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn get_token(&self) -> Result<String, AuthError> {
        let mut cached = self.credential.lock().await;

        if let Some(credential) = cached.as_ref() {
            if !credential.needs_refresh(Utc::now(), self.margin) {
                return Ok(credential.token.clone());
            }
            tracing::debug!(expires_at = %credential.expires_at, "Tenant token due for refresh");
        }

        let issued = self.exchange.exchange().await?;
        let credential = Credential::issued_at(issued, Utc::now());
        let token = credential.token.clone();
        *cached = Some(credential);

        Ok(token)
    }

    /// Check whether a token can be obtained with the current credentials.
    pub async fn verify(&self) -> bool {
        match self.get_token().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Credential verification failed: {}", e);
                false
            }
        }
    }

    /// Drop the cached token so the next call refreshes.
    pub async fn invalidate(&self) {
        *self.credential.lock().await = None;
    }

    /// Expiry of the cached token, if any.
    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.credential.lock().await.as_ref().map(|c| c.expires_at)
    }
}
