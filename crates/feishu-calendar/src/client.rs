//! Feishu calendar free/busy API client.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use tracing::instrument;

use feishu_auth::{TenantTokenEndpoint, TokenCache, TokenExchange};
use feishu_core::{Config, NetworkError};

use crate::error::CalendarError;
use crate::types::*;

const FREEBUSY_PATH: &str = "/calendar/v4/freebusy/list";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Per-user busy period lookup.
pub trait BusySource: Send + Sync {
    fn busy_periods(
        &self,
        user_id: &str,
        time_min: DateTime<FixedOffset>,
        time_max: DateTime<FixedOffset>,
    ) -> impl Future<Output = Result<Vec<BusyPeriod>, CalendarError>> + Send;
}

pub struct FreeBusyClient<E = TenantTokenEndpoint> {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenCache<E>>,
}

impl FreeBusyClient<TenantTokenEndpoint> {
    /// Build a client and its token cache from application config.
    pub fn from_config(config: &Config) -> Result<Self, CalendarError> {
        let tokens = Arc::new(TokenCache::from_config(&config.feishu, &config.auth)?);
        Self::with_timeout(
            &config.feishu.base_url,
            tokens,
            Duration::from_secs(config.scheduling.request_timeout_secs),
        )
    }
}

impl<E: TokenExchange> FreeBusyClient<E> {
    pub fn new(base_url: &str, tokens: Arc<TokenCache<E>>) -> Result<Self, CalendarError> {
        Self::with_timeout(base_url, tokens, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        base_url: &str,
        tokens: Arc<TokenCache<E>>,
        timeout: Duration,
    ) -> Result<Self, CalendarError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    /// Token cache shared with other callers.
    pub fn tokens(&self) -> &Arc<TokenCache<E>> {
        &self.tokens
    }

    /// Query one user's busy periods between two RFC 3339 instants.
    #[instrument(skip(self), level = "info")]
    pub async fn get_freebusy(
        &self,
        user_id: &str,
        time_min: &str,
        time_max: &str,
    ) -> Result<Vec<BusyPeriod>, CalendarError> {
        let token = self.tokens.get_token().await?;
        let url = format!("{}{}?user_id_type=open_id", self.base_url, FREEBUSY_PATH);

        let body = serde_json::json!({
            "time_min": time_min,
            "time_max": time_max,
            "user_id": user_id,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", token))
            .json(&body)
            .send()
            .await?;

        let data: FreeBusyData = self.handle_response(response).await?;
        tracing::debug!(count = data.freebusy_list.len(), "Received busy periods");
        Ok(data.freebusy_list)
    }

    /// Unwrap the `{code, msg, data}` envelope and map failures.
    async fn handle_response<T>(&self, response: reqwest::Response) -> Result<T, CalendarError>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        let status = response.status();

        if status.as_u16() == 401 {
            self.tokens.invalidate().await;
            return Err(CalendarError::TokenExpired);
        }

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(CalendarError::RateLimited(retry_after));
        }

        let text = response.text().await?;

        let envelope: ApiEnvelope<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(CalendarError::Http {
                    status: status.as_u16(),
                    body: text.chars().take(500).collect(),
                });
            }
            Err(e) => {
                return Err(CalendarError::Network(NetworkError::InvalidResponse(
                    format!("JSON parse error: {}", e),
                )));
            }
        };

        match envelope.code {
            Some(code) if code != 0 => Err(CalendarError::Api {
                code,
                message: if envelope.msg.is_empty() {
                    "unknown error".to_string()
                } else {
                    envelope.msg
                },
            }),
            None if !status.is_success() => Err(CalendarError::Http {
                status: status.as_u16(),
                body: text.chars().take(500).collect(),
            }),
            _ => Ok(envelope.data.unwrap_or_default()),
        }
    }
}

impl<E: TokenExchange> BusySource for FreeBusyClient<E> {
    async fn busy_periods(
        &self,
        user_id: &str,
        time_min: DateTime<FixedOffset>,
        time_max: DateTime<FixedOffset>,
    ) -> Result<Vec<BusyPeriod>, CalendarError> {
        self.get_freebusy(user_id, &time_min.to_rfc3339(), &time_max.to_rfc3339())
            .await
    }
}
