//! Tenant access token exchange against the Feishu identity provider.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use feishu_core::{credentials_configured, AuthConfig, FeishuConfig};

use crate::credential::{IssuedToken, DEFAULT_TTL_SECS};
use crate::error::AuthError;

const TENANT_TOKEN_PATH: &str = "/auth/v3/tenant_access_token/internal";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Source of fresh tenant tokens.
pub trait TokenExchange: Send + Sync {
    /// Perform one credential exchange. Implementations must not retry.
    fn exchange(&self) -> impl Future<Output = Result<IssuedToken, AuthError>> + Send;
}

#[derive(Debug, Serialize)]
struct TenantTokenRequest<'a> {
    app_id: &'a str,
    app_secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct TenantTokenResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    tenant_access_token: Option<String>,
    expire: Option<u64>,
}

/// Exchanges app credentials for a tenant access token over HTTP.
pub struct TenantTokenEndpoint {
    client: reqwest::Client,
    base_url: String,
    app_id: String,
    app_secret: String,
}

impl TenantTokenEndpoint {
    pub fn new(base_url: &str, app_id: &str, app_secret: &str) -> Result<Self, AuthError> {
        Self::with_timeout(
            base_url,
            app_id,
            app_secret,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    pub fn with_timeout(
        base_url: &str,
        app_id: &str,
        app_secret: &str,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            app_id: app_id.to_string(),
            app_secret: app_secret.to_string(),
        })
    }

    pub fn from_config(feishu: &FeishuConfig, auth: &AuthConfig) -> Result<Self, AuthError> {
        Self::with_timeout(
            &feishu.base_url,
            &feishu.app_id,
            &feishu.app_secret,
            Duration::from_secs(auth.request_timeout_secs),
        )
    }

    #[tracing::instrument(skip(self), fields(app_id = %self.app_id), level = "info")]
    async fn request_token(&self) -> Result<IssuedToken, AuthError> {
        if !credentials_configured(&self.app_id, &self.app_secret) {
            return Err(AuthError::MissingCredentials);
        }

        let url = format!("{}{}", self.base_url, TENANT_TOKEN_PATH);

        let response = self
            .client
            .post(&url)
            .json(&TenantTokenRequest {
                app_id: &self.app_id,
                app_secret: &self.app_secret,
            })
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        let body: TenantTokenResponse = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(e) if status.is_success() => {
                return Err(AuthError::InvalidResponse(format!("{}", e)));
            }
            Err(_) => {
                return Err(AuthError::HttpStatus {
                    status: status.as_u16(),
                    body: truncate(&text, 500),
                });
            }
        };

        if body.code != 0 {
            tracing::warn!(code = body.code, "Tenant token exchange rejected: {}", body.msg);
            return Err(AuthError::ExchangeFailed {
                code: body.code,
                message: if body.msg.is_empty() {
                    "unknown error".to_string()
                } else {
                    body.msg
                },
            });
        }

        if !status.is_success() {
            return Err(AuthError::HttpStatus {
                status: status.as_u16(),
                body: truncate(&text, 500),
            });
        }

        let token = body
            .tenant_access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::InvalidResponse("missing tenant_access_token".into()))?;

        let ttl_seconds = body.expire.unwrap_or(DEFAULT_TTL_SECS);
        tracing::info!(ttl_seconds, "Obtained tenant access token");

        Ok(IssuedToken { token, ttl_seconds })
    }
}

impl TokenExchange for TenantTokenEndpoint {
    async fn exchange(&self) -> Result<IssuedToken, AuthError> {
        self.request_token().await
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
