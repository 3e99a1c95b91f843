//! Calendar-specific error types.

use feishu_auth::AuthError;
use feishu_core::{NetworkError, ReqwestErrorExt};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Token expired")]
    TokenExpired,

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Envelope with a non-zero `code`.
    #[error("API error [{code}]: {message}")]
    Api { code: i64, message: String },

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

impl From<reqwest::Error> for CalendarError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.into_network_error())
    }
}

impl CalendarError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(e) => e.user_message(),
            Self::TokenExpired => "Your access token expired. Please try again.".to_string(),
            Self::RateLimited(secs) => format!("Too many requests. Please wait {} seconds.", secs),
            Self::Api { message, .. } => format!("Calendar error: {}", message),
            Self::Http { status, .. } => format!("Calendar request failed (HTTP {}).", status),
            Self::InvalidTimestamp(_) => "The calendar returned an unreadable time.".to_string(),
            Self::InvalidQuery(msg) => format!("Invalid search: {}", msg),
            Self::Network(e) => e.user_message().to_string(),
        }
    }

    /// Whether the cached token was rejected and a fresh one should be tried.
    pub fn should_refresh_token(&self) -> bool {
        matches!(self, Self::TokenExpired)
    }
}
