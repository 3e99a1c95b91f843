//! Authentication error types.

use feishu_core::{NetworkError, ReqwestErrorExt};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("App ID or app secret is not configured")]
    MissingCredentials,

    /// The provider answered with a non-zero envelope code.
    #[error("Token exchange failed [{code}]: {message}")]
    ExchangeFailed { code: i64, message: String },

    #[error("Token endpoint returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.into_network_error())
    }
}

impl AuthError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingCredentials => {
                "App credentials are missing. Set your App ID and App Secret.".to_string()
            }
            Self::ExchangeFailed { message, .. } => format!("Sign-in failed: {}", message),
            Self::HttpStatus { status, .. } => {
                format!("Sign-in failed (HTTP {}). Please try again.", status)
            }
            Self::InvalidResponse(_) => {
                "Received an unexpected sign-in response. Please try again.".to_string()
            }
            Self::Network(e) => e.user_message().to_string(),
        }
    }
}
