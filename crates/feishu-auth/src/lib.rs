//! Tenant access token handling for the Feishu open platform.
//!
//! [`TokenCache`] hands out a bearer token and refreshes it ahead of expiry
//! through a [`TokenExchange`], normally the [`TenantTokenEndpoint`].

pub mod cache;
pub mod credential;
pub mod error;
pub mod exchange;

pub use cache::{TokenCache, DEFAULT_REFRESH_MARGIN_SECS};
pub use credential::{Credential, IssuedToken};
pub use error::AuthError;
pub use exchange::{TenantTokenEndpoint, TokenExchange};
