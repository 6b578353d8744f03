//! OAuth 2.0 session handling for the CxOne platform client.
//!
//! Acquires access tokens from the tenant's identity provider and hands out a
//! bearer-authenticating transport for the request dispatcher.
//!
//! # Components
//!
//! - [`oauth`]: token endpoint exchange: client-credentials and refresh-token grants
//! - [`token_source`]: cached tokens with on-demand refresh
//! - [`session`]: the two session entry points and the authenticated transport
//! - [`claims`]: unverified decoding of license/entitlement claims

pub mod claims;
pub mod error;
pub mod oauth;
pub mod session;
pub mod token_source;

pub use claims::{License, LicenseData, TokenClaims};
pub use error::{OAuthError, Result};
pub use oauth::{API_KEY_CLIENT_ID, OAuthConfig, OAuthTokens};
pub use session::{AuthSession, AuthTransport, Credentials, build_http_client};
pub use token_source::{
    ClientCredentialsSource, RefreshTokenSource, SharedTokenSource, StaticTokenSource,
    TokenSource,
};
