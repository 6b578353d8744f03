//! Authenticated HTTP client for the CxOne application security platform.
//!
//! The client authenticates against the tenant's identity provider with either
//! a confidential client secret or an API key, attaches the bearer token to
//! every request, and reports API failures separately from transport failures.
//!
//! # Example
//!
//! ```no_run
//! use cxone_client::{ApiRequest, CxOneClient, Result, Surface};
//!
//! # async fn example() -> Result<()> {
//! let client = CxOneClient::builder()
//!     .base_url("https://eu.ast.example.net")
//!     .iam_url("https://eu.iam.example.net")
//!     .tenant("acme")
//!     .client_secret("ci-bot", "s3cret")
//!     .build()
//!     .await?;
//!
//! println!("Connected to {}", client);
//! println!("SAST licensed: {}", client.is_engine_allowed("sast"));
//!
//! // Identity-provider admin API
//! let groups = client
//!     .send(ApiRequest::get(Surface::realm_admin(), "/groups"))
//!     .await?;
//! println!("{}", String::from_utf8_lossy(&groups));
//! # Ok(())
//! # }
//! ```
//!
//! # Surfaces
//!
//! - **Api**: `{base_url}/api{path}`
//! - **Realm**: `{iam_url}{base}/realms/{tenant}{path}`
//! - **Console**: `{iam_url}{base}/{tenant}{path}`

pub mod api;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod headers;
pub mod types;
pub mod vars;

pub use client::{ClientBuilder, CxOneClient};
pub use dispatch::{ApiRequest, DIAGNOSTICS_TARGET, Dispatcher, Endpoints, Surface};
pub use error::{Error, Result};
pub use headers::Headers;
pub use types::*;
pub use vars::ClientVars;

pub use cxone_oauth::{Credentials, License, LicenseData, TokenClaims};
pub use reqwest::Method;
pub use tokio_util::sync::CancellationToken;
