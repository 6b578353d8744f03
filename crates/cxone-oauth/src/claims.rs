//! License and entitlement claims carried in the access token.
//!
//! Decoding is structural only; the signature is not checked.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::{OAuthError, Result};

/// Claims of interest from a platform access token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenClaims {
    #[serde(rename = "ast-license")]
    pub license: License,
    #[serde(rename = "is-service-user")]
    pub is_service_user: Option<String>,
    #[serde(rename = "ast-base-url")]
    pub ast_base_url: Option<String>,
    pub iss: Option<String>,
    /// Subject (user id).
    pub sub: Option<String>,
    /// Display name.
    pub name: Option<String>,
    pub email: Option<String>,
    pub tenant_id: Option<String>,
    pub tenant_name: Option<String>,
    pub exp: Option<i64>,
    pub iat: Option<i64>,
}

/// Tenant license record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct License {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "TenantID")]
    pub tenant_id: String,
    #[serde(rename = "PackageName")]
    pub package_name: String,
    #[serde(rename = "LicenseData")]
    pub data: LicenseData,
}

/// Entitlements granted by the license.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LicenseData {
    pub allowed_engines: Vec<String>,
    pub api_security_enabled: bool,
    pub codebashing_enabled: bool,
    pub dast_enabled: bool,
    pub max_concurrent_scans: i64,
    pub scs_enabled: bool,
    pub service_type: String,
    pub services: Vec<String>,
    pub users_count: i64,
}

impl TokenClaims {
    /// Decode the claim segment of a compact JWS without verifying it.
    pub fn decode(access_token: &str) -> Result<Self> {
        let parts: Vec<&str> = access_token.split('.').collect();
        if parts.len() != 3 {
            return Err(OAuthError::Decode(format!(
                "expected 3 token segments, found {}",
                parts.len()
            )));
        }

        let payload = URL_SAFE_NO_PAD
            .decode(parts[1].trim_end_matches('='))
            .map_err(|e| OAuthError::Decode(format!("invalid claims encoding: {}", e)))?;

        serde_json::from_slice(&payload)
            .map_err(|e| OAuthError::Decode(format!("invalid claims JSON: {}", e)))
    }

    /// Case-insensitive check against the license's allowed engines.
    pub fn allows_engine(&self, engine: &str) -> bool {
        self.license
            .data
            .allowed_engines
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(engine))
    }
}
