//! Connection profiles: named bundles of tenant endpoints, credentials and
//! polling limits.
//!
//! ```toml
//! current-profile = "prod"
//!
//! [profiles.prod]
//! base-url = "https://eu.ast.example.net"
//! iam-url = "https://eu.iam.example.net"
//! tenant = "acme"
//!
//! [profiles.prod.auth]
//! type = "api-key"
//! api-key-env = "CXONE_APIKEY"
//!
//! [profiles.prod.polling]
//! scan-polling-max-seconds = 3600
//!
//! [profiles.ci]
//! tenant = "acme"
//!
//! [profiles.ci.auth]
//! type = "client-secret"
//! client-id = "ci-bot"
//! client-secret-env = "CI_CXONE_SECRET"
//! ```

use std::collections::BTreeMap;

use cxone_client::{ClientVars, Credentials};
use serde::{Deserialize, Serialize};

use crate::secrets::{API_KEY_ENV, CLIENT_SECRET_ENV, resolve_secret};
use crate::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Root config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CxOneConfig {
    /// Name of the current/default profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_profile: Option<String>,

    /// Named profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl CxOneConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get a profile by name.
    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Get the current profile, if set and valid.
    pub fn current(&self) -> Option<(&str, &Profile)> {
        let name = self.current_profile.as_deref()?;
        self.profile(name).map(|p| (name, p))
    }

    /// Set the current profile by name.
    ///
    /// Returns an error if the profile doesn't exist.
    pub fn use_profile(&mut self, name: &str) -> Result<()> {
        if self.profiles.contains_key(name) {
            self.current_profile = Some(name.to_string());
            Ok(())
        } else {
            Err(ConfigError::ProfileNotFound(name.to_string()))
        }
    }

    /// Add or replace a profile.
    pub fn set_profile(&mut self, name: impl Into<String>, profile: Profile) {
        self.profiles.insert(name.into(), profile);
    }

    /// Remove a profile, clearing `current-profile` if it pointed at it.
    pub fn remove_profile(&mut self, name: &str) -> Option<Profile> {
        let removed = self.profiles.remove(name)?;
        if self.current_profile.as_deref() == Some(name) {
            self.current_profile = None;
        }
        Some(removed)
    }

    pub fn profile_names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    /// Merge another config layer on top of this one.
    ///
    /// Profiles present in both are merged field by field; `other` wins.
    pub fn merge(&mut self, other: CxOneConfig) {
        if other.current_profile.is_some() {
            self.current_profile = other.current_profile;
        }
        for (name, profile) in other.profiles {
            match self.profiles.get_mut(&name) {
                Some(existing) => existing.merge(profile),
                None => {
                    self.profiles.insert(name, profile);
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Profile
// ─────────────────────────────────────────────────────────────────────────────

/// One tenant connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Profile {
    /// Platform API host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Identity-provider host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iam_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,

    /// Polling limit overrides.
    #[serde(default, skip_serializing_if = "PollingOverrides::is_empty")]
    pub polling: PollingOverrides,
}

impl Profile {
    pub fn new(
        base_url: impl Into<String>,
        iam_url: impl Into<String>,
        tenant: impl Into<String>,
    ) -> Self {
        Self {
            base_url: Some(base_url.into()),
            iam_url: Some(iam_url.into()),
            tenant: Some(tenant.into()),
            ..Default::default()
        }
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    fn merge(&mut self, other: Profile) {
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.iam_url.is_some() {
            self.iam_url = other.iam_url;
        }
        if other.tenant.is_some() {
            self.tenant = other.tenant;
        }
        if other.auth.is_some() {
            self.auth = other.auth;
        }
        self.polling.merge(other.polling);
    }

    /// Resolve the configured credentials, reading secrets from the environment
    /// or the config file.
    pub fn resolve_credentials(&self, profile_name: &str) -> Result<Credentials> {
        let auth = self.auth.as_ref().ok_or_else(|| ConfigError::MissingField {
            field: "auth".to_string(),
            context: format!("profile '{}'", profile_name),
        })?;
        auth.resolve(profile_name)
    }

    /// Polling limits: defaults with this profile's overrides applied.
    pub fn client_vars(&self) -> ClientVars {
        self.polling.apply(ClientVars::default())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authentication
// ─────────────────────────────────────────────────────────────────────────────

/// Authentication configuration for a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AuthConfig {
    /// API key, exchanged as a refresh token.
    #[serde(rename_all = "kebab-case")]
    ApiKey {
        /// Environment variable holding the key.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_key_env: Option<String>,
        /// Inline key (plaintext).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_key: Option<String>,
    },

    /// Confidential OAuth client.
    #[serde(rename_all = "kebab-case")]
    ClientSecret {
        client_id: String,
        /// Environment variable holding the secret.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_secret_env: Option<String>,
        /// Inline secret (plaintext).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_secret: Option<String>,
    },
}

impl AuthConfig {
    /// API key auth read from an environment variable.
    pub fn api_key_env(var: impl Into<String>) -> Self {
        Self::ApiKey {
            api_key_env: Some(var.into()),
            api_key: None,
        }
    }

    /// Client secret auth read from an environment variable.
    pub fn client_secret_env(client_id: impl Into<String>, var: impl Into<String>) -> Self {
        Self::ClientSecret {
            client_id: client_id.into(),
            client_secret_env: Some(var.into()),
            client_secret: None,
        }
    }

    /// Whether a secret is stored inline in the config file.
    pub fn has_plaintext_secret(&self) -> bool {
        match self {
            Self::ApiKey { api_key, .. } => api_key.as_deref().is_some_and(|k| !k.is_empty()),
            Self::ClientSecret { client_secret, .. } => {
                client_secret.as_deref().is_some_and(|s| !s.is_empty())
            }
        }
    }

    /// Resolve into client credentials.
    pub fn resolve(&self, profile_name: &str) -> Result<Credentials> {
        match self {
            Self::ApiKey {
                api_key_env,
                api_key,
            } => {
                let env_var = api_key_env.as_deref().unwrap_or(API_KEY_ENV);
                let secret = resolve_secret(env_var, api_key.as_deref()).ok_or_else(|| {
                    ConfigError::SecretNotFound {
                        what: "API key".to_string(),
                        profile: profile_name.to_string(),
                        env_var: env_var.to_string(),
                    }
                })?;
                tracing::debug!(profile = profile_name, "API key from {}", secret.source);
                Ok(Credentials::api_key(secret.value))
            }
            Self::ClientSecret {
                client_id,
                client_secret_env,
                client_secret,
            } => {
                if client_id.is_empty() {
                    return Err(ConfigError::MissingField {
                        field: "client-id".to_string(),
                        context: format!("profile '{}'", profile_name),
                    });
                }
                let env_var = client_secret_env.as_deref().unwrap_or(CLIENT_SECRET_ENV);
                let secret = resolve_secret(env_var, client_secret.as_deref()).ok_or_else(|| {
                    ConfigError::SecretNotFound {
                        what: "client secret".to_string(),
                        profile: profile_name.to_string(),
                        env_var: env_var.to_string(),
                    }
                })?;
                tracing::debug!(profile = profile_name, "Client secret from {}", secret.source);
                Ok(Credentials::client_secret(client_id, secret.value))
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Polling
// ─────────────────────────────────────────────────────────────────────────────

macro_rules! polling_overrides {
    ($($field:ident),+ $(,)?) => {
        /// Per-profile overrides of [`ClientVars`]; unset fields keep the default.
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(default, rename_all = "kebab-case")]
        pub struct PollingOverrides {
            $(
                #[serde(skip_serializing_if = "Option::is_none")]
                pub $field: Option<u64>,
            )+
        }

        impl PollingOverrides {
            /// Apply the set overrides onto `vars`.
            pub fn apply(&self, mut vars: ClientVars) -> ClientVars {
                $(
                    if let Some(value) = self.$field {
                        vars.$field = value;
                    }
                )+
                vars
            }

            pub fn is_empty(&self) -> bool {
                true $(&& self.$field.is_none())+
            }

            fn merge(&mut self, other: PollingOverrides) {
                $(
                    if other.$field.is_some() {
                        self.$field = other.$field;
                    }
                )+
            }
        }
    };
}

polling_overrides!(
    migration_polling_max_seconds,
    migration_polling_delay_seconds,
    audit_engine_polling_max_seconds,
    audit_engine_polling_delay_seconds,
    audit_scan_polling_max_seconds,
    audit_scan_polling_delay_seconds,
    audit_language_polling_max_seconds,
    audit_language_polling_delay_seconds,
    audit_compile_polling_max_seconds,
    audit_compile_polling_delay_seconds,
    scan_polling_max_seconds,
    scan_polling_delay_seconds,
    project_application_link_polling_max_seconds,
    project_application_link_polling_delay_seconds,
);

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
