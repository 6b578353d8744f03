//! Configuration for the CxOne client.
//!
//! TOML profiles, each naming a tenant's endpoints, how to find its
//! credentials, and optional polling limit overrides. The user config file and
//! a project-local `cxone.toml` are merged profile by profile.
//!
//! Secrets are read from environment variables; inline secrets are accepted
//! with a warning.

pub mod discovery;
pub mod error;
pub mod profile;
pub mod secrets;

pub use discovery::{
    CONFIG_DIR_ENV, ConfigSource, LoadedConfig, load_config, load_config_file,
    load_config_with_options, log_dir, save_config, xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use profile::{AuthConfig, CxOneConfig, PollingOverrides, Profile};
pub use secrets::{ResolvedSecret, SecretSource, resolve_secret};
