//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/cxone/config.toml` (XDG user config)
//! 2. `./cxone.toml` (project-local)
//! 3. CLI arguments (handled externally)

use std::path::{Path, PathBuf};

use crate::{ConfigError, CxOneConfig, Result};

const PROJECT_CONFIG_FILE: &str = "cxone.toml";
const USER_CONFIG_FILE: &str = "config.toml";
const APP_NAME: &str = "cxone";

/// Log directory name within the user config directory.
const LOG_DIR: &str = "logs";

/// Environment variable to override the config directory.
pub const CONFIG_DIR_ENV: &str = "CXONE_CONFIG_DIR";

/// One config file checked during discovery.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// Whether the file existed and parsed.
    pub loaded: bool,
}

/// Merged configuration plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: CxOneConfig,
    /// Layers checked, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// First layer that loaded; the natural target for `save_config`.
    pub source: Option<ConfigSource>,
    /// Malformed layers and plaintext secrets. Never fatal.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Discover and merge the user and project-local config layers.
///
/// `project_dir` defaults to the working directory.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Like [`load_config`], with `config_dir` replacing the user config directory
/// (`CXONE_CONFIG_DIR` and the platform default are then ignored).
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let user_layer = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => xdg_config_path(),
    };
    let project_layer = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));

    let mut config = CxOneConfig::new();
    let mut warnings = Vec::new();
    let sources: Vec<ConfigSource> = user_layer
        .into_iter()
        .chain(std::iter::once(project_layer))
        .map(|path| load_layer(&mut config, path, &mut warnings))
        .collect();

    check_plaintext_secrets(&config, &mut warnings);
    let source = sources.iter().find(|s| s.loaded).cloned();

    Ok(LoadedConfig {
        config,
        sources,
        source,
        warnings,
    })
}

/// Load a single config file (no discovery).
pub fn load_config_file(path: &Path) -> Result<CxOneConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    CxOneConfig::from_toml(&contents)
}

/// Write `config` to `path`, creating parent directories.
pub fn save_config(config: &CxOneConfig, path: &Path) -> Result<()> {
    let contents = config.to_toml()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;
    }
    std::fs::write(path, contents).map_err(|e| write_error(path, e))
}

fn write_error(path: &Path, source: std::io::Error) -> ConfigError {
    ConfigError::WriteFile {
        path: path.display().to_string(),
        source,
    }
}

/// User config file: `config.toml` inside [`xdg_config_dir`].
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// User config directory: `CXONE_CONFIG_DIR` if set, else the platform config
/// dir (`~/.config/cxone`, `~/Library/Application Support/cxone`).
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Directory for log files, under the user config directory.
pub fn log_dir() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(LOG_DIR))
}

/// Merge the file at `path` into `config` if it exists. Parse failures become
/// warnings and leave `config` untouched.
fn load_layer(config: &mut CxOneConfig, path: PathBuf, warnings: &mut Vec<String>) -> ConfigSource {
    if !path.is_file() {
        return ConfigSource {
            path,
            loaded: false,
        };
    }

    let loaded = match load_config_file(&path) {
        Ok(layer) => {
            tracing::debug!(path = %path.display(), "Loaded config layer");
            config.merge(layer);
            true
        }
        Err(e) => {
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            false
        }
    };
    ConfigSource { path, loaded }
}

/// Warn about secrets stored inline in the merged config.
fn check_plaintext_secrets(config: &CxOneConfig, warnings: &mut Vec<String>) {
    let inline = config.profiles.iter().filter(|(_, profile)| {
        profile
            .auth
            .as_ref()
            .is_some_and(|auth| auth.has_plaintext_secret())
    });
    for (name, _) in inline {
        warnings.push(format!(
            "[profiles.{}.auth] contains a plaintext secret. \
             Consider using an environment variable instead.",
            name
        ));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
