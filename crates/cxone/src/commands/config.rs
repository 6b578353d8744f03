//! Config command - profile management.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use console::{Style, style};

use cxone_config::{AuthConfig, CxOneConfig, Profile};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show loaded config files and profiles
    Show,

    /// Show the user config file path
    Path,

    /// Switch the current profile
    UseProfile {
        /// Profile name
        name: String,
    },

    /// Create or update a profile in the user config
    SetProfile {
        /// Profile name
        name: String,

        /// Platform API URL
        #[arg(long = "url")]
        base_url: Option<String>,

        /// Identity provider URL
        #[arg(long = "iam")]
        iam_url: Option<String>,

        /// Tenant name
        #[arg(long = "tenant-name")]
        tenant: Option<String>,

        /// Read the API key from this environment variable
        #[arg(long, conflicts_with = "oauth_client")]
        api_key_env: Option<String>,

        /// Authenticate as this OAuth client
        #[arg(long, requires = "client_secret_env")]
        oauth_client: Option<String>,

        /// Read the client secret from this environment variable
        #[arg(long)]
        client_secret_env: Option<String>,
    },

    /// Delete a profile from the user config
    RemoveProfile {
        /// Profile name
        name: String,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(),
        ConfigCommand::UseProfile { name } => cmd_use_profile(&name),
        ConfigCommand::SetProfile {
            name,
            base_url,
            iam_url,
            tenant,
            api_key_env,
            oauth_client,
            client_secret_env,
        } => {
            let auth = match (api_key_env, oauth_client, client_secret_env) {
                (Some(var), _, _) => Some(AuthConfig::api_key_env(var)),
                (None, Some(id), Some(var)) => Some(AuthConfig::client_secret_env(id, var)),
                _ => None,
            };
            let update = Profile {
                base_url,
                iam_url,
                tenant,
                auth,
                ..Default::default()
            };
            cmd_set_profile(&name, update)
        }
        ConfigCommand::RemoveProfile { name } => cmd_remove_profile(&name),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = &ctx.config;
    let config = &loaded.config;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!("{}", style("Config files").bold());
    for source in &loaded.sources {
        let marker = if source.loaded { "●" } else { "○" };
        println!("  {} {}", marker, source.path.display());
    }
    println!();

    if config.profiles.is_empty() {
        println!("No profiles configured.");
        println!();
        println!("Create one with:");
        println!(
            "  cxone config set-profile prod --url https://eu.ast.example.net \
             --iam https://eu.iam.example.net --tenant-name acme --api-key-env CXONE_APIKEY"
        );
        return Ok(());
    }

    let current = config.current_profile.as_deref();
    println!("CURRENT   NAME            TENANT          PLATFORM");
    for (name, profile) in &config.profiles {
        let marker = if current == Some(name.as_str()) { "*" } else { " " };
        println!(
            "{}         {:<15} {:<15} {}",
            marker,
            name,
            profile.tenant.as_deref().unwrap_or("-"),
            profile.base_url.as_deref().unwrap_or("-"),
        );
    }

    if ctx.verbose {
        for warning in &loaded.warnings {
            println!("{} {}", dim.apply_to("warning:"), warning);
        }
    }
    Ok(())
}

fn cmd_path() -> Result<()> {
    match cxone_config::xdg_config_path() {
        Some(path) => println!("{}", path.display()),
        None => println!("Could not determine config directory"),
    }
    Ok(())
}

fn cmd_use_profile(name: &str) -> Result<()> {
    let mut config = load_user_config()?;
    config.use_profile(name)?;
    save_user_config(&config)?;
    println!("Switched to profile \"{}\".", name);
    Ok(())
}

fn cmd_set_profile(name: &str, update: Profile) -> Result<()> {
    let mut config = load_user_config()?;

    // Layering an update config reuses the field-by-field merge.
    let mut layer = CxOneConfig::new();
    let is_new = config.profile(name).is_none();
    layer.set_profile(name, update);
    config.merge(layer);

    if is_new {
        println!("Profile \"{}\" created.", name);
    } else {
        println!("Profile \"{}\" modified.", name);
    }

    if config.current_profile.is_none() && config.profiles.len() == 1 {
        config.use_profile(name)?;
        println!("Profile \"{}\" set as current profile.", name);
    }

    save_user_config(&config)
}

fn cmd_remove_profile(name: &str) -> Result<()> {
    let mut config = load_user_config()?;

    if config.remove_profile(name).is_none() {
        bail!("profile \"{}\" not found", name);
    }
    save_user_config(&config)?;
    println!("Profile \"{}\" deleted.", name);
    if config.current_profile.is_none() {
        println!("Note: No current profile. Use 'cxone config use-profile <name>' to set one.");
    }
    Ok(())
}

/// The user config file alone; project-local layers are never written.
fn load_user_config() -> Result<CxOneConfig> {
    let Some(path) = cxone_config::xdg_config_path() else {
        bail!("could not determine config directory");
    };
    if !path.is_file() {
        return Ok(CxOneConfig::new());
    }
    Ok(cxone_config::load_config_file(&path)?)
}

fn save_user_config(config: &CxOneConfig) -> Result<()> {
    let Some(path) = cxone_config::xdg_config_path() else {
        bail!("could not determine config directory");
    };
    cxone_config::save_config(config, &path)?;
    Ok(())
}
