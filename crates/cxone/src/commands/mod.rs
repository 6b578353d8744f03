//! CLI command handlers.

pub mod config;
pub mod flags;
pub mod license;
pub mod request;
pub mod status;
pub mod vars;

use anyhow::{Context as _, Result, bail};
use clap::Args;
use cxone_client::{ClientVars, Credentials, CxOneClient};
use cxone_config::{LoadedConfig, Profile};

/// Connection settings given on the command line. Each one overrides the
/// profile's value.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Platform API URL
    #[arg(long, global = true, env = "CXONE_BASE_URI")]
    pub base_url: Option<String>,

    /// Identity provider URL
    #[arg(long, global = true, env = "CXONE_BASE_AUTH_URI")]
    pub iam_url: Option<String>,

    /// Tenant name
    #[arg(long, global = true, env = "CXONE_TENANT")]
    pub tenant: Option<String>,

    /// API key
    #[arg(long, global = true, env = "CXONE_APIKEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// OAuth client id (with --client-secret)
    #[arg(long, global = true, env = "CXONE_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[arg(long, global = true, env = "CXONE_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,
}

/// Shared context for all commands.
#[derive(Debug)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Profile requested with `--profile`.
    pub profile: Option<String>,
    pub connection: ConnectionArgs,
    /// Merged config files.
    pub config: LoadedConfig,
}

impl Context {
    /// The selected profile: `--profile`, else `current-profile`, else none.
    pub fn profile(&self) -> Result<Option<(String, Profile)>> {
        match &self.profile {
            Some(name) => {
                let profile = self
                    .config
                    .config
                    .profile(name)
                    .with_context(|| format!("profile '{}' not found", name))?;
                Ok(Some((name.clone(), profile.clone())))
            }
            None => Ok(self
                .config
                .config
                .current()
                .map(|(name, profile)| (name.to_string(), profile.clone()))),
        }
    }

    /// Polling limits: defaults with the profile's overrides.
    pub fn client_vars(&self) -> Result<ClientVars> {
        Ok(self
            .profile()?
            .map(|(_, profile)| profile.client_vars())
            .unwrap_or_default())
    }

    /// Connect using command-line settings over the selected profile.
    pub async fn connect(&self) -> Result<CxOneClient> {
        let selected = self.profile()?;
        let (name, profile) = match &selected {
            Some((name, profile)) => (name.as_str(), Some(profile)),
            None => ("<none>", None),
        };
        let args = &self.connection;

        let base_url = pick(&args.base_url, profile.and_then(|p| p.base_url.as_ref()))
            .context("no platform URL: pass --base-url or set base-url in a profile")?;
        let iam_url = pick(&args.iam_url, profile.and_then(|p| p.iam_url.as_ref()))
            .context("no identity provider URL: pass --iam-url or set iam-url in a profile")?;
        let tenant = pick(&args.tenant, profile.and_then(|p| p.tenant.as_ref()))
            .context("no tenant: pass --tenant or set tenant in a profile")?;
        let credentials = self.credentials(name, profile)?;

        tracing::debug!(profile = name, tenant = %tenant, "Connecting to {}", base_url);

        let mut client = CxOneClient::builder()
            .base_url(base_url)
            .iam_url(iam_url)
            .tenant(tenant)
            .credentials(credentials)
            .build()
            .await
            .context("failed to create client")?;

        if let Some(profile) = profile {
            client.set_client_vars(profile.client_vars());
        }
        Ok(client)
    }

    fn credentials(&self, name: &str, profile: Option<&Profile>) -> Result<Credentials> {
        let args = &self.connection;
        if let Some(api_key) = args.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(Credentials::api_key(api_key));
        }
        if let Some(client_id) = args.client_id.as_ref().filter(|id| !id.is_empty()) {
            let Some(secret) = args.client_secret.as_ref().filter(|s| !s.is_empty()) else {
                bail!("--client-id requires --client-secret (or CXONE_CLIENT_SECRET)");
            };
            return Ok(Credentials::client_secret(client_id, secret));
        }
        match profile {
            Some(profile) => Ok(profile.resolve_credentials(name)?),
            None => bail!("no credentials: pass --api-key or --client-id/--client-secret"),
        }
    }
}

fn pick(arg: &Option<String>, configured: Option<&String>) -> Option<String> {
    arg.as_ref()
        .filter(|v| !v.is_empty())
        .or(configured)
        .cloned()
}
