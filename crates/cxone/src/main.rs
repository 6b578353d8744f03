//! cxone - command-line client for the CxOne application security platform.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{config, flags, license, request, status, vars};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// cxone - command-line client for the CxOne application security platform
#[derive(Parser)]
#[command(name = "cxone")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Config profile to use (default: current-profile)
    #[arg(long, global = true, env = "CXONE_PROFILE")]
    pub profile: Option<String>,

    #[command(flatten)]
    pub connection: commands::ConnectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect and show tenant status
    Status(status::StatusArgs),

    /// List feature flags or check one
    Flags(flags::FlagsArgs),

    /// Show license entitlements
    License(license::LicenseArgs),

    /// Show effective polling limits
    Vars(vars::VarsArgs),

    /// Send a raw authenticated request
    Request(request::RequestArgs),

    /// Profile management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable, stderr) + rotating JSON file with request diagnostics
    let filter = if cli.verbose {
        "cxone=debug,cxone_client=debug,cxone_oauth=debug,cxone_config=debug,cxone_client::diagnostics=off,info"
    } else {
        "cxone=info,cxone_client=warn,cxone_oauth=warn,cxone_client::diagnostics=off,warn"
    };

    let log_dir = cxone_config::log_dir().unwrap_or_else(|| std::path::PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "cxone.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "cxone=trace,cxone_client=trace,cxone_oauth=trace,cxone_config=trace,info",
                )),
        )
        .init();

    let loaded = cxone_config::load_config(None)?;
    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        profile: cli.profile,
        connection: cli.connection,
        config: loaded,
    };

    match cli.command {
        Commands::Status(args) => status::run(args, &ctx).await,
        Commands::Flags(args) => flags::run(args, &ctx).await,
        Commands::License(args) => license::run(args, &ctx).await,
        Commands::Vars(args) => vars::run(args, &ctx).await,
        Commands::Request(args) => request::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
