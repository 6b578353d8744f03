//! Status command - connects and shows tenant identity.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use serde::Serialize;

use super::Context;

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Also list enabled feature flags
    #[arg(short, long)]
    pub detailed: bool,
}

#[derive(Debug, Serialize)]
struct StatusOutput {
    connected: bool,
    tenant: Option<String>,
    tenant_id: Option<String>,
    app_id: Option<String>,
    base_url: Option<String>,
    package: Option<String>,
    flags: usize,
    error: Option<String>,
}

/// Run the status command.
pub async fn run(args: StatusArgs, ctx: &Context) -> Result<()> {
    let dim = Style::new().dim();

    let client = match ctx.connect().await {
        Ok(client) => client,
        Err(e) => {
            if ctx.json_output {
                let output = StatusOutput {
                    connected: false,
                    tenant: None,
                    tenant_id: None,
                    app_id: None,
                    base_url: None,
                    package: None,
                    flags: 0,
                    error: Some(format!("{:#}", e)),
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
                return Ok(());
            }
            println!();
            println!("{}", style("CxOne Status").bold());
            println!("{}", dim.apply_to("─".repeat(40)));
            println!();
            println!(
                "  {} {}",
                dim.apply_to("Status:"),
                Style::new().red().apply_to("● not connected")
            );
            println!("  {} {:#}", dim.apply_to("Error:"), e);
            println!();
            return Err(e);
        }
    };

    if ctx.json_output {
        let output = StatusOutput {
            connected: true,
            tenant: Some(client.tenant().to_string()),
            tenant_id: Some(client.tenant_id().to_string()),
            app_id: Some(client.app_id().to_string()),
            base_url: Some(client.base_url().to_string()),
            package: Some(client.license().package_name.clone()).filter(|p| !p.is_empty()),
            flags: client.flags().len(),
            error: None,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let unknown = |v: &str| {
        if v.is_empty() {
            dim.apply_to("unknown".to_string()).to_string()
        } else {
            v.to_string()
        }
    };

    println!();
    println!("{}", style("CxOne Status").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    println!(
        "  {} {}",
        dim.apply_to("Status:"),
        Style::new().green().apply_to("● connected")
    );
    println!("  {} {}", dim.apply_to("Tenant:"), client.tenant());
    println!("  {} {}", dim.apply_to("Tenant ID:"), unknown(client.tenant_id()));
    println!("  {} {}", dim.apply_to("App ID:"), unknown(client.app_id()));
    println!("  {} {}", dim.apply_to("Platform:"), client.base_url());
    println!(
        "  {} {}",
        dim.apply_to("License:"),
        unknown(&client.license().package_name)
    );
    println!("  {} {}", dim.apply_to("Flags:"), client.flags().len());

    if args.detailed {
        let mut enabled: Vec<_> = client
            .flags()
            .iter()
            .filter(|(_, on)| **on)
            .map(|(name, _)| name.as_str())
            .collect();
        enabled.sort_unstable();

        println!();
        println!("{}", dim.apply_to("─".repeat(40)));
        println!();
        for name in enabled {
            println!("  {} {}", Style::new().green().apply_to("●"), name);
        }
    }

    println!();
    Ok(())
}
