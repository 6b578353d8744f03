//! License command - shows entitlements decoded from the access token.

use anyhow::Result;
use clap::Args;
use console::{Style, style};

use super::Context;

/// Arguments for the license command.
#[derive(Args, Debug)]
pub struct LicenseArgs {
    /// Only report whether this engine is allowed (exit code 1 if not)
    #[arg(long)]
    pub engine: Option<String>,
}

/// Run the license command.
pub async fn run(args: LicenseArgs, ctx: &Context) -> Result<()> {
    let client = ctx.connect().await?;

    if let Some(engine) = args.engine {
        let allowed = client.is_engine_allowed(&engine);
        if ctx.json_output {
            println!("{}", serde_json::json!({ "engine": engine, "allowed": allowed }));
        } else {
            println!("{}", allowed);
        }
        if !allowed {
            std::process::exit(1);
        }
        return Ok(());
    }

    let license = client.license();
    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(license)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let yes_no = |b: bool| if b { "yes" } else { "no" };
    let data = &license.data;

    println!();
    println!("{}", style("License").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    println!("  {} {}", dim.apply_to("Package:"), license.package_name);
    println!("  {} {}", dim.apply_to("Tenant:"), license.tenant_id);
    println!(
        "  {} {}",
        dim.apply_to("Engines:"),
        data.allowed_engines.join(", ")
    );
    println!(
        "  {} {}",
        dim.apply_to("Concurrent scans:"),
        data.max_concurrent_scans
    );
    println!("  {} {}", dim.apply_to("Users:"), data.users_count);
    println!("  {} {}", dim.apply_to("DAST:"), yes_no(data.dast_enabled));
    println!(
        "  {} {}",
        dim.apply_to("API security:"),
        yes_no(data.api_security_enabled)
    );
    println!(
        "  {} {}",
        dim.apply_to("Codebashing:"),
        yes_no(data.codebashing_enabled)
    );
    println!("  {} {}", dim.apply_to("SCS:"), yes_no(data.scs_enabled));
    if ctx.verbose && !data.services.is_empty() {
        println!("  {} {}", dim.apply_to("Services:"), data.services.join(", "));
    }
    println!();
    Ok(())
}
