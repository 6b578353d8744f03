//! Flags command - lists the tenant's feature flags or checks one.

use std::collections::BTreeMap;

use anyhow::Result;
use clap::Args;
use console::Style;

use super::Context;

/// Arguments for the flags command.
#[derive(Args, Debug)]
pub struct FlagsArgs {
    /// Check a single flag; fails if the tenant has no such flag
    pub name: Option<String>,
}

/// Run the flags command.
pub async fn run(args: FlagsArgs, ctx: &Context) -> Result<()> {
    let client = ctx.connect().await?;

    if let Some(name) = args.name {
        let enabled = client.check_flag(&name)?;
        if ctx.json_output {
            println!("{}", serde_json::json!({ "name": name, "status": enabled }));
        } else {
            println!("{}", enabled);
        }
        return Ok(());
    }

    let flags: BTreeMap<_, _> = client.flags().iter().collect();
    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&flags)?);
        return Ok(());
    }

    if flags.is_empty() {
        println!("No feature flags returned for tenant {}.", client.tenant());
        return Ok(());
    }

    let on = Style::new().green();
    let off = Style::new().dim();
    for (name, enabled) in flags {
        if *enabled {
            println!("{} {}", on.apply_to("●"), name);
        } else {
            println!("{} {}", off.apply_to("○"), off.apply_to(name));
        }
    }
    Ok(())
}
