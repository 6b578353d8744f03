//! Vars command - shows the polling limits a client would use.

use anyhow::Result;
use clap::Args;

use super::Context;

/// Arguments for the vars command.
#[derive(Args, Debug)]
pub struct VarsArgs {}

/// Run the vars command. No connection is made.
pub async fn run(_args: VarsArgs, ctx: &Context) -> Result<()> {
    let vars = ctx.client_vars()?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&vars)?);
        return Ok(());
    }

    // Same kebab-case keys as the profile's [polling] table.
    let table = serde_json::to_value(vars)?;
    if let Some(map) = table.as_object() {
        for (key, value) in map {
            println!("{:<48} {}", key, value);
        }
    }
    Ok(())
}
