//! Request command - sends an authenticated request to any surface.

use std::io::Write;

use anyhow::{Context as _, Result, bail};
use clap::{Args, ValueEnum};
use cxone_client::{ApiRequest, Headers, Method, Surface};

use super::Context;

/// Backend surface selector.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// {base-url}/api{path}
    Api,
    /// {iam-url}{base}/realms/{tenant}{path}
    Realm,
    /// {iam-url}{base}/{tenant}{path}
    Console,
}

/// Arguments for the request command.
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE, ...)
    pub method: String,

    /// Path on the surface, e.g. /projects?limit=10
    pub path: String,

    /// Surface to address
    #[arg(long, value_enum, default_value = "api")]
    pub surface: SurfaceKind,

    /// Base segment for the realm and console surfaces
    #[arg(long, default_value = "/auth/admin")]
    pub base: String,

    /// Request body (JSON)
    #[arg(short, long)]
    pub data: Option<String>,

    /// Extra header, NAME:VALUE (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,
}

/// Run the request command.
pub async fn run(args: RequestArgs, ctx: &Context) -> Result<()> {
    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method '{}'", args.method))?;
    let surface = match args.surface {
        SurfaceKind::Api => Surface::Api,
        SurfaceKind::Realm => Surface::realm(&args.base),
        SurfaceKind::Console => Surface::console(&args.base),
    };
    let headers = parse_headers(&args.headers)?;
    let path = normalize_path(&args.path);

    let client = ctx.connect().await?;
    if ctx.verbose {
        eprintln!("{} {}", method, client.dispatcher().url(&surface, &path));
    }

    let mut request = ApiRequest::new(method, surface, path).headers(headers);
    if let Some(data) = args.data {
        request = request.body(data);
    }

    let body = client.send(request).await?;
    let mut stdout = std::io::stdout().lock();
    match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(json) if !ctx.json_output => writeln!(stdout, "{}", serde_json::to_string_pretty(&json)?)?,
        _ => {
            stdout.write_all(&body)?;
            if !body.ends_with(b"\n") && !body.is_empty() {
                writeln!(stdout)?;
            }
        }
    }
    Ok(())
}

fn parse_headers(raw: &[String]) -> Result<Headers> {
    let mut headers = Headers::new();
    for entry in raw {
        let Some((name, value)) = entry.split_once(':') else {
            bail!("invalid header '{}': expected NAME:VALUE", entry);
        };
        headers.add(name.trim(), value.trim());
    }
    Ok(headers)
}

fn normalize_path(path: &str) -> String {
    if path.is_empty() || path.starts_with('/') || path.starts_with('?') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}
