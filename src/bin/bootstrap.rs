//! Cloud-function entry point.
//!
//! Inside AWS Lambda (`AWS_LAMBDA_RUNTIME_API` set) this binary is the
//! custom-runtime `bootstrap`: it serves invocations until the sandbox is
//! frozen. Anywhere else it performs one local invocation, reading the event
//! from `--event <file>` (or stdin) and printing `{ statusCode, body }`.

use anyhow::{Context, Result};
use clap::Parser;
use pdf2png::runtime::{self, RuntimeClient, RuntimeErrorBody};
use pdf2png::{Converter, ConverterConfig};
use serde_json::Value;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Serve PDF page conversions as a cloud function.
#[derive(Parser, Debug)]
#[command(name = "bootstrap", version, about = "PDF page → PNG cloud-function handler")]
struct Cli {
    /// Event JSON for a local invocation ("-" for stdin).
    #[arg(long, default_value = "-")]
    event: PathBuf,

    /// Pretty-print the local response.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();

    match RuntimeClient::from_env() {
        Ok(client) => serve(&client).await,
        Err(_) => invoke_locally(&cli).await,
    }
}

/// Lambda mode. Startup failures are reported to `/init/error` before exiting.
async fn serve(client: &RuntimeClient) -> Result<()> {
    let converter = match ConverterConfig::from_env().and_then(Converter::from_config) {
        Ok(c) => c,
        Err(e) => {
            error!("Initialisation failed: {}", e);
            let body = RuntimeErrorBody {
                error_message: e.to_string(),
                error_type: e.kind().to_string(),
            };
            client
                .send_init_error(&body)
                .await
                .context("Failed to report init error")?;
            return Err(e).context("Initialisation failed");
        }
    };

    info!("Converter ready: {:?}", converter.config());
    runtime::run(client, &converter)
        .await
        .context("Lambda runtime loop failed")
}

async fn invoke_locally(cli: &Cli) -> Result<()> {
    let raw = if cli.event.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read event from stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(&cli.event)
            .await
            .with_context(|| format!("Failed to read event from {:?}", cli.event))?
    };
    let event: Value = serde_json::from_str(&raw).context("Event is not valid JSON")?;

    let converter = Converter::from_config(ConverterConfig::from_env()?)?;
    let response = converter.handle_event(&event).await;

    let out = if cli.pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    }
    .context("Failed to serialise response")?;
    println!("{out}");
    Ok(())
}
