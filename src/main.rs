//! # rode-provider - Entry Point
//!
//! ## Startup Sequence
//!
//! 1. **Tracing** - `RUST_LOG`, or `debug` with `--verbose`
//! 2. **Call context** - `--timeout` deadline plus Ctrl+C cancellation
//! 3. **Command** - settings and the client gateway are resolved per command,
//!    so `validate` never builds a client
//!
//! ## Error Handling
//!
//! Every failure propagates as `anyhow::Error` with context and exits non-zero.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use rode_provider::cli::Cli;
use rode_provider::commands::execute_command;
use rode_provider::rode_client::CallContext;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let (ctx, cancel) = CallContext::background().cancellable();
    let ctx = match cli.timeout {
        Some(secs) => ctx.timeout(Duration::from_secs(secs)),
        None => ctx,
    };

    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                warn!("Received Ctrl+C, cancelling in-flight calls");
                cancel.cancel();
            }
            Err(err) => error!("Failed to listen for Ctrl+C: {}", err),
        }
    });

    execute_command(cli.command, cli.config, &ctx).await
}

/// Initialize tracing subscriber with environment filter. Logs go to stderr
/// so command output on stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
