//! A child process for observing signal forwarding.
//!
//! Handles a configurable set of signals: ignored ones are logged and the
//! probe keeps running, caught ones are logged and end the probe. Anything
//! else keeps its OS default disposition.

mod config;
mod error;
mod journal;
mod probe;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use config::{Cli, ProbeConfig};
use journal::Journal;

/// Exit status when the probe itself fails to start.
const PROBE_FAILURE: i32 = 2;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_env("SIGNAL_PROBE_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ProbeConfig::from_cli(Cli::parse());

    let code = match Journal::create(&config.log_file) {
        Ok(mut journal) => match probe::run(&config, &mut journal).await {
            Ok(code) => code,
            Err(e) => {
                error!("{e}");
                PROBE_FAILURE
            }
        },
        Err(e) => {
            error!("{e}");
            PROBE_FAILURE
        }
    };
    std::process::exit(code);
}
