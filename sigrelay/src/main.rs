//! Run a command, relay trapped signals to its process group and
//! exit the way it exits.

use std::fmt;
use std::time::Instant;

use clap::Parser;
use sigrelay::{Cli, Draining, INTERNAL_FAILURE, Supervisor, SupervisorConfig, SupervisorResult};
use tracing::error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct Elapsed(Instant);

impl FormatTime for Elapsed {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let d = self.0.elapsed();
        let total_secs = d.as_secs();
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        let millis = d.subsec_millis();
        write!(w, "[{mins:02}:{secs:02}:{millis:03}]")
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_timer(Elapsed(Instant::now()))
        .with_env_filter(
            EnvFilter::try_from_env("SIGRELAY_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Usage errors must not be mistaken for a child's exit status.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { INTERNAL_FAILURE } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to start runtime: {e}");
            std::process::exit(INTERNAL_FAILURE);
        }
    };
    let outcome = runtime.block_on(run(cli));
    // The reraise path sleeps on this thread; the runtime must be gone first.
    drop(runtime);

    match outcome {
        Ok(draining) => draining.finish(),
        Err(e) => {
            error!("{e}");
            std::process::exit(INTERNAL_FAILURE);
        }
    }
}

async fn run(cli: Cli) -> SupervisorResult<Draining> {
    let config = SupervisorConfig::from_cli(cli)?;
    let supervisor = Supervisor::new(config)?;
    let running = supervisor.spawn()?;
    running.wait_for_exit().await
}
