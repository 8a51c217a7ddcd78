//! The probe loop: tick, log signals, exit when told to.

use std::time::Duration;

use nix::sys::signal::Signal;
use nix::unistd::getpid;
use relay_common::{log, pidfile, signal::reset_to_default};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::ProbeConfig;
use crate::error::{ProbeError, ProbeResult};
use crate::journal::Journal;

const TICK: Duration = Duration::from_secs(1);

fn names(signals: &[Signal]) -> String {
    let names: Vec<&str> = signals.iter().map(|s| s.as_str()).collect();
    if names.is_empty() {
        "nothing".into()
    } else {
        names.join(",")
    }
}

/// Run until a caught signal arrives or `run_for` elapses. Returns the exit status.
pub async fn run(config: &ProbeConfig, journal: &mut Journal) -> ProbeResult<i32> {
    journal.note(&format!(
        "continue on {}; exit on {}",
        names(&config.ignore),
        names(&config.catch)
    ));

    let (tx, mut deliveries) = mpsc::unbounded_channel();
    for &sig in config.ignore.iter().chain(&config.catch) {
        let mut stream = signal(SignalKind::from_raw(sig as i32))
            .map_err(|source| ProbeError::Install {
                signal: sig,
                source,
            })?;
        let tx = tx.clone();
        tokio::spawn(async move {
            while stream.recv().await.is_some() {
                if tx.send(sig).is_err() {
                    break;
                }
            }
        });
    }
    if !config.handles(Signal::SIGPIPE) {
        let _ = reset_to_default(Signal::SIGPIPE);
    }

    let pid = getpid().as_raw();
    pidfile::write_pid(&config.pid_file, pid).map_err(|source| ProbeError::File {
        what: "write pid",
        path: config.pid_file.clone(),
        source,
    })?;
    journal.note(&format!("my pid is {pid}"));

    let deadline = config.run_for.map(|d| Instant::now() + d);
    let mut ticker = tokio::time::interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                journal.note(&format!("tick {}", log::timestamp()));
            }
            _ = sleep_until(deadline) => {
                journal.note(&format!("run time elapsed, exiting with {}", config.exit_code));
                return Ok(config.exit_code);
            }
            Some(sig) = deliveries.recv() => {
                journal.note(&format!(
                    "received {sig} ({}) at {}",
                    sig as i32,
                    log::timestamp()
                ));
                if config.catch.contains(&sig) {
                    journal.note(&format!("exiting on {sig}"));
                    return Ok(config.catch_exit_code);
                }
            }
        }
    }
}

/// Sleep until `deadline`, or pend forever if there is none.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
