use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use nix::sys::signal::Signal;
use relay_common::signal::parse_signal;

/// Run until told to stop, logging every signal received.
#[derive(Debug, Parser)]
#[command(name = "signal-probe", version)]
pub struct Cli {
    /// Signals to log and otherwise ignore
    #[arg(long, value_delimiter = ',', value_parser = parse_signal, default_value = "INT")]
    pub ignore: Vec<Signal>,

    /// Signals to log and then exit on
    #[arg(
        long,
        value_delimiter = ',',
        value_parser = parse_signal,
        default_values = ["TERM", "QUIT", "HUP", "PIPE", "ABRT"]
    )]
    pub catch: Vec<Signal>,

    /// Signals to leave at their OS default disposition
    #[arg(long = "default", value_delimiter = ',', value_parser = parse_signal)]
    pub default: Vec<Signal>,

    /// Exit status after a caught signal
    #[arg(long, default_value_t = 1)]
    pub catch_exit_code: i32,

    /// Exit on our own after this many seconds
    #[arg(long, value_name = "SECS")]
    pub run_for: Option<u64>,

    /// Exit status when --run-for elapses
    #[arg(long, default_value_t = 0)]
    pub exit_code: i32,

    /// Signal log, truncated at startup
    #[arg(long, default_value = "signal-probe.log")]
    pub log_file: PathBuf,

    /// File receiving our PID once handlers are in place
    #[arg(long, default_value = "signal-probe.pid")]
    pub pid_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub ignore: Vec<Signal>,
    pub catch: Vec<Signal>,
    pub catch_exit_code: i32,
    pub run_for: Option<Duration>,
    pub exit_code: i32,
    pub log_file: PathBuf,
    pub pid_file: PathBuf,
}

impl ProbeConfig {
    /// `--default` wins over `--ignore`, which wins over `--catch`.
    pub fn from_cli(cli: Cli) -> Self {
        let ignore = distinct(cli.ignore.iter().filter(|s| !cli.default.contains(s)));
        let catch = distinct(
            cli.catch
                .iter()
                .filter(|s| !cli.default.contains(s) && !ignore.contains(s)),
        );

        Self {
            ignore,
            catch,
            catch_exit_code: cli.catch_exit_code,
            run_for: cli.run_for.map(Duration::from_secs),
            exit_code: cli.exit_code,
            log_file: cli.log_file,
            pid_file: cli.pid_file,
        }
    }

    pub fn handles(&self, signal: Signal) -> bool {
        self.ignore.contains(&signal) || self.catch.contains(&signal)
    }
}

fn distinct<'a>(signals: impl Iterator<Item = &'a Signal>) -> Vec<Signal> {
    let mut out = Vec::new();
    for &signal in signals {
        if !out.contains(&signal) {
            out.push(signal);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(args: &[&str]) -> ProbeConfig {
        let cli = Cli::try_parse_from(std::iter::once("signal-probe").chain(args.iter().copied()))
            .unwrap();
        ProbeConfig::from_cli(cli)
    }

    #[test]
    fn defaults_mirror_classic_signaller() {
        let config = config(&[]);
        assert_eq!(config.ignore, [Signal::SIGINT]);
        assert_eq!(
            config.catch,
            [
                Signal::SIGTERM,
                Signal::SIGQUIT,
                Signal::SIGHUP,
                Signal::SIGPIPE,
                Signal::SIGABRT
            ]
        );
        assert_eq!(config.catch_exit_code, 1);
        assert_eq!(config.run_for, None);
        assert_eq!(config.log_file, PathBuf::from("signal-probe.log"));
    }

    #[test]
    fn ignore_overrides_catch() {
        let config = config(&["--ignore", "INT,TERM"]);
        assert_eq!(config.ignore, [Signal::SIGINT, Signal::SIGTERM]);
        assert!(!config.catch.contains(&Signal::SIGTERM));
    }

    #[test]
    fn default_overrides_everything() {
        let config = config(&["--default", "INT,TERM"]);
        assert!(config.ignore.is_empty());
        assert!(!config.handles(Signal::SIGTERM));
        assert!(!config.handles(Signal::SIGINT));
        assert!(config.handles(Signal::SIGHUP));
    }

    #[test]
    fn run_for_in_seconds() {
        let config = config(&["--run-for", "10", "--exit-code", "42"]);
        assert_eq!(config.run_for, Some(Duration::from_secs(10)));
        assert_eq!(config.exit_code, 42);
    }
}
