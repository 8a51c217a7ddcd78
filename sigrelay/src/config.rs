use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;
use nix::sys::signal::Signal;
use relay_common::signal::parse_signal;

use crate::error::{SupervisorError, SupervisorResult};
use crate::pidfiles::PidFiles;
use crate::signals::TrappedSignalSet;

pub(crate) const DEFAULT_PID_FILE: &str = "sigrelay.pid";
pub(crate) const DEFAULT_CHILD_PID_FILE: &str = "child.pid";

/// Run a command, relaying trapped signals to its process group and exiting
/// the way it exits.
#[derive(Debug, Parser)]
#[command(name = "sigrelay", version)]
pub struct Cli {
    /// Signals to intercept and forward, in order (e.g. `INT,TERM`).
    ///
    /// Signals not listed keep their default disposition: they terminate
    /// sigrelay at once, are never forwarded, and the child gets no chance
    /// to react.
    #[arg(
        short,
        long = "trap",
        env = "SIGRELAY_TRAP",
        value_delimiter = ',',
        required = true,
        value_parser = parse_signal
    )]
    pub trap: Vec<Signal>,

    /// Directory for the PID files
    #[arg(long, env = "SIGRELAY_PID_DIR", default_value = ".")]
    pub pid_dir: PathBuf,

    /// File name for sigrelay's own PID
    #[arg(long, default_value = DEFAULT_PID_FILE)]
    pub pid_file: PathBuf,

    /// File name for the child's PID
    #[arg(long, default_value = DEFAULT_CHILD_PID_FILE)]
    pub child_pid_file: PathBuf,

    /// Do not write PID files
    #[arg(long)]
    pub no_pid_files: bool,

    /// Append lifecycle events as JSON lines to this file
    #[arg(long, env = "SIGRELAY_EVENT_LOG")]
    pub event_log: Option<PathBuf>,

    /// Become a process group leader before spawning the child
    #[arg(long)]
    pub own_group: bool,

    /// Command to run, followed by its arguments
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<OsString>,
}

/// Validated supervisor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    pub command: Vec<OsString>,
    pub trapped: TrappedSignalSet,
    pub pid_files: Option<PidFiles>,
    pub event_log: Option<PathBuf>,
    pub own_group: bool,
}

impl SupervisorConfig {
    pub fn from_cli(cli: Cli) -> SupervisorResult<Self> {
        if cli.command.is_empty() {
            return Err(SupervisorError::Config("no command given".into()));
        }
        let trapped = TrappedSignalSet::new(cli.trap);
        if trapped.is_empty() {
            return Err(SupervisorError::Config("no signals to trap".into()));
        }

        let pid_files = (!cli.no_pid_files)
            .then(|| PidFiles::new(&cli.pid_dir, &cli.pid_file, &cli.child_pid_file));

        Ok(Self {
            command: cli.command,
            trapped,
            pid_files,
            event_log: cli.event_log,
            own_group: cli.own_group,
        })
    }
}
