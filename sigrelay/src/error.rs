use std::path::PathBuf;

use nix::sys::signal::Signal;

/// Exit status for supervisor-internal failures.
///
/// Outside the child's 0..=127 range and above every `128 + signal` status.
pub const INTERNAL_FAILURE: i32 = 255;

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("config error: {0}")]
    Config(String),

    #[error("cannot trap {signal}: {source}")]
    Install {
        signal: Signal,
        source: std::io::Error,
    },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("failed to wait for child {pid}: {source}")]
    Wait { pid: i32, source: std::io::Error },

    #[error("child reaper exited without reporting a status")]
    ReaperLost,

    #[error("unrecognized child status: {0}")]
    UnrecognizedStatus(String),

    #[error("pid file {}: {source}", .path.display())]
    PidFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("process group error: {0}")]
    ProcessGroup(#[from] nix::Error),
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;
