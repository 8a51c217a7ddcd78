use nix::sys::signal::Signal;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("cannot handle {signal}: {source}")]
    Install {
        signal: Signal,
        source: std::io::Error,
    },

    #[error("{what} {}: {source}", .path.display())]
    File {
        what: &'static str,
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

pub type ProbeResult<T> = Result<T, ProbeError>;
