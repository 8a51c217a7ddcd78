//! Signal log: every message goes to stderr and to the log file.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::error::{ProbeError, ProbeResult};

pub struct Journal {
    file: File,
}

impl Journal {
    /// Create (or truncate) the log file.
    pub fn create(path: &Path) -> ProbeResult<Self> {
        let file = File::create(path).map_err(|source| ProbeError::File {
            what: "create log",
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { file })
    }

    pub fn note(&mut self, message: &str) {
        info!("{message}");
        let line = format!("signal-probe: {message}\n");
        let _ = self.file.write_all(line.as_bytes());
        let _ = self.file.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_prefixed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.log");

        let mut journal = Journal::create(&path).unwrap();
        journal.note("my pid is 12");
        journal.note("tick");

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "signal-probe: my pid is 12\nsignal-probe: tick\n");
    }

    #[test]
    fn create_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.log");
        std::fs::write(&path, "stale\n").unwrap();

        Journal::create(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
