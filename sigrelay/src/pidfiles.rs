//! Supervisor and child PID files.
//!
//! Written at spawn time and removed only on a clean exit. A signal-driven
//! exit leaves them behind for whoever inspects the aftermath.

use std::path::{Path, PathBuf};

use nix::unistd::Pid;
use relay_common::pidfile;
use tracing::warn;

use crate::error::{SupervisorError, SupervisorResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidFiles {
    supervisor: PathBuf,
    child: PathBuf,
}

impl PidFiles {
    /// Resolve both file names against `dir`.
    pub fn new(dir: &Path, supervisor: &Path, child: &Path) -> Self {
        Self {
            supervisor: dir.join(supervisor),
            child: dir.join(child),
        }
    }

    pub fn supervisor_path(&self) -> &Path {
        &self.supervisor
    }

    pub fn child_path(&self) -> &Path {
        &self.child
    }

    pub fn write(&self, supervisor: Pid, child: Pid) -> SupervisorResult<()> {
        for (path, pid) in [(&self.supervisor, supervisor), (&self.child, child)] {
            pidfile::write_pid(path, pid.as_raw()).map_err(|source| SupervisorError::PidFile {
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn remove(&self) {
        for path in [&self.supervisor, &self.child] {
            if let Err(e) = pidfile::remove_pid(path) {
                warn!(path = %path.display(), "failed to remove pid file: {e}");
            }
        }
    }
}
