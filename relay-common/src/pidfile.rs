//! PID files used as an external observability side channel.

use std::io;
use std::path::Path;

/// Write `pid` followed by a newline to `path`, replacing any previous content.
pub fn write_pid(path: &Path, pid: i32) -> io::Result<()> {
    std::fs::write(path, format!("{pid}\n"))
}

/// Read a PID previously written by [`write_pid`].
pub fn read_pid(path: &Path) -> io::Result<i32> {
    let content = std::fs::read_to_string(path)?;
    content.trim().parse().map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid pid in {}: {e}", path.display()),
        )
    })
}

/// Remove a PID file. A file that is already gone is not an error.
pub fn remove_pid(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
