//! Process-group targeting.
//!
//! Forwarding addresses the whole group through `killpg` rather than the
//! `kill(0, ..)` sentinel, so the target is always an explicit group id.

use nix::sys::signal::{Signal, killpg};
use nix::unistd::{Pid, getpgrp, getpid, setpgid};

/// A process group id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessGroup(Pid);

impl ProcessGroup {
    pub fn new(id: Pid) -> Self {
        Self(id)
    }

    /// The process group of the calling process.
    pub fn current() -> Self {
        Self(getpgrp())
    }

    pub fn id(self) -> Pid {
        self.0
    }

    /// Whether `pid` is the leader of this group.
    pub fn is_led_by(self, pid: Pid) -> bool {
        self.0 == pid
    }

    /// Deliver `signal` to every member of the group.
    pub fn send(self, signal: Signal) -> nix::Result<()> {
        killpg(self.0, signal)
    }
}

/// Make the calling process the leader of its own process group.
///
/// No-op when it already leads one.
pub fn become_group_leader() -> nix::Result<ProcessGroup> {
    let pid = getpid();
    if !ProcessGroup::current().is_led_by(pid) {
        setpgid(Pid::from_raw(0), Pid::from_raw(0))?;
    }
    Ok(ProcessGroup::current())
}
