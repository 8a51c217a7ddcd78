//! ChildSupervisor: owns the spawn and the wait.
//!
//! The lifecycle is encoded in the types. [`Supervisor::spawn`] consumes the
//! idle supervisor, so there is exactly one spawn per instance:
//!
//! ```text
//! Supervisor ──spawn──▶ Running ──wait_for_exit──▶ Draining ──finish──▶ (process exit)
//!                        ▲    │
//!                        └────┘ signal relayed
//! ```
//!
//! A dedicated reaper task awaits the child and reports over a oneshot
//! channel. The main loop selects between that channel and the signal
//! router, so "interrupted by a signal" and "child died" never share an
//! ambiguous status code.

use std::ffi::OsString;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::unistd::{Pid, getpid};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::config::SupervisorConfig;
use crate::error::{SupervisorError, SupervisorResult};
use crate::events::{EventLog, RelayEvent};
use crate::exit::{ExitPlan, ExitReplicator};
use crate::pidfiles::PidFiles;
use crate::process::{self, ProcessGroup};
use crate::router::SignalRouter;

/// Status reported when the child was already reaped elsewhere, as a shell
/// `wait` does for an unknown pid.
const VANISHED_CHILD_CODE: i32 = 127;

/// How the child terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    Exited { code: i32 },
    KilledBySignal { signal: Signal },
}

impl WaitResult {
    pub fn from_status(status: ExitStatus) -> Option<Self> {
        if let Some(code) = status.code() {
            return Some(Self::Exited { code });
        }
        status
            .signal()
            .and_then(|raw| Signal::try_from(raw).ok())
            .map(|signal| Self::KilledBySignal { signal })
    }
}

/// Per-instance supervisor state.
///
/// `child_pid` is written by the spawn step; `last_signal` only by
/// [`SignalRouter::relay`] and read once the wait loop has ended.
#[derive(Debug)]
pub struct SupervisorState {
    child_pid: Option<Pid>,
    last_signal: Option<Signal>,
    process_group: ProcessGroup,
}

impl SupervisorState {
    pub fn new(process_group: ProcessGroup) -> Self {
        Self {
            child_pid: None,
            last_signal: None,
            process_group,
        }
    }

    pub fn child_pid(&self) -> Option<Pid> {
        self.child_pid
    }

    pub fn last_signal(&self) -> Option<Signal> {
        self.last_signal
    }

    pub fn process_group(&self) -> ProcessGroup {
        self.process_group
    }

    pub(crate) fn record_signal(&mut self, signal: Signal) {
        self.last_signal = Some(signal);
    }
}

type ReaperReport = io::Result<ExitStatus>;

/// Idle supervisor: handlers installed, child not yet started.
pub struct Supervisor {
    command: Vec<OsString>,
    pid_files: Option<PidFiles>,
    router: SignalRouter,
    state: SupervisorState,
    events: EventLog,
}

impl Supervisor {
    /// Prepare the process group and install the signal handlers.
    ///
    /// Handlers go in before the spawn so that a trapped signal can never hit
    /// the supervisor's default disposition while the child is alive.
    pub fn new(config: SupervisorConfig) -> SupervisorResult<Self> {
        let group = if config.own_group {
            process::become_group_leader()?
        } else {
            ProcessGroup::current()
        };
        if !group.is_led_by(getpid()) {
            debug!(
                group = group.id().as_raw(),
                "not a process group leader; forwarded signals reach the whole inherited group"
            );
        }

        let events = EventLog::new(config.event_log);
        let router = SignalRouter::install(&config.trapped, group, events.clone())?;

        Ok(Self {
            command: config.command,
            pid_files: config.pid_files,
            router,
            state: SupervisorState::new(group),
            events,
        })
    }

    /// Launch the child inside the supervisor's process group.
    ///
    /// On failure the default dispositions are restored before returning.
    pub fn spawn(self) -> SupervisorResult<Running> {
        let Self {
            command,
            pid_files,
            router,
            mut state,
            events,
        } = self;

        let child = match spawn_child(&command) {
            Ok(child) => child,
            Err(e) => {
                router.restore_defaults();
                return Err(e);
            }
        };
        let pid = match child.id().and_then(|id| i32::try_from(id).ok()) {
            Some(raw) => Pid::from_raw(raw),
            None => {
                router.restore_defaults();
                return Err(SupervisorError::UnrecognizedStatus(
                    "child exited before its pid was observed".into(),
                ));
            }
        };
        state.child_pid = Some(pid);

        let group = state.process_group.id().as_raw();
        info!(pid = pid.as_raw(), group, "child spawned");
        events.record(RelayEvent::Spawned {
            child_pid: pid.as_raw(),
            process_group: group,
        });

        if let Some(files) = &pid_files
            && let Err(e) = files.write(getpid(), pid)
        {
            warn!("{e}");
        }

        let (tx, reaper) = oneshot::channel();
        tokio::spawn(async move {
            let mut child = child;
            let _ = tx.send(child.wait().await);
        });

        Ok(Running {
            pid,
            pid_files,
            router,
            state,
            reaper,
            events,
        })
    }
}

fn spawn_child(command: &[OsString]) -> SupervisorResult<tokio::process::Child> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| SupervisorError::Config("empty command".into()))?;

    tokio::process::Command::new(program)
        .args(args)
        .spawn()
        .map_err(|source| SupervisorError::Spawn {
            program: program.to_string_lossy().into_owned(),
            source,
        })
}

/// Supervisor with a live child.
pub struct Running {
    pid: Pid,
    pid_files: Option<PidFiles>,
    router: SignalRouter,
    state: SupervisorState,
    reaper: oneshot::Receiver<ReaperReport>,
    events: EventLog,
}

impl Running {
    /// Relay trapped signals until the child terminates.
    ///
    /// Any number of signals may arrive first; each one is forwarded and the
    /// loop keeps waiting. A failing wait is fatal rather than retried.
    pub async fn wait_for_exit(self) -> SupervisorResult<Draining> {
        let Self {
            pid,
            pid_files,
            mut router,
            mut state,
            mut reaper,
            events,
        } = self;

        let report = loop {
            tokio::select! {
                biased;
                report = &mut reaper => break report,
                Some(signal) = router.next() => {
                    router.relay(signal, &mut state);
                }
            }
        };

        let result = match classify(pid, report) {
            Ok(result) => result,
            Err(e) => {
                error!(pid = pid.as_raw(), "{e}");
                router.restore_defaults();
                return Err(e);
            }
        };
        state.child_pid = None;

        match result {
            WaitResult::Exited { code } => {
                info!(pid = pid.as_raw(), code, "child exited");
                events.record(RelayEvent::ChildExited { code });
            }
            WaitResult::KilledBySignal { signal } => {
                info!(pid = pid.as_raw(), %signal, "child killed by signal");
                events.record(RelayEvent::ChildKilled {
                    signal: signal.as_str().into(),
                });
            }
        }

        Ok(Draining {
            result,
            pid_files,
            router,
            state,
            events,
        })
    }
}

fn classify(
    pid: Pid,
    report: Result<ReaperReport, oneshot::error::RecvError>,
) -> SupervisorResult<WaitResult> {
    match report {
        Ok(Ok(status)) => WaitResult::from_status(status)
            .ok_or_else(|| SupervisorError::UnrecognizedStatus(status.to_string())),
        Ok(Err(e)) if e.raw_os_error() == Some(Errno::ECHILD as i32) => {
            warn!(
                pid = pid.as_raw(),
                "child already reaped elsewhere; its status is unknown"
            );
            Ok(WaitResult::Exited {
                code: VANISHED_CHILD_CODE,
            })
        }
        Ok(Err(source)) => Err(SupervisorError::Wait {
            pid: pid.as_raw(),
            source,
        }),
        Err(_) => Err(SupervisorError::ReaperLost),
    }
}

/// The child is gone; only the supervisor's own termination remains.
pub struct Draining {
    result: WaitResult,
    pid_files: Option<PidFiles>,
    router: SignalRouter,
    state: SupervisorState,
    events: EventLog,
}

impl Draining {
    pub fn plan(&self) -> ExitPlan {
        ExitPlan::decide(self.result, self.state.last_signal())
    }

    /// Terminate the supervisor the way the child terminated.
    ///
    /// Call this once the tokio runtime has shut down: the reraise path
    /// blocks the calling thread for its grace period.
    pub fn finish(self) -> ! {
        let plan = self.plan();
        ExitReplicator::new(
            self.router.trapped().clone(),
            self.pid_files,
            self.events,
        )
        .execute(plan)
    }
}
