//! ExitReplicator: makes the supervisor's own termination look like the
//! child's to whoever waits on the supervisor.

use std::iter;
use std::time::Duration;

use nix::sys::resource::{Resource, getrlimit, setrlimit};
use nix::sys::signal::{SigSet, Signal, kill};
use nix::unistd::getpid;
use relay_common::signal::{dumps_core, reset_to_default};
use tracing::{error, info, warn};

use crate::error::INTERNAL_FAILURE;
use crate::events::{EventLog, RelayEvent};
use crate::pidfiles::PidFiles;
use crate::signals::TrappedSignalSet;
use crate::supervisor::WaitResult;

/// How long a self-delivered fatal signal may take before the supervisor
/// declares the invariant broken.
const RERAISE_GRACE: Duration = Duration::from_secs(2);

/// The supervisor's final disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPlan {
    /// Exit normally with this status.
    Exit(i32),
    /// Die by this signal under its default disposition.
    Reraise(Signal),
}

impl ExitPlan {
    /// Decide the final disposition from the child's termination and the last
    /// signal the supervisor forwarded.
    ///
    /// - An ordinary exit is passed through unchanged, even after forwards.
    /// - Death by signal after a forward is replicated by self-delivery.
    /// - Death by signal with nothing forwarded exits `128 + signal`.
    pub fn decide(result: WaitResult, last_signal: Option<Signal>) -> Self {
        match (result, last_signal) {
            (WaitResult::Exited { code }, _) => Self::Exit(code),
            (WaitResult::KilledBySignal { signal }, Some(_)) => Self::Reraise(signal),
            (WaitResult::KilledBySignal { signal }, None) => Self::Exit(128 + signal as i32),
        }
    }
}

pub struct ExitReplicator {
    trapped: TrappedSignalSet,
    pid_files: Option<PidFiles>,
    events: EventLog,
}

impl ExitReplicator {
    pub fn new(trapped: TrappedSignalSet, pid_files: Option<PidFiles>, events: EventLog) -> Self {
        Self {
            trapped,
            pid_files,
            events,
        }
    }

    /// Carry out `plan`. Never returns.
    pub fn execute(self, plan: ExitPlan) -> ! {
        match plan {
            ExitPlan::Exit(code) => self.exit(code),
            ExitPlan::Reraise(signal) => self.reraise(signal),
        }
    }

    fn exit(self, code: i32) -> ! {
        if let Some(files) = &self.pid_files {
            files.remove();
        }
        self.events.record(RelayEvent::Exiting { code });
        info!(code, "exiting with child's status");
        std::process::exit(code)
    }

    /// Restore default dispositions and deliver `signal` to ourselves.
    ///
    /// PID files are deliberately left in place.
    fn reraise(self, signal: Signal) -> ! {
        for sig in self.trapped.iter().chain(iter::once(signal)) {
            if let Err(e) = reset_to_default(sig) {
                warn!(signal = %sig, "failed to restore default disposition: {e}");
            }
        }

        if dumps_core(signal) {
            disable_core_dumps();
        }

        let mut mask = SigSet::empty();
        mask.add(signal);
        if let Err(e) = mask.thread_unblock() {
            warn!(%signal, "failed to unblock signal: {e}");
        }

        self.events.record(RelayEvent::Reraising {
            signal: signal.as_str().into(),
        });
        info!(%signal, "terminating by child's signal");

        match kill(getpid(), signal) {
            Ok(()) => std::thread::sleep(RERAISE_GRACE),
            Err(e) => error!(%signal, "self-delivery failed: {e}"),
        }

        error!(
            %signal,
            "invariant violated: supervisor survived self-delivered {signal}"
        );
        std::process::exit(INTERNAL_FAILURE)
    }
}

/// Replicating a core-dumping signal must not leave a core file behind.
fn disable_core_dumps() {
    let result = getrlimit(Resource::RLIMIT_CORE)
        .and_then(|(_, hard)| setrlimit(Resource::RLIMIT_CORE, 0, hard));
    if let Err(e) = result {
        warn!("failed to disable core dumps: {e}");
    }
}
