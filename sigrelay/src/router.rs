//! SignalRouter: intercepts the trapped signals and relays them to the
//! supervisor's process group.
//!
//! Handler context only records the delivery (tokio's signal driver writes to
//! a self-pipe). Forwarding happens on the main control flow in [`SignalRouter::relay`],
//! so a repeat delivery during a forward is queued rather than dropped.
//!
//! The supervisor belongs to the group it forwards to, so every forward comes
//! back to it once. Those echoes are counted and absorbed instead of being
//! forwarded again.

use std::collections::HashMap;

use nix::sys::signal::Signal;
use relay_common::signal::reset_to_default;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{SupervisorError, SupervisorResult};
use crate::events::{EventLog, RelayEvent};
use crate::process::ProcessGroup;
use crate::signals::TrappedSignalSet;
use crate::supervisor::SupervisorState;

/// What [`SignalRouter::relay`] did with a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relay {
    Forwarded,
    EchoAbsorbed,
    ForwardFailed,
}

/// Outstanding self-deliveries per signal.
#[derive(Debug, Default)]
pub(crate) struct EchoLedger(HashMap<Signal, u32>);

impl EchoLedger {
    pub(crate) fn expect(&mut self, signal: Signal) {
        *self.0.entry(signal).or_insert(0) += 1;
    }

    /// Consume one expected echo of `signal`, if any is outstanding.
    pub(crate) fn absorb(&mut self, signal: Signal) -> bool {
        match self.0.get_mut(&signal) {
            Some(pending) if *pending > 0 => {
                *pending -= 1;
                true
            }
            _ => false,
        }
    }
}

pub struct SignalRouter {
    trapped: TrappedSignalSet,
    group: ProcessGroup,
    deliveries: mpsc::UnboundedReceiver<Signal>,
    listeners: Vec<JoinHandle<()>>,
    echoes: EchoLedger,
    events: EventLog,
}

impl SignalRouter {
    /// Start intercepting every signal in `trapped`.
    ///
    /// Must be called from within a tokio runtime. Fails only when a signal
    /// cannot be trapped at all (`SIGKILL`, `SIGSTOP`, ...).
    pub fn install(
        trapped: &TrappedSignalSet,
        group: ProcessGroup,
        events: EventLog,
    ) -> SupervisorResult<Self> {
        let (tx, deliveries) = mpsc::unbounded_channel();
        let mut listeners = Vec::with_capacity(trapped.len());

        for sig in trapped.iter() {
            let mut stream = signal(SignalKind::from_raw(sig as i32))
                .map_err(|source| SupervisorError::Install {
                    signal: sig,
                    source,
                })?;
            let tx = tx.clone();
            listeners.push(tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    if tx.send(sig).is_err() {
                        break;
                    }
                }
            }));
        }

        // The Rust runtime starts with SIGPIPE ignored. Untrapped signals must
        // keep the OS default.
        if !trapped.contains(Signal::SIGPIPE)
            && let Err(e) = reset_to_default(Signal::SIGPIPE)
        {
            warn!("failed to restore default SIGPIPE disposition: {e}");
        }

        info!(signals = %trapped, group = group.id().as_raw(), "signal handlers installed");

        Ok(Self {
            trapped: trapped.clone(),
            group,
            deliveries,
            listeners,
            echoes: EchoLedger::default(),
            events,
        })
    }

    /// Wait for the next trapped signal, in delivery order.
    pub async fn next(&mut self) -> Option<Signal> {
        self.deliveries.recv().await
    }

    /// Handle one delivery: record it and forward it to the process group,
    /// unless it is the echo of an earlier forward.
    pub fn relay(&mut self, signal: Signal, state: &mut SupervisorState) -> Relay {
        if self.echoes.absorb(signal) {
            debug!(%signal, "absorbed echo of forwarded signal");
            self.events.record(RelayEvent::EchoAbsorbed {
                signal: signal.as_str().into(),
            });
            return Relay::EchoAbsorbed;
        }

        state.record_signal(signal);
        let group = self.group.id().as_raw();

        match self.group.send(signal) {
            Ok(()) => {
                self.echoes.expect(signal);
                info!(%signal, group, "forwarded signal to process group");
                self.events.record(RelayEvent::SignalForwarded {
                    signal: signal.as_str().into(),
                    process_group: group,
                });
                Relay::Forwarded
            }
            Err(e) => {
                warn!(%signal, group, "failed to forward signal: {e}");
                Relay::ForwardFailed
            }
        }
    }

    /// Stop intercepting and give every trapped signal its default disposition.
    pub fn restore_defaults(&self) {
        for listener in &self.listeners {
            listener.abort();
        }
        for sig in self.trapped.iter() {
            if let Err(e) = reset_to_default(sig) {
                warn!(signal = %sig, "failed to restore default disposition: {e}");
            }
        }
        debug!(signals = %self.trapped, "default dispositions restored");
    }

    pub fn trapped(&self) -> &TrappedSignalSet {
        &self.trapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::{Pid, getpid};
    use std::os::unix::process::{CommandExt, ExitStatusExt};

    #[test]
    fn ledger_absorbs_only_expected_echoes() {
        let mut ledger = EchoLedger::default();
        assert!(!ledger.absorb(Signal::SIGINT));

        ledger.expect(Signal::SIGINT);
        ledger.expect(Signal::SIGINT);
        ledger.expect(Signal::SIGTERM);

        assert!(ledger.absorb(Signal::SIGINT));
        assert!(ledger.absorb(Signal::SIGTERM));
        assert!(ledger.absorb(Signal::SIGINT));
        assert!(!ledger.absorb(Signal::SIGINT));
        assert!(!ledger.absorb(Signal::SIGTERM));
        assert!(!ledger.absorb(Signal::SIGHUP));
    }

    #[tokio::test]
    async fn install_rejects_untrappable_signal() {
        let trapped = TrappedSignalSet::new([Signal::SIGUSR1, Signal::SIGKILL]);
        let result = SignalRouter::install(&trapped, ProcessGroup::current(), EventLog::disabled());
        match result {
            Err(SupervisorError::Install { signal, .. }) => assert_eq!(signal, Signal::SIGKILL),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("SIGKILL must not be trappable"),
        }
    }

    #[tokio::test]
    async fn trapped_signal_is_delivered_in_order() {
        let trapped = TrappedSignalSet::new([Signal::SIGUSR1, Signal::SIGUSR2]);
        let mut router =
            SignalRouter::install(&trapped, ProcessGroup::current(), EventLog::disabled()).unwrap();

        nix::sys::signal::kill(getpid(), Signal::SIGUSR2).unwrap();
        assert_eq!(router.next().await, Some(Signal::SIGUSR2));

        nix::sys::signal::kill(getpid(), Signal::SIGUSR1).unwrap();
        assert_eq!(router.next().await, Some(Signal::SIGUSR1));
    }

    fn spawn_group_leader(program: &str, args: &[&str]) -> (std::process::Child, ProcessGroup) {
        let child = std::process::Command::new(program)
            .args(args)
            .process_group(0)
            .spawn()
            .unwrap();
        let pid = Pid::from_raw(i32::try_from(child.id()).unwrap());
        (child, ProcessGroup::new(pid))
    }

    #[tokio::test]
    async fn relay_forwards_then_absorbs_the_echo() {
        let (mut child, group) = spawn_group_leader("sleep", &["30"]);
        let trapped = TrappedSignalSet::new([Signal::SIGUSR1]);
        let mut router = SignalRouter::install(&trapped, group, EventLog::disabled()).unwrap();
        let mut state = SupervisorState::new(group);

        assert_eq!(router.relay(Signal::SIGTERM, &mut state), Relay::Forwarded);
        assert_eq!(state.last_signal(), Some(Signal::SIGTERM));
        assert_eq!(child.wait().unwrap().signal(), Some(Signal::SIGTERM as i32));

        assert_eq!(router.relay(Signal::SIGTERM, &mut state), Relay::EchoAbsorbed);
        assert_eq!(router.relay(Signal::SIGTERM, &mut state), Relay::ForwardFailed);
        assert_eq!(state.last_signal(), Some(Signal::SIGTERM));
    }

    #[tokio::test]
    async fn failed_forward_expects_no_echo() {
        let (mut child, group) = spawn_group_leader("true", &[]);
        child.wait().unwrap();

        let trapped = TrappedSignalSet::new([Signal::SIGUSR2]);
        let mut router = SignalRouter::install(&trapped, group, EventLog::disabled()).unwrap();
        let mut state = SupervisorState::new(group);

        assert_eq!(router.relay(Signal::SIGHUP, &mut state), Relay::ForwardFailed);
        assert_eq!(router.relay(Signal::SIGHUP, &mut state), Relay::ForwardFailed);
        assert_eq!(state.last_signal(), Some(Signal::SIGHUP));
    }
}
