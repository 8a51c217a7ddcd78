//! Signal names and dispositions.
//!
//! Uses `sigaction` (not `signal`) so that restoring a disposition behaves the
//! same on every platform.

use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

/// Error returned when a signal name cannot be resolved.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseSignalError {
    #[error("empty signal name")]
    Empty,

    #[error("unknown signal: {0}")]
    Unknown(String),
}

/// Resolve a signal from a user-supplied name.
///
/// Accepts `SIGINT`, `INT`, `int` and plain numbers such as `2`.
pub fn parse_signal(name: &str) -> Result<Signal, ParseSignalError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ParseSignalError::Empty);
    }

    if let Ok(number) = trimmed.parse::<i32>() {
        return Signal::try_from(number).map_err(|_| ParseSignalError::Unknown(trimmed.into()));
    }

    let upper = trimmed.to_ascii_uppercase();
    let canonical = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{upper}")
    };
    canonical
        .parse::<Signal>()
        .map_err(|_| ParseSignalError::Unknown(trimmed.into()))
}

/// Restore the OS default disposition for `signal`.
///
/// Fails for signals whose disposition cannot be changed (`SIGKILL`, `SIGSTOP`).
pub fn reset_to_default(signal: Signal) -> nix::Result<()> {
    let action = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    // SAFETY: SIG_DFL is not a Rust function, so no handler state is left behind.
    unsafe { sigaction(signal, &action) }.map(drop)
}

/// Whether the default action of `signal` writes a core dump.
pub fn dumps_core(signal: Signal) -> bool {
    matches!(
        signal,
        Signal::SIGQUIT
            | Signal::SIGILL
            | Signal::SIGTRAP
            | Signal::SIGABRT
            | Signal::SIGBUS
            | Signal::SIGFPE
            | Signal::SIGSEGV
            | Signal::SIGSYS
            | Signal::SIGXCPU
            | Signal::SIGXFSZ
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_names() {
        assert_eq!(parse_signal("INT"), Ok(Signal::SIGINT));
        assert_eq!(parse_signal("SIGTERM"), Ok(Signal::SIGTERM));
        assert_eq!(parse_signal("hup"), Ok(Signal::SIGHUP));
        assert_eq!(parse_signal(" sigquit "), Ok(Signal::SIGQUIT));
    }

    #[test]
    fn parses_numbers() {
        assert_eq!(parse_signal("15"), Ok(Signal::SIGTERM));
        assert_eq!(parse_signal("9"), Ok(Signal::SIGKILL));
    }

    #[test]
    fn rejects_unknown_names() {
        assert_eq!(
            parse_signal("SIGBOGUS"),
            Err(ParseSignalError::Unknown("SIGBOGUS".into()))
        );
        assert_eq!(parse_signal("0"), Err(ParseSignalError::Unknown("0".into())));
        assert_eq!(parse_signal("  "), Err(ParseSignalError::Empty));
    }

    #[test]
    fn core_dumping_signals() {
        assert!(dumps_core(Signal::SIGQUIT));
        assert!(dumps_core(Signal::SIGABRT));
        assert!(!dumps_core(Signal::SIGTERM));
        assert!(!dumps_core(Signal::SIGINT));
        assert!(!dumps_core(Signal::SIGKILL));
    }

    #[test]
    fn kill_disposition_cannot_be_changed() {
        assert!(reset_to_default(Signal::SIGKILL).is_err());
    }

    #[test]
    fn reset_usr2_to_default() {
        reset_to_default(Signal::SIGUSR2).unwrap();
    }
}
