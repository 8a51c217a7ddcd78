//! The ordered set of signals the supervisor intercepts.

use std::fmt;

use nix::sys::signal::Signal;

/// Ordered, duplicate-free set of trapped signals. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrappedSignalSet(Vec<Signal>);

impl TrappedSignalSet {
    /// Build a set keeping the first occurrence of every signal.
    pub fn new(signals: impl IntoIterator<Item = Signal>) -> Self {
        let mut ordered: Vec<Signal> = Vec::new();
        for signal in signals {
            if !ordered.contains(&signal) {
                ordered.push(signal);
            }
        }
        Self(ordered)
    }

    pub fn iter(&self) -> impl Iterator<Item = Signal> + '_ {
        self.0.iter().copied()
    }

    pub fn contains(&self, signal: Signal) -> bool {
        self.0.contains(&signal)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TrappedSignalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|s| s.as_str()).collect();
        write!(f, "{}", names.join(","))
    }
}
