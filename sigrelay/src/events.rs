//! Lifecycle event log for external observers.
//!
//! Appends one JSON line per event. Writing is best-effort: a log that cannot
//! be opened or written never affects supervision.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use relay_common::log;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RelayEvent {
    Spawned { child_pid: i32, process_group: i32 },
    SignalForwarded { signal: String, process_group: i32 },
    EchoAbsorbed { signal: String },
    ChildExited { code: i32 },
    ChildKilled { signal: String },
    Exiting { code: i32 },
    Reraising { signal: String },
}

#[derive(Serialize)]
struct EventEntry<'a> {
    ts: String,
    #[serde(flatten)]
    event: &'a RelayEvent,
}

/// JSONL sink for [`RelayEvent`]s. Disabled when no path is configured.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    path: Option<PathBuf>,
}

impl EventLog {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn record(&self, event: RelayEvent) {
        let Some(path) = &self.path else {
            return;
        };

        let entry = EventEntry {
            ts: log::timestamp(),
            event: &event,
        };
        let Ok(json) = serde_json::to_string(&entry) else {
            return;
        };

        let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) else {
            debug!(path = %path.display(), "event log unavailable");
            return;
        };
        // One write per entry so concurrent readers never see half a line.
        let _ = file.write_all(format!("{json}\n").as_bytes());
    }
}
