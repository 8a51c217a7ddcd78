#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::unreachable
)]

use std::os::unix::process::ExitStatusExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use relay_common::pidfile::read_pid;

const TIMEOUT: Duration = Duration::from_secs(20);
const POLL: Duration = Duration::from_millis(20);

struct Probe {
    dir: tempfile::TempDir,
    child: Child,
}

impl Probe {
    fn start(args: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let child = Command::new(env!("CARGO_BIN_EXE_signal-probe"))
            .args(args)
            .current_dir(dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();
        Self { dir, child }
    }

    /// Block until handlers are installed and the pid file is written.
    fn ready(&self) -> Pid {
        let path = self.dir.path().join("signal-probe.pid");
        wait_until(|| read_pid(&path).is_ok(), "pid file");
        Pid::from_raw(read_pid(&path).unwrap())
    }

    fn log(&self) -> String {
        std::fs::read_to_string(self.dir.path().join("signal-probe.log")).unwrap_or_default()
    }

    fn wait(&mut self) -> ExitStatus {
        let deadline = Instant::now() + TIMEOUT;
        loop {
            if let Some(status) = self.child.try_wait().unwrap() {
                return status;
            }
            assert!(Instant::now() < deadline, "signal-probe did not exit in time");
            thread::sleep(POLL);
        }
    }
}

impl Drop for Probe {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn wait_until(mut ready: impl FnMut() -> bool, what: &str) {
    let deadline = Instant::now() + TIMEOUT;
    while !ready() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(POLL);
    }
}

#[test]
fn run_for_exits_with_configured_code() {
    let mut probe = Probe::start(&["--run-for", "1", "--exit-code", "3"]);
    let pid = probe.ready();

    let status = probe.wait();
    assert_eq!(status.code(), Some(3));

    let log = probe.log();
    assert!(log.contains(&format!("signal-probe: my pid is {pid}")));
    assert!(log.contains("signal-probe: tick "));
    assert!(log.contains("run time elapsed, exiting with 3"));
}

#[test]
fn ignored_signal_is_logged_then_caught_signal_exits() {
    let mut probe = Probe::start(&[]);
    let pid = probe.ready();

    kill(pid, Signal::SIGINT).unwrap();
    wait_until(|| probe.log().contains("received SIGINT (2)"), "SIGINT log");
    assert!(probe.child.try_wait().unwrap().is_none());

    kill(pid, Signal::SIGTERM).unwrap();
    let status = probe.wait();
    assert_eq!(status.code(), Some(1));
    assert!(probe.log().contains("exiting on SIGTERM"));
}

#[test]
fn custom_catch_exit_code() {
    let mut probe = Probe::start(&["--catch", "USR1", "--catch-exit-code", "9"]);
    let pid = probe.ready();

    kill(pid, Signal::SIGUSR1).unwrap();
    assert_eq!(probe.wait().code(), Some(9));
}

#[test]
fn default_disposition_signal_kills_probe() {
    let mut probe = Probe::start(&["--default", "TERM"]);
    let pid = probe.ready();

    kill(pid, Signal::SIGTERM).unwrap();
    let status = probe.wait();
    assert_eq!(status.signal(), Some(Signal::SIGTERM as i32));
    assert!(!probe.log().contains("received SIGTERM"));
}

#[test]
fn untrappable_signal_fails_startup() {
    let mut probe = Probe::start(&["--catch", "KILL"]);
    assert_eq!(probe.wait().code(), Some(2));
}
