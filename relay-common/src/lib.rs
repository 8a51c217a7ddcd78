//! Common utilities for the supervisor and its test child.
//!
//! This crate provides shared functionality for both binaries:
//! - Signal name parsing and disposition helpers
//! - PID file handling
//! - Log timestamps

pub mod log;
pub mod pidfile;
pub mod signal;
