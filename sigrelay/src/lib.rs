//! A signal-forwarding process supervisor.
//!
//! Launches one child in the supervisor's own process group, relays a configured set of
//! signals to that group, waits for the child and then terminates the same
//! way the child did.
//!
//! Lifecycle: [`Supervisor`] (idle) → [`Running`] → [`Draining`] → exit.

pub mod config;
pub mod error;
pub mod events;
pub mod exit;
pub mod pidfiles;
pub mod process;
pub mod router;
pub mod signals;
pub mod supervisor;

pub use config::{Cli, SupervisorConfig};
pub use error::{INTERNAL_FAILURE, SupervisorError, SupervisorResult};
pub use exit::{ExitPlan, ExitReplicator};
pub use supervisor::{Draining, Running, Supervisor, SupervisorState, WaitResult};
