//! Start, stop and restart of the single worker process.
//!
//! - [`process`]: liveness probes and termination of an existing process
//! - [`spawn`]: launching the configured worker program and waiting until it listens
//! - [`WorkerSupervisor`]: adopt-or-spawn lifecycle on top of both
//!
//! A worker that was already listening when [`WorkerSupervisor::start`] ran is
//! adopted and never stopped by us; only a worker we spawned is owned.

pub mod process;
pub mod spawn;

mod supervisor;

pub use supervisor::{WorkerInfo, WorkerSupervisor};
