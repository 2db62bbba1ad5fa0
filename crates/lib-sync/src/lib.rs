//! # lib-sync
//!
//! Master-side synchronization schedulers for FMI co-simulation slaves.
//!
//! A driving loop queries a slave at arbitrary times with `sync(t0, t1)`;
//! the scheduler reconciles those queries with the slave's communication
//! steps:
//!
//! - **Fixed-step**: steps at the configured size, never past the query,
//!   and holds the latest outputs in between
//! - **Interpolating fixed-step**: fixed steps plus linear interpolation
//!   of real outputs between the two most recent entries
//! - **Variable-step**: one step covering exactly the queried interval,
//!   for slaves that declare support
//!
//! Schedulers drive slaves through the [`CoSimSlave`] trait, which
//! [`lib_fmi_ffi::SlaveBinding`] implements.

pub mod error;
pub mod interpolation;
pub mod io;
pub mod scheduler;
pub mod slave;
pub mod state;

mod engine;
mod fixed;
mod interpolating;
mod variable;

#[cfg(test)]
mod testing;

pub use error::{SyncError, SyncResult};
pub use fixed::FixedStep;
pub use interpolating::InterpolatingFixedStep;
pub use io::{InitialValues, InputValues, IoLayout, VariableSet};
pub use scheduler::{Policy, Scheduler};
pub use slave::CoSimSlave;
pub use state::{InitConfig, SchedulerState, DEFAULT_TOLERANCE};
pub use variable::VariableStep;
