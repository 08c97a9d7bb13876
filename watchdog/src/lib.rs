//! Heartbeat-based liveness supervision.
//!
//! Every supervised thread owns a [`ControlUnit`] and pings it once per
//! loop iteration. A [`Watchdog`] holds weak references to the units and a
//! periodic [`Watchdog::sweep`] demotes them: a unit that missed one sweep
//! goes `Down`, a unit that missed two goes `Rogue`. [`supervise`] runs the
//! sweeps on a dedicated thread and escalates condemned units, by default
//! by aborting the process.

use thiserror::Error;

pub mod registry;
pub mod thread;
pub mod unit;

pub use registry::Watchdog;
pub use thread::{abort_process, spawn_supervisor, supervise};
pub use unit::{ControlUnit, Status};

#[derive(Error, Debug)]
pub enum WatchdogError {
    #[error("watchdog capacity must be greater than zero")]
    ZeroCapacity,
    #[error("watchdog is full ({0} units)")]
    Full(usize),
    #[error("unit {0} is already registered")]
    AlreadyRegistered(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WatchdogError>;
