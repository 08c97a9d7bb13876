use pcpbuf::Shutdown;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error};

use crate::{ControlUnit, Result, Watchdog};

/// Default escalation: log the condemned units and abort the process.
pub fn abort_process(condemned: &[Arc<ControlUnit>]) {
    error!(
        units = condemned.len(),
        "one of the threads is not responding, aborting"
    );
    std::process::abort();
}

/// Sweep `watchdog` every `interval` until `shutdown` is triggered, handing
/// units condemned by a sweep to `escalate`.
pub fn supervise<F>(watchdog: Watchdog, shutdown: Shutdown, interval: Duration, mut escalate: F)
where
    F: FnMut(&[Arc<ControlUnit>]),
{
    debug!(
        units = watchdog.len(),
        interval_ms = interval.as_millis() as u64,
        "watchdog started"
    );

    while shutdown.wait_timeout(interval) {
        let condemned = watchdog.sweep();
        if condemned.is_empty() {
            continue;
        }

        for unit in &condemned {
            let thread = unit.thread();
            error!(
                unit = unit.name(),
                thread = ?thread.as_ref().and_then(|t| t.name().map(str::to_string)),
                "thread is not responding"
            );
        }
        escalate(&condemned);
    }

    debug!("watchdog shutting down");
}

pub fn spawn_supervisor<F>(
    watchdog: Watchdog,
    shutdown: Shutdown,
    interval: Duration,
    escalate: F,
) -> Result<JoinHandle<()>>
where
    F: FnMut(&[Arc<ControlUnit>]) + Send + 'static,
{
    let handle = thread::Builder::new()
        .name("watchdog".to_string())
        .spawn(move || supervise(watchdog, shutdown, interval, escalate))?;
    Ok(handle)
}
