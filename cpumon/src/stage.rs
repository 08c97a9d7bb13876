//! The loop every pipeline thread runs.
//!
//! A stage checks the shared flag, pings its control unit, then does one
//! unit of work through [`Stage::step`]. Once the flag is cleared, or an
//! edge reports that the pipeline stopped, the stage runs
//! [`Stage::finalize`] to release its peers and marks its unit finished.

use pcpbuf::{Edge, Shutdown};
use std::io;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};
use watchdog::ControlUnit;

use crate::payload::{LogPayload, Severity};

pub trait Stage: Send {
    /// One iteration of work. `Break` means an edge observed the stop.
    fn step(&mut self, context: &StageContext) -> ControlFlow<()>;

    /// Release every peer that may be parked on this stage's edges.
    fn finalize(&mut self, context: &StageContext);
}

impl<S: Stage + ?Sized> Stage for Box<S> {
    fn step(&mut self, context: &StageContext) -> ControlFlow<()> {
        (**self).step(context)
    }

    fn finalize(&mut self, context: &StageContext) {
        (**self).finalize(context)
    }
}

/// What every stage shares with the rest of the pipeline.
#[derive(Clone)]
pub struct StageContext {
    name: &'static str,
    shutdown: Shutdown,
    unit: Arc<ControlUnit>,
    log: Arc<Edge<LogPayload>>,
}

impl StageContext {
    pub fn new(
        name: &'static str,
        shutdown: Shutdown,
        unit: Arc<ControlUnit>,
        log: Arc<Edge<LogPayload>>,
    ) -> Self {
        StageContext {
            name,
            shutdown,
            unit,
            log,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    pub fn unit(&self) -> &Arc<ControlUnit> {
        &self.unit
    }

    pub fn log_edge(&self) -> &Edge<LogPayload> {
        &self.log
    }

    /// Hand a diagnostic to the logger stage.
    ///
    /// Blocks while the log edge is full. A payload that cannot be delivered
    /// because the pipeline stopped is reported through `tracing` instead.
    pub fn send_log(&self, severity: Severity, message: impl Into<String>) {
        let payload = match LogPayload::new(severity, message) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(stage = self.name, error = %e, "refusing log payload");
                return;
            }
        };

        if let Err(payload) = self.log.push(payload, &self.shutdown) {
            warn!(
                stage = self.name,
                severity = %payload.severity(),
                message = payload.message(),
                "log payload dropped on shutdown"
            );
        }
    }
}

/// Drive `stage` until the pipeline stops, then hand it back.
pub fn run<S: Stage>(mut stage: S, context: StageContext) -> S {
    context.unit.attach_current_thread();
    debug!(stage = context.name, "stage started");

    while context.shutdown.is_running() {
        context.unit.ping();
        if stage.step(&context).is_break() {
            break;
        }
    }

    stage.finalize(&context);
    context.unit.finish();
    debug!(stage = context.name, "stage finished");
    stage
}

pub fn spawn<S: Stage + 'static>(stage: S, context: StageContext) -> io::Result<JoinHandle<S>> {
    thread::Builder::new()
        .name(context.name.to_string())
        .spawn(move || run(stage, context))
}
