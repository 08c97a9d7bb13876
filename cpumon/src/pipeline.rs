use pcpbuf::{Edge, Shutdown};
use std::io::{Read, Seek};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info};
use watchdog::{ControlUnit, Watchdog};

use crate::config::Config;
use crate::logger::{LogSink, Logger};
use crate::parser::{Parser, Usage};
use crate::payload::LogPayload;
use crate::printer::{Presenter, Printer};
use crate::reader::Reader;
use crate::stage::{self, Stage, StageContext};
use crate::{MonitorError, Result};

/// Reader, parser, printer and logger.
pub const STAGES: usize = 4;

/// A running monitor: every stage thread plus the watchdog supervisor.
pub struct Pipeline<L> {
    shutdown: Shutdown,
    bytes: Arc<Edge<u8>>,
    usage: Arc<Edge<Usage>>,
    log: Arc<Edge<LogPayload>>,
    units: Vec<Arc<ControlUnit>>,
    logger: Option<JoinHandle<Logger<L>>>,
    stages: Vec<(&'static str, JoinHandle<Box<dyn Stage>>)>,
    supervisor: Option<JoinHandle<()>>,
}

impl<L: LogSink + 'static> Pipeline<L> {
    /// Build the edges and start every thread: the logger first so that
    /// start-up diagnostics have a consumer, the supervisor last.
    ///
    /// If any thread fails to start, the ones already running are stopped
    /// and joined before the error is returned.
    pub fn start<R, P, F>(
        config: &Config,
        input: R,
        presenter: P,
        sink: L,
        shutdown: Shutdown,
        escalate: F,
    ) -> Result<Self>
    where
        R: Read + Seek + Send + 'static,
        P: Presenter + 'static,
        F: FnMut(&[Arc<ControlUnit>]) + Send + 'static,
    {
        let mut pipeline = Pipeline {
            shutdown,
            bytes: Arc::new(Edge::new("bytes", config.buffers.bytes)?),
            usage: Arc::new(Edge::new("usage", config.buffers.usage)?),
            log: Arc::new(Edge::new("log", config.buffers.log)?),
            units: Vec::with_capacity(STAGES),
            logger: None,
            stages: Vec::with_capacity(STAGES - 1),
            supervisor: None,
        };

        if let Err(e) = pipeline.launch(config, input, presenter, sink, escalate) {
            error!(error = %e, "failed to start pipeline");
            pipeline.halt();
            return Err(e);
        }

        info!(
            input = %config.input.display(),
            interval_ms = config.timing.sample_interval_ms,
            "pipeline started"
        );
        Ok(pipeline)
    }

    fn launch<R, P, F>(
        &mut self,
        config: &Config,
        input: R,
        presenter: P,
        sink: L,
        escalate: F,
    ) -> Result<()>
    where
        R: Read + Seek + Send + 'static,
        P: Presenter + 'static,
        F: FnMut(&[Arc<ControlUnit>]) + Send + 'static,
    {
        let timing = &config.timing;

        let logger = Logger::new(self.log.clone(), sink, timing.logger_wait());
        self.logger = Some(stage::spawn(logger, self.context("logger"))?);

        let reader = Reader::new(input, self.bytes.clone(), timing.sample_interval());
        self.spawn_stage("reader", reader)?;

        let parser = Parser::new(self.bytes.clone(), self.usage.clone(), config.max_line_len);
        self.spawn_stage("parser", parser)?;

        let printer = Printer::new(self.usage.clone(), presenter, config.max_cores);
        self.spawn_stage("printer", printer)?;

        let mut registry = Watchdog::new(STAGES)?;
        for unit in &self.units {
            registry.add_puppy(unit)?;
        }
        self.supervisor = Some(watchdog::spawn_supervisor(
            registry,
            self.shutdown.clone(),
            timing.watchdog_interval(),
            escalate,
        )?);
        Ok(())
    }

    fn context(&mut self, name: &'static str) -> StageContext {
        let unit = Arc::new(ControlUnit::new(name));
        self.units.push(unit.clone());
        StageContext::new(name, self.shutdown.clone(), unit, self.log.clone())
    }

    fn spawn_stage<S: Stage + 'static>(&mut self, name: &'static str, stage: S) -> Result<()> {
        let context = self.context(name);
        let handle = stage::spawn(Box::new(stage) as Box<dyn Stage>, context)?;
        self.stages.push((name, handle));
        Ok(())
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    pub fn units(&self) -> &[Arc<ControlUnit>] {
        &self.units
    }

    /// Block until the shared flag is cleared, by a signal or by the caller.
    pub fn wait(&self) {
        self.shutdown.wait();
    }

    /// Stop every thread, persist log payloads still queued and hand the
    /// sink back.
    pub fn stop(mut self) -> Result<L> {
        self.shutdown.trigger();
        let mut outcome = self.join_stages();

        let logger = match self.logger.take().map(JoinHandle::join) {
            Some(Ok(logger)) => Some(logger),
            Some(Err(_)) => {
                error!(stage = "logger", "stage panicked");
                outcome = outcome.and(Err(MonitorError::StagePanicked("logger")));
                None
            }
            None => None,
        };

        let leftover = self.log.drain();
        let sink = logger.map(|mut logger| {
            if !leftover.is_empty() {
                debug!(count = leftover.len(), "persisting queued log payloads");
            }
            for payload in leftover {
                logger.persist(payload);
            }
            info!(persisted = logger.persisted(), "logger stopped");
            logger.into_sink()
        });

        if let Some(supervisor) = self.supervisor.take() {
            if supervisor.join().is_err() {
                error!("watchdog thread panicked");
                outcome = outcome.and(Err(MonitorError::StagePanicked("watchdog")));
            }
        }

        outcome?;
        sink.ok_or(MonitorError::StagePanicked("logger"))
    }

    fn join_stages(&mut self) -> Result<()> {
        let mut outcome = Ok(());
        for (name, handle) in self.stages.drain(..) {
            if handle.join().is_err() {
                error!(stage = name, "stage panicked");
                outcome = outcome.and(Err(MonitorError::StagePanicked(name)));
            }
        }
        outcome
    }

    /// Tear down a partially started pipeline. Stages that never started
    /// cannot release their peers, so every edge is woken here instead.
    fn halt(&mut self) {
        self.shutdown.trigger();
        self.bytes.wake_producers();
        self.bytes.wake_consumers();
        self.usage.wake_producers();
        self.usage.wake_consumers();
        self.log.wake_producers();
        let _ = self.join_stages();
        if let Some(logger) = self.logger.take() {
            let _ = logger.join();
        }
        if let Some(supervisor) = self.supervisor.take() {
            let _ = supervisor.join();
        }
    }
}

impl<L> Drop for Pipeline<L> {
    fn drop(&mut self) {
        if self.shutdown.trigger() {
            debug!("pipeline dropped while running");
        }
    }
}
