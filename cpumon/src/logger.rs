use pcpbuf::Edge;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::warn;

use crate::payload::LogPayload;
use crate::stage::{Stage, StageContext};

/// Destination of the diagnostics collected by the logger stage.
pub trait LogSink: Send {
    fn persist(&mut self, payload: &LogPayload, timestamp: SystemTime) -> io::Result<()>;
}

/// Appends human-readable event records to a writer, flushing after each.
pub struct FileSink<W> {
    out: W,
}

impl FileSink<BufWriter<File>> {
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(FileSink::new(BufWriter::new(file)))
    }
}

impl<W: Write + Send> FileSink<W> {
    pub fn new(out: W) -> Self {
        FileSink { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> LogSink for FileSink<W> {
    fn persist(&mut self, payload: &LogPayload, timestamp: SystemTime) -> io::Result<()> {
        write!(
            self.out,
            "Event: {}\nTime: {}\nMessage: {} \n ----------\n",
            payload.severity(),
            humantime::format_rfc3339_seconds(timestamp),
            payload.message()
        )?;
        self.out.flush()
    }
}

/// Sole consumer of the log edge.
pub struct Logger<L> {
    log: Arc<Edge<LogPayload>>,
    sink: L,
    wait: Duration,
    persisted: u64,
}

impl<L: LogSink> Logger<L> {
    pub fn new(log: Arc<Edge<LogPayload>>, sink: L, wait: Duration) -> Self {
        Logger {
            log,
            sink,
            wait,
            persisted: 0,
        }
    }

    pub fn persist(&mut self, payload: LogPayload) {
        match self.sink.persist(&payload, SystemTime::now()) {
            Ok(()) => self.persisted += 1,
            Err(e) => warn!(
                error = %e,
                severity = %payload.severity(),
                message = payload.message(),
                "failed to persist log payload"
            ),
        }
    }

    /// Number of payloads written to the sink so far.
    pub fn persisted(&self) -> u64 {
        self.persisted
    }

    pub fn into_sink(self) -> L {
        self.sink
    }
}

impl<L: LogSink> Stage for Logger<L> {
    fn step(&mut self, _context: &StageContext) -> ControlFlow<()> {
        if let Some(payload) = self.log.pop_timeout(self.wait) {
            self.persist(payload);
        }
        ControlFlow::Continue(())
    }

    fn finalize(&mut self, _context: &StageContext) {
        if let Some(payload) = self.log.release_producer() {
            self.persist(payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Severity;
    use pcpbuf::Shutdown;
    use rstest::*;
    use std::time::UNIX_EPOCH;
    use watchdog::ControlUnit;

    struct Failing;

    impl LogSink for Failing {
        fn persist(&mut self, _payload: &LogPayload, _timestamp: SystemTime) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
    }

    fn context(log: &Arc<Edge<LogPayload>>) -> StageContext {
        StageContext::new(
            "logger",
            Shutdown::new(),
            Arc::new(ControlUnit::new("logger")),
            log.clone(),
        )
    }

    #[rstest]
    fn test_record_format() {
        let mut sink = FileSink::new(Vec::new());
        let payload = LogPayload::warning("buffer size is too small").unwrap();

        sink.persist(&payload, UNIX_EPOCH + Duration::from_secs(86_400))
            .unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            text,
            "Event: Warning\nTime: 1970-01-02T00:00:00Z\nMessage: buffer size is too small \n ----------\n"
        );
    }

    #[rstest]
    fn test_file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("program_log.txt");

        for message in ["first", "second"] {
            let mut sink = FileSink::create(&path).unwrap();
            sink.persist(&LogPayload::error(message).unwrap(), SystemTime::now())
                .unwrap();
        }

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("Event: Error").count(), 2);
        assert!(text.find("first").unwrap() < text.find("second").unwrap());
    }

    #[rstest]
    fn test_step_persists_queued_payload() {
        let log = Arc::new(Edge::new("log", 4).unwrap());
        let context = context(&log);
        let mut logger = Logger::new(log.clone(), FileSink::new(Vec::new()), Duration::from_millis(5));
        context.send_log(Severity::Error, "read failed");

        assert!(logger.step(&context).is_continue());

        assert_eq!(logger.persisted(), 1);
        let text = String::from_utf8(logger.into_sink().into_inner()).unwrap();
        assert!(text.contains("Message: read failed \n"));
    }

    #[rstest]
    fn test_step_times_out_on_empty_edge() {
        let log = Arc::new(Edge::new("log", 4).unwrap());
        let context = context(&log);
        let mut logger = Logger::new(log, FileSink::new(Vec::new()), Duration::from_millis(5));

        assert!(logger.step(&context).is_continue());
        assert_eq!(logger.persisted(), 0);
    }

    #[rstest]
    fn test_finalize_persists_released_payload() {
        let log = Arc::new(Edge::new("log", 4).unwrap());
        let context = context(&log);
        let mut logger = Logger::new(log.clone(), FileSink::new(Vec::new()), Duration::from_millis(5));
        context.send_log(Severity::Warning, "late");

        logger.finalize(&context);

        assert_eq!(logger.persisted(), 1);
        assert!(log.is_empty());
    }

    #[rstest]
    fn test_sink_errors_are_not_fatal() {
        let log = Arc::new(Edge::new("log", 4).unwrap());
        let context = context(&log);
        let mut logger = Logger::new(log, Failing, Duration::from_millis(5));
        context.send_log(Severity::Warning, "lost");

        assert!(logger.step(&context).is_continue());
        assert_eq!(logger.persisted(), 0);
    }
}
