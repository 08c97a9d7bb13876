use pcpbuf::Edge;
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::payload::Severity;
use crate::procstat::{self, CpuTimes, ProcLine};
use crate::stage::{Stage, StageContext};

/// One element on the usage edge. A batch is any number of `Core` values
/// closed by `EndOfBatch`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Usage {
    Core(f64),
    EndOfBatch,
}

/// Assembles bytes into lines and lines into per-core usage batches.
pub struct Parser {
    bytes: Arc<Edge<u8>>,
    usage: Arc<Edge<Usage>>,
    line: Vec<u8>,
    max_line_len: usize,
    overflowed: bool,
    current: Vec<CpuTimes>,
    previous: Vec<CpuTimes>,
}

impl Parser {
    pub fn new(bytes: Arc<Edge<u8>>, usage: Arc<Edge<Usage>>, max_line_len: usize) -> Self {
        Parser {
            bytes,
            usage,
            line: Vec::with_capacity(max_line_len),
            max_line_len,
            overflowed: false,
            current: Vec::new(),
            previous: Vec::new(),
        }
    }

    fn accept(&mut self, byte: u8, context: &StageContext) -> ControlFlow<()> {
        if byte != b'\n' {
            if self.line.len() == self.max_line_len {
                self.line.clear();
                self.overflowed = true;
            }
            self.line.push(byte);
            return ControlFlow::Continue(());
        }

        if std::mem::take(&mut self.overflowed) {
            self.line.clear();
            context.send_log(
                Severity::Warning,
                format!("discarded input line longer than {} bytes", self.max_line_len),
            );
            return self.close_batch(context);
        }

        let line = std::mem::take(&mut self.line);
        let flow = match std::str::from_utf8(&line) {
            Ok(text) => self.classify(text, context),
            Err(_) => {
                context.send_log(Severity::Warning, "discarded non UTF-8 input line");
                self.close_batch(context)
            }
        };
        self.line = line;
        self.line.clear();
        flow
    }

    fn classify(&mut self, text: &str, context: &StageContext) -> ControlFlow<()> {
        match procstat::parse_line(text) {
            ProcLine::Core(times) => {
                self.current.push(times);
                ControlFlow::Continue(())
            }
            ProcLine::Malformed => {
                context.send_log(Severity::Warning, format!("malformed core line: {}", text));
                self.close_batch(context)
            }
            ProcLine::Summary | ProcLine::Unrelated => self.close_batch(context),
        }
    }

    fn close_batch(&mut self, context: &StageContext) -> ControlFlow<()> {
        if self.current.is_empty() {
            return ControlFlow::Continue(());
        }

        let current = std::mem::take(&mut self.current);
        let previous = std::mem::replace(&mut self.previous, current);

        if previous.len() != self.previous.len() {
            if !previous.is_empty() {
                debug!(
                    before = previous.len(),
                    after = self.previous.len(),
                    "core count changed"
                );
                context.send_log(
                    Severity::Warning,
                    format!(
                        "core count changed from {} to {}",
                        previous.len(),
                        self.previous.len()
                    ),
                );
            }
            return ControlFlow::Continue(());
        }

        trace!(cores = self.previous.len(), "batch complete");
        for (before, after) in previous.iter().zip(&self.previous) {
            let value = Usage::Core(procstat::usage(before, after));
            if self.usage.push(value, context.shutdown()).is_err() {
                return ControlFlow::Break(());
            }
        }
        match self.usage.push(Usage::EndOfBatch, context.shutdown()) {
            Ok(()) => ControlFlow::Continue(()),
            Err(_) => ControlFlow::Break(()),
        }
    }
}

impl Stage for Parser {
    fn step(&mut self, context: &StageContext) -> ControlFlow<()> {
        match self.bytes.pop(context.shutdown()) {
            Some(byte) => self.accept(byte, context),
            None => ControlFlow::Break(()),
        }
    }

    fn finalize(&mut self, context: &StageContext) {
        self.bytes.release_producer();
        self.usage.release_consumer(Usage::EndOfBatch);
        context.log_edge().wake_consumers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcpbuf::Shutdown;
    use rstest::*;
    use watchdog::ControlUnit;

    const FIRST: &str = "cpu  300 0 300 2400 0 0 0 0 0 0\n\
                         cpu0 100 0 100 800 0 0 0 0 0 0\n\
                         cpu1 100 0 100 800 0 0 0 0 0 0\n\
                         intr 1 2 3\n";
    const SECOND: &str = "cpu  400 0 400 2600 0 0 0 0 0 0\n\
                          cpu0 150 0 150 900 0 0 0 0 0 0\n\
                          cpu1 100 0 100 900 0 0 0 0 0 0\n\
                          intr 1 2 3\n";

    struct Harness {
        parser: Parser,
        context: StageContext,
        usage: Arc<Edge<Usage>>,
    }

    impl Harness {
        fn feed(&mut self, text: &str) {
            for byte in text.bytes() {
                assert!(self.parser.accept(byte, &self.context).is_continue());
            }
        }

        fn logged(&self) -> Vec<String> {
            self.context
                .log_edge()
                .drain()
                .into_iter()
                .map(|payload| payload.message().to_string())
                .collect()
        }
    }

    #[fixture]
    fn harness() -> Harness {
        let bytes = Arc::new(Edge::new("bytes", 4).unwrap());
        let usage = Arc::new(Edge::new("usage", 32).unwrap());
        let context = StageContext::new(
            "parser",
            Shutdown::new(),
            Arc::new(ControlUnit::new("parser")),
            Arc::new(Edge::new("log", 8).unwrap()),
        );
        Harness {
            parser: Parser::new(bytes, usage.clone(), 64),
            context,
            usage,
        }
    }

    #[rstest]
    fn test_first_pass_only_primes(mut harness: Harness) {
        harness.feed(FIRST);

        assert!(harness.usage.is_empty());
        assert_eq!(harness.parser.previous.len(), 2);
    }

    #[rstest]
    fn test_second_pass_emits_batch(mut harness: Harness) {
        harness.feed(FIRST);
        harness.feed(SECOND);

        assert_eq!(
            harness.usage.drain(),
            vec![Usage::Core(50.0), Usage::Core(0.0), Usage::EndOfBatch]
        );
    }

    #[rstest]
    fn test_core_count_change_reprimes(mut harness: Harness) {
        harness.feed(FIRST);
        harness.feed("cpu0 150 0 150 900 0 0 0 0 0 0\nintr 1\n");

        assert!(harness.usage.is_empty());
        assert_eq!(harness.logged(), vec!["core count changed from 2 to 1"]);

        harness.feed("cpu0 200 0 200 1000 0 0 0 0 0 0\nintr 1\n");
        assert_eq!(harness.usage.drain().len(), 2);
    }

    #[rstest]
    fn test_overlong_line_is_discarded(mut harness: Harness) {
        let long = format!("cpu0 {}\n", "1 ".repeat(64));
        harness.feed(&long);

        assert_eq!(
            harness.logged(),
            vec!["discarded input line longer than 64 bytes"]
        );
        assert!(harness.parser.current.is_empty());
        assert!(harness.parser.line.is_empty());
    }

    #[rstest]
    fn test_malformed_line_is_reported(mut harness: Harness) {
        harness.feed("cpu7 garbage\n");

        let logged = harness.logged();
        assert_eq!(logged.len(), 1);
        assert!(logged[0].starts_with("malformed core line"));
    }

    #[rstest]
    fn test_step_breaks_on_stopped_empty_edge(mut harness: Harness) {
        harness.context.shutdown().trigger();

        assert!(harness.parser.step(&harness.context).is_break());
    }
}
