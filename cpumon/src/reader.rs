use pcpbuf::Edge;
use std::io::{self, BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use crate::payload::Severity;
use crate::stage::{Stage, StageContext};

/// Byte filler inserted when the reader leaves the pipeline.
pub const FILLER: u8 = b' ';

/// Streams the input source byte by byte onto the byte edge, rewinding it
/// after every full pass.
pub struct Reader<R> {
    input: BufReader<R>,
    bytes: Arc<Edge<u8>>,
    interval: Duration,
    passes: u64,
}

impl<R: Read + Seek + Send> Reader<R> {
    pub fn new(input: R, bytes: Arc<Edge<u8>>, interval: Duration) -> Self {
        Reader {
            input: BufReader::new(input),
            bytes,
            interval,
            passes: 0,
        }
    }

    fn rewind(&mut self, context: &StageContext) -> ControlFlow<()> {
        self.passes += 1;
        trace!(passes = self.passes, "input exhausted");

        if !context.shutdown().wait_timeout(self.interval) {
            return ControlFlow::Break(());
        }
        if let Err(e) = self.input.seek(SeekFrom::Start(0)) {
            context.send_log(Severity::Error, format!("failed to rewind input: {}", e));
        }
        ControlFlow::Continue(())
    }

    fn report(&mut self, context: &StageContext, error: io::Error) -> ControlFlow<()> {
        debug!(error = %error, "input read failed");
        context.send_log(Severity::Error, format!("failed to read input: {}", error));

        if context.shutdown().wait_timeout(self.interval) {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(())
        }
    }
}

impl<R: Read + Seek + Send> Stage for Reader<R> {
    fn step(&mut self, context: &StageContext) -> ControlFlow<()> {
        let mut byte = [0u8; 1];
        match self.input.read(&mut byte) {
            Ok(0) => self.rewind(context),
            Ok(_) => match self.bytes.push(byte[0], context.shutdown()) {
                Ok(()) => ControlFlow::Continue(()),
                Err(_) => ControlFlow::Break(()),
            },
            Err(e) if e.kind() == ErrorKind::Interrupted => ControlFlow::Continue(()),
            Err(e) => self.report(context, e),
        }
    }

    fn finalize(&mut self, context: &StageContext) {
        self.bytes.release_consumer(FILLER);
        context.log_edge().wake_consumers();
    }
}
