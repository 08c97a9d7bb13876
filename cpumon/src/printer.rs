// Copyright (C) 2025 Category Labs, Inc.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use pcpbuf::Edge;
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::trace;

use crate::parser::Usage;
use crate::payload::Severity;
use crate::stage::{Stage, StageContext};

/// Renders one complete batch of per-core usage percentages.
pub trait Presenter: Send {
    fn present(&mut self, usage: &[f64]) -> io::Result<()>;
}

/// Writes `Core #<i> usage: <p>%` lines.
pub struct TerminalPresenter<W> {
    out: W,
}

impl<W: Write + Send> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        TerminalPresenter { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl TerminalPresenter<io::Stdout> {
    pub fn stdout() -> Self {
        TerminalPresenter::new(io::stdout())
    }
}

impl<W: Write + Send> Presenter for TerminalPresenter<W> {
    fn present(&mut self, usage: &[f64]) -> io::Result<()> {
        for (core, percent) in usage.iter().enumerate() {
            writeln!(self.out, "Core #{} usage: {:.2}%", core, percent)?;
        }
        self.out.flush()
    }
}

/// Collects usage values into batches and hands each complete batch to the
/// presenter.
pub struct Printer<P> {
    usage: Arc<Edge<Usage>>,
    presenter: P,
    batch: Vec<f64>,
    max_cores: usize,
}

impl<P: Presenter> Printer<P> {
    pub fn new(usage: Arc<Edge<Usage>>, presenter: P, max_cores: usize) -> Self {
        Printer {
            usage,
            presenter,
            batch: Vec::with_capacity(max_cores),
            max_cores,
        }
    }

    pub fn into_presenter(self) -> P {
        self.presenter
    }
}

impl<P: Presenter> Stage for Printer<P> {
    fn step(&mut self, context: &StageContext) -> ControlFlow<()> {
        let Some(value) = self.usage.pop(context.shutdown()) else {
            return ControlFlow::Break(());
        };

        match value {
            Usage::Core(percent) => {
                if self.batch.len() == self.max_cores {
                    context.send_log(
                        Severity::Warning,
                        format!("batch exceeded {} cores, dropping it", self.max_cores),
                    );
                    self.batch.clear();
                }
                self.batch.push(percent);
            }
            Usage::EndOfBatch => {
                if !self.batch.is_empty() && context.shutdown().is_running() {
                    trace!(cores = self.batch.len(), "presenting batch");
                    if let Err(e) = self.presenter.present(&self.batch) {
                        context.send_log(Severity::Error, format!("failed to present usage: {}", e));
                    }
                }
                self.batch.clear();
            }
        }
        ControlFlow::Continue(())
    }

    fn finalize(&mut self, context: &StageContext) {
        self.usage.release_producer();
        context.log_edge().wake_consumers();
    }
}
