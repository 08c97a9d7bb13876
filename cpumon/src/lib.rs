//! Per-core CPU utilization monitor.
//!
//! Four supervised stages connected by bounded [`pcpbuf::Edge`]s:
//!
//! ```text
//! reader --bytes--> parser --usage--> printer
//!    \                 |                 /
//!     `-------------- log --------------'--> logger
//! ```
//!
//! [`Pipeline`] owns every edge and control unit, starts the stages and
//! the watchdog supervisor, and joins everything on stop.

use thiserror::Error;

pub mod config;
pub mod logger;
pub mod parser;
pub mod payload;
pub mod pipeline;
pub mod printer;
pub mod procstat;
pub mod reader;
pub mod stage;

pub use config::Config;
pub use logger::{FileSink, LogSink};
pub use payload::{LogPayload, Severity};
pub use pipeline::Pipeline;
pub use printer::{Presenter, TerminalPresenter};

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("buffer error: {0}")]
    Buffer(#[from] pcpbuf::PcpBufError),
    #[error("watchdog error: {0}")]
    Watchdog(#[from] watchdog::WatchdogError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("log message must not be empty")]
    EmptyMessage,
    #[error("{0} thread panicked")]
    StagePanicked(&'static str),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
