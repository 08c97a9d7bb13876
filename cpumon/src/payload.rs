use std::fmt;

use crate::{MonitorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("Warning"),
            Severity::Error => f.write_str("Error"),
        }
    }
}

/// A diagnostic record travelling to the logger stage.
///
/// Not `Clone`: once pushed onto the log edge the record belongs to the
/// logger.
#[derive(Debug, PartialEq, Eq)]
pub struct LogPayload {
    severity: Severity,
    message: String,
}

impl LogPayload {
    pub fn new(severity: Severity, message: impl Into<String>) -> Result<Self> {
        let message = message.into();
        if message.is_empty() {
            return Err(MonitorError::EmptyMessage);
        }
        Ok(LogPayload { severity, message })
    }

    pub fn warning(message: impl Into<String>) -> Result<Self> {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Result<Self> {
        Self::new(Severity::Error, message)
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
