use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{MonitorError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_input")]
    pub input: PathBuf,

    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    #[serde(default)]
    pub buffers: BufferConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    /// Longest `/proc/stat` line the parser accumulates.
    #[serde(default = "default_max_line_len")]
    pub max_line_len: usize,

    /// Largest batch the printer collects before it resets.
    #[serde(default = "default_max_cores")]
    pub max_cores: usize,
}

/// Edge capacities, in elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferConfig {
    #[serde(default = "default_bytes_capacity")]
    pub bytes: usize,
    #[serde(default = "default_usage_capacity")]
    pub usage: usize,
    #[serde(default = "default_log_capacity")]
    pub log: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    #[serde(default = "default_watchdog_interval_ms")]
    pub watchdog_interval_ms: u64,
    #[serde(default = "default_logger_wait_ms")]
    pub logger_wait_ms: u64,
}

fn default_input() -> PathBuf {
    PathBuf::from("/proc/stat")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("program_log.txt")
}

fn default_bytes_capacity() -> usize {
    400
}

fn default_usage_capacity() -> usize {
    128
}

fn default_log_capacity() -> usize {
    50
}

fn default_sample_interval_ms() -> u64 {
    1000
}

fn default_watchdog_interval_ms() -> u64 {
    2000
}

fn default_logger_wait_ms() -> u64 {
    1000
}

fn default_max_line_len() -> usize {
    400
}

fn default_max_cores() -> usize {
    200
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input: default_input(),
            log_file: default_log_file(),
            buffers: BufferConfig::default(),
            timing: TimingConfig::default(),
            max_line_len: default_max_line_len(),
            max_cores: default_max_cores(),
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        BufferConfig {
            bytes: default_bytes_capacity(),
            usage: default_usage_capacity(),
            log: default_log_capacity(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            sample_interval_ms: default_sample_interval_ms(),
            watchdog_interval_ms: default_watchdog_interval_ms(),
            logger_wait_ms: default_logger_wait_ms(),
        }
    }
}

impl TimingConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }

    pub fn logger_wait(&self) -> Duration {
        Duration::from_millis(self.logger_wait_ms)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Reject settings under which the pipeline cannot run or a healthy
    /// stage would be condemned by the watchdog.
    pub fn validate(&self) -> Result<()> {
        let buffers = [
            ("buffers.bytes", self.buffers.bytes),
            ("buffers.usage", self.buffers.usage),
            ("buffers.log", self.buffers.log),
            ("max_line_len", self.max_line_len),
            ("max_cores", self.max_cores),
        ];
        if let Some((name, _)) = buffers.iter().find(|(_, value)| *value == 0) {
            return Err(MonitorError::InvalidConfig(format!(
                "{} must be greater than zero",
                name
            )));
        }

        let timing = &self.timing;
        if timing.sample_interval_ms == 0 || timing.logger_wait_ms == 0 {
            return Err(MonitorError::InvalidConfig(
                "timing intervals must be greater than zero".to_string(),
            ));
        }
        if timing.sample_interval_ms >= timing.watchdog_interval_ms {
            return Err(MonitorError::InvalidConfig(format!(
                "sample_interval_ms ({}) must be shorter than watchdog_interval_ms ({})",
                timing.sample_interval_ms, timing.watchdog_interval_ms
            )));
        }
        if timing.logger_wait_ms >= timing.watchdog_interval_ms {
            return Err(MonitorError::InvalidConfig(format!(
                "logger_wait_ms ({}) must be shorter than watchdog_interval_ms ({})",
                timing.logger_wait_ms, timing.watchdog_interval_ms
            )));
        }
        Ok(())
    }
}
