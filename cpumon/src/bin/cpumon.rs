use clap::Parser;
use cpumon::{Config, FileSink, Pipeline, TerminalPresenter};
use eyre::{Context, Result};
use pcpbuf::Shutdown;
use std::fs::File;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

static LONG_VERSION: OnceLock<String> = OnceLock::new();

fn get_long_version() -> &'static str {
    LONG_VERSION.get_or_init(|| {
        format!(
            "{} (commit: {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_REVISION", "unknown")
        )
    })
}

#[derive(Parser)]
#[command(name = "cpumon")]
#[command(about = "per-core cpu utilization monitor")]
#[command(version = None, long_version = get_long_version())]
struct Args {
    #[arg(help = "configuration file path (toml format)")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "statistics source, /proc/stat by default")]
    input: Option<PathBuf>,

    #[arg(short, long, help = "file receiving warnings and errors")]
    log_file: Option<PathBuf>,

    #[arg(
        long,
        value_parser = humantime::parse_duration,
        help = "pause between samples (e.g. 500ms, 1s)"
    )]
    interval: Option<Duration>,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config path={}", path.display()))?,
        None => Config::default(),
    };

    if let Some(input) = &args.input {
        config.input = input.clone();
    }
    if let Some(log_file) = &args.log_file {
        config.log_file = log_file.clone();
    }
    if let Some(interval) = args.interval {
        config.timing.sample_interval_ms = u64::try_from(interval.as_millis())
            .wrap_err_with(|| format!("interval {:?} is out of range", interval))?;
    }

    config.validate().wrap_err("invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = load_config(&args)?;

    let shutdown = Shutdown::new();
    let signal = shutdown.clone();
    ctrlc::set_handler(move || {
        if signal.trigger() {
            tracing::info!("received termination signal, shutting down...");
        }
    })?;

    let input = File::open(&config.input)
        .with_context(|| format!("failed to open input path={}", config.input.display()))?;
    let sink = FileSink::create(&config.log_file)
        .with_context(|| format!("failed to open log file path={}", config.log_file.display()))?;

    let pipeline = Pipeline::start(
        &config,
        input,
        TerminalPresenter::stdout(),
        sink,
        shutdown,
        watchdog::abort_process,
    )?;

    pipeline.wait();
    pipeline.stop()?;

    tracing::info!(log_file = %config.log_file.display(), "monitor stopped");
    Ok(())
}
