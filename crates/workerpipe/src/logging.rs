use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use workerpipe::messages::{self, LogRecord};

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Install the stderr subscriber. stdout carries frames in `worker` mode, so
/// nothing may log there.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level.as_filter())
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}

/// Re-emit a worker's LOG record through the supervisor's subscriber.
pub fn forward_record(pid: u32, record: &LogRecord) {
    let logger = record.logger.as_deref().unwrap_or("worker");
    let message = record.message.as_str();
    match record.level {
        messages::LogLevel::Error => tracing::error!(pid, logger, "{message}"),
        messages::LogLevel::Warn => tracing::warn!(pid, logger, "{message}"),
        messages::LogLevel::Info => tracing::info!(pid, logger, "{message}"),
        messages::LogLevel::Debug => tracing::debug!(pid, logger, "{message}"),
        messages::LogLevel::Trace => tracing::trace!(pid, logger, "{message}"),
    }
}
