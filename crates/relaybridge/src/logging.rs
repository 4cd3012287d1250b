use clap::ValueEnum;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Crates whose diagnostics follow `--log-level`.
const RELAYBRIDGE_TARGETS: [&str; 4] = [
    "relaybridge",
    "relaybridge_transport",
    "relaybridge_frame",
    "relaybridge_peer",
];

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

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Per-target filter: relaybridge crates at `level`, everything else at warn.
fn log_targets(level: LogLevel) -> Targets {
    RELAYBRIDGE_TARGETS
        .iter()
        .fold(Targets::new().with_default(LevelFilter::WARN), |targets, name| {
            targets.with_target(*name, LevelFilter::from(level))
        })
}

/// Install the stderr subscriber.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true);
    let registry = tracing_subscriber::registry().with(log_targets(level));

    let _ = match format {
        LogFormat::Text => registry.with(layer).try_init(),
        LogFormat::Json => registry.with(layer.json()).try_init(),
    };
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn relay_crates_follow_requested_level() {
        let targets = log_targets(LogLevel::Debug);
        assert!(targets.would_enable("relaybridge_peer::adapter", &Level::DEBUG));
        assert!(targets.would_enable("relaybridge_transport::loopback", &Level::DEBUG));
        assert!(!targets.would_enable("relaybridge_transport::loopback", &Level::TRACE));
    }

    #[test]
    fn foreign_targets_stay_at_warn() {
        let targets = log_targets(LogLevel::Trace);
        assert!(targets.would_enable("clap_builder", &Level::WARN));
        assert!(!targets.would_enable("clap_builder", &Level::INFO));
    }
}
