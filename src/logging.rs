use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::fmt;

use super::Error;

pub const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

pub fn parse_level(s: &str) -> Result<Level, Error> {
    Level::from_str(s).map_err(|_| format!("invalid log level {}", s).into())
}

/// Logs go to stderr.
pub fn init(level: Level) {
    fmt::Subscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}
