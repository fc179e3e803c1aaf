//! Tracing setup: console output plus an optional JSON-lines file with
//! configurable rotation.

use crate::cli::FILE_GUARD;
use dwp_config::Logging;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber. Precedence for the level filter:
/// RUST_LOG env, then --log-level, then the config file, then "info".
pub fn init(logging: &Logging, json_console: bool, cli_level: Option<&str>) {
    let level = cli_level
        .map(str::to_string)
        .or_else(|| logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if let Some(file) = &logging.file {
        let rotation = match logging.rotation.as_deref() {
            Some("daily") => Rotation::DAILY,
            Some("hourly") => Rotation::HOURLY,
            _ => Rotation::NEVER,
        };
        let path = Path::new(file);
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let name = path.file_name().map_or("dwp.log".as_ref(), |n| n);
        let appender =
            RollingFileAppender::new(rotation, dir.unwrap_or_else(|| Path::new(".")), name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(writer)
            .init();
    } else if json_console {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
