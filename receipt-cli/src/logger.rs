//! Logging Infrastructure
//!
//! Console logging by default; a daily rolling file when a log directory is
//! given and exists.

use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Default filter when neither RUST_LOG nor a level is given
fn default_filter(level: &str) -> String {
    format!("receipt_printer={level},receipt_print={level}")
}

/// Initialize the logger with optional file output
pub fn init_logger(log_level: Option<&str>, log_dir: Option<&Path>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(default_filter(level)),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter("info"))),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir
        && dir.is_dir()
    {
        let file_appender = tracing_appender::rolling::daily(dir, "receipt-print");
        subscriber.with_ansi(false).with_writer(file_appender).init();
        return;
    }

    subscriber.init();
}
