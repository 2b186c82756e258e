use std::io::Write;

use log::{Level, LevelFilter, Log, Metadata, Record};

/// Environment variable overriding the configured log level.
pub const LOG_ENV: &str = "RUSTY_FAT16_LOG";

/// Timestamped `log` backend writing to stderr.
struct StderrLogger {
    level: LevelFilter,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(
            &chrono::Local::now().format("%H:%M:%S").to_string(),
            record.level(),
            &record.args().to_string(),
        );
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn format_line(timestamp: &str, level: Level, message: &str) -> String {
    let prefix = match level {
        Level::Error => "ERR ",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DBG ",
        Level::Trace => "TRC ",
    };
    format!("{timestamp} [{prefix}] {message}")
}

/// Install the stderr logger. `RUSTY_FAT16_LOG` wins over `configured`.
pub fn init(configured: LevelFilter) {
    let level = std::env::var(LOG_ENV)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(configured);

    if log::set_boxed_logger(Box::new(StderrLogger { level })).is_ok() {
        log::set_max_level(level);
    }
}
